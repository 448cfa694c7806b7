#![allow(dead_code)]

use backoffice::application_impl::*;
use backoffice::domain_model::*;
use backoffice::domain_port::*;
use backoffice::infra_http::*;
use backoffice::infra_memory::*;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE_URL: &str = "http://upstream.test";

#[derive(Debug, Clone, Copy)]
pub enum RefreshMode {
    /// Issue `<refresh token>-access-<n>`.
    Issue,
    /// Issue a new access token and rotate the refresh token.
    Rotate,
    /// Answer the refresh call with this status.
    Status(u16),
    /// 200 with `success: false`.
    Malformed,
    /// The refresh handler panics, taking the refresh task down with it.
    Panic,
}

/// Scripted upstream API that only accepts access tokens it issued.
///
/// - `/auth/refresh-token` behaves per [`RefreshMode`]
/// - `/public` always succeeds
/// - `/always-401` always answers 401
/// - `/missing` answers 404 to a valid token
/// - any other path echoes `{ path, token }` to a valid token
pub struct Upstream {
    mode: RefreshMode,
    valid: Mutex<HashSet<String>>,
    issued: AtomicUsize,
}

impl Upstream {
    pub fn new(mode: RefreshMode) -> Arc<Self> {
        Arc::new(Upstream {
            mode,
            valid: Mutex::new(HashSet::new()),
            issued: AtomicUsize::new(0),
        })
    }

    pub fn accept(&self, token: &str) {
        self.valid.lock().unwrap().insert(token.to_string());
    }

    fn refresh(&self, req: &HttpRequest) -> HttpResponse {
        let body: Value = serde_json::from_slice(req.body.as_deref().unwrap_or(b"{}")).unwrap();
        let refresh_token = body["refreshToken"].as_str().unwrap_or_default().to_string();
        match self.mode {
            RefreshMode::Status(status) => json_response(status, &json!({ "success": false })),
            RefreshMode::Malformed => json_response(200, &json!({ "success": false })),
            RefreshMode::Panic => panic!("refresh handler crashed"),
            RefreshMode::Issue | RefreshMode::Rotate => {
                let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
                let access = format!("{}-access-{}", refresh_token, n);
                self.accept(&access);
                let mut data = json!({ "accessToken": access });
                if matches!(self.mode, RefreshMode::Rotate) {
                    data["refreshToken"] = json!(format!("{}-rotated", refresh_token));
                }
                json_response(200, &json!({ "success": true, "data": data }))
            }
        }
    }

    pub fn handle(&self, req: &HttpRequest) -> HttpResponse {
        match req.path() {
            DEFAULT_REFRESH_PATH => return self.refresh(req),
            "/public" => return json_response(200, &json!({ "public": true })),
            "/always-401" => return json_response(401, &json!({})),
            _ => {}
        }
        let token = req
            .header("Authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string);
        let authorized = token
            .as_ref()
            .map(|t| self.valid.lock().unwrap().contains(t))
            .unwrap_or(false);
        if !authorized {
            return json_response(401, &json!({}));
        }
        match req.path() {
            "/missing" => json_response(404, &json!({})),
            path => json_response(200, &json!({ "path": path, "token": token })),
        }
    }
}

pub struct Harness {
    pub client: ApiClient,
    pub transport: Arc<FakeTransport>,
    pub store: Arc<MemorySessionStore>,
}

impl Harness {
    pub fn new(upstream: Arc<Upstream>) -> Self {
        Self::build(upstream, None, RefreshPolicy::default())
    }

    pub fn build(
        upstream: Arc<Upstream>,
        refresh_delay: Option<Duration>,
        refresh: RefreshPolicy,
    ) -> Self {
        let mut transport = FakeTransport::new(move |req: &HttpRequest| upstream.handle(req));
        if let Some(delay) = refresh_delay {
            transport = transport.with_delay(DEFAULT_REFRESH_PATH, delay);
        }
        let transport = Arc::new(transport);
        let store = Arc::new(MemorySessionStore::new());
        let client = ApiClient::new(
            ApiClientConfig {
                base_url: Some(BASE_URL.to_string()),
                refresh,
            },
            transport.clone(),
            store.clone(),
        );
        Harness {
            client,
            transport,
            store,
        }
    }

    /// A client for session `id` holding the given tokens.
    pub async fn session(&self, id: &str, access: &str, refresh: Option<&str>) -> SessionClient {
        let session = self.client.session(Some(SessionId::from(id)));
        session
            .session()
            .update(SessionPatch {
                access_token: Some(access.to_string()),
                refresh_token: refresh.map(str::to_string),
                user: None,
            })
            .await
            .unwrap();
        session
    }

    pub fn refresh_calls(&self) -> usize {
        self.transport.calls_to(DEFAULT_REFRESH_PATH)
    }

    /// Paths requested after the first refresh call, in order.
    pub fn paths_after_refresh(&self) -> Vec<String> {
        self.transport
            .calls()
            .iter()
            .map(|c| c.path().to_string())
            .skip_while(|p| p != DEFAULT_REFRESH_PATH)
            .skip(1)
            .collect()
    }
}
