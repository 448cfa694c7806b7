use crate::domain_port::*;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

type Handler = dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync;

/// Scripted transport: answers with `handler` and records every request.
pub struct FakeTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<HttpRequest>>,
    delays: HashMap<String, Duration>,
}

impl FakeTransport {
    pub fn new(handler: impl Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static) -> Self {
        FakeTransport {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            delays: HashMap::new(),
        }
    }

    /// Hold responses for `path` for `delay` before answering.
    pub fn with_delay(mut self, path: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(path.into(), delay);
        self
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls().iter().filter(|c| c.path() == path).count()
    }
}

#[async_trait::async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        if let Some(delay) = self.delays.get(request.path()) {
            tokio::time::sleep(*delay).await;
        }
        Ok((self.handler)(&request))
    }
}

pub fn json_response(status: u16, body: &serde_json::Value) -> HttpResponse {
    HttpResponse {
        status,
        status_text: reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string(),
        body: body.to_string().into_bytes(),
    }
}
