//! End-to-end over real HTTP: a warp upstream on an ephemeral port and the
//! reqwest transport.

use backoffice::application_impl::*;
use backoffice::application_port::*;
use backoffice::domain_model::*;
use backoffice::infra_http::*;
use backoffice::infra_memory::*;
use futures_util::future::join_all;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use warp::http::StatusCode;
use warp::{Filter, Reply};

const FRESH: &str = "Bearer fresh";

fn unauthorized() -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&json!({})), StatusCode::UNAUTHORIZED)
        .into_response()
}

/// Spawns the upstream and returns its base URL and refresh call counter.
fn spawn_upstream() -> (String, Arc<AtomicUsize>) {
    let refreshes = Arc::new(AtomicUsize::new(0));

    let login = warp::get()
        .and(warp::path!("auth" / "verify-password"))
        .and(warp::query::<HashMap<String, String>>())
        .map(|q: HashMap<String, String>| {
            let ok = q.get("email").map(String::as_str) == Some("ada@example.com")
                && q.get("password").map(String::as_str) == Some("pw")
                && q.get("purpose").map(String::as_str) == Some("AUTH");
            if !ok {
                return unauthorized();
            }
            warp::reply::json(&json!({
                "success": true,
                "data": {
                    "accessToken": "stale",
                    "refreshToken": "r1",
                    "user": { "_id": "u1", "displayName": "Ada" }
                }
            }))
            .into_response()
        });

    let counter = refreshes.clone();
    let refresh = warp::post()
        .and(warp::path!("auth" / "refresh-token"))
        .and(warp::body::json())
        .and_then(move |body: Value| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(150)).await;
                let reply = if body["refreshToken"] == "r1" {
                    warp::reply::json(&json!({
                        "success": true,
                        "data": { "accessToken": "fresh" }
                    }))
                    .into_response()
                } else {
                    unauthorized()
                };
                Ok::<_, warp::Rejection>(reply)
            }
        });

    let profile = warp::get()
        .and(warp::path!("user" / "profile"))
        .and(warp::header::optional::<String>("authorization"))
        .map(|auth: Option<String>| match auth.as_deref() {
            Some(FRESH) => warp::reply::json(&json!({ "displayName": "Ada" })).into_response(),
            _ => unauthorized(),
        });

    let echo = warp::path("echo")
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::header::optional::<String>("content-type"))
        .map(|auth: Option<String>, content_type: Option<String>| {
            warp::reply::json(&json!({
                "authorization": auth,
                "contentType": content_type
            }))
        });

    let slow = warp::path("slow").and_then(|| async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok::<_, warp::Rejection>(warp::reply::json(&json!({})))
    });

    let routes = login.or(refresh).or(profile).or(echo).or(slow);
    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    (format!("http://{}", addr), refreshes)
}

fn client(base_url: String, timeout: Duration) -> ApiClient {
    ApiClient::new(
        ApiClientConfig {
            base_url: Some(base_url),
            ..Default::default()
        },
        Arc::new(ReqwestTransport::new(timeout).unwrap()),
        Arc::new(MemorySessionStore::new()),
    )
}

#[tokio::test]
async fn login_then_stale_token_is_refreshed_once() {
    let (base_url, refreshes) = spawn_upstream();
    let client = client(base_url, Duration::from_secs(5));
    let auth = RealAuthService::new(client.clone());

    let login = auth
        .login(
            None,
            LoginInput {
                email: "ada@example.com".to_string(),
                password: "pw".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(login.user.id, "u1");

    let session = client.session(Some(login.session_id));
    let results = join_all((0..3).map(|_| session.get::<Value>("/user/profile"))).await;

    for result in results {
        assert_eq!(result.unwrap()["displayName"], "Ada");
    }
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(
        session.session().access_token().await.unwrap().as_deref(),
        Some("fresh")
    );
    assert_eq!(client.coordinator().tracked(), 0);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let (base_url, _) = spawn_upstream();
    let auth = RealAuthService::new(client(base_url, Duration::from_secs(5)));

    let err = auth
        .login(
            None,
            LoginInput {
                email: "ada@example.com".to_string(),
                password: "nope".to_string(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::LoginFailed(ref m) if m.starts_with("401")));
}

#[tokio::test]
async fn headers_reach_the_upstream() {
    let (base_url, _) = spawn_upstream();
    let client = client(base_url, Duration::from_secs(5));

    let anonymous: Value = client.session(None).get("/echo").await.unwrap();
    assert_eq!(anonymous["authorization"], Value::Null);
    assert_eq!(anonymous["contentType"], "application/json");

    let session = client.session(Some("s1".into()));
    session
        .session()
        .update(SessionPatch::tokens("abc", "r1"))
        .await
        .unwrap();
    let authed: Value = session.post("/echo", &json!({ "x": 1 })).await.unwrap();
    assert_eq!(authed["authorization"], "Bearer abc");
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let (base_url, _) = spawn_upstream();
    let client = client(base_url, Duration::from_millis(100));

    let err = client
        .session(None)
        .get::<Value>("/slow")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn refresh_call_timeout_is_a_refresh_transport_failure() {
    let (base_url, refreshes) = spawn_upstream();
    // shorter than the upstream's refresh latency
    let client = client(base_url, Duration::from_millis(50));
    let session = client.session(Some("s1".into()));
    session
        .session()
        .update(SessionPatch::tokens("stale", "r1"))
        .await
        .unwrap();

    let err = session.get::<Value>("/user/profile").await.unwrap_err();

    match err {
        ClientError::RefreshFailed(RefreshError::Transport(msg)) => {
            assert!(msg.starts_with("request timed out"), "{msg}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(client.coordinator().tracked(), 0);
}
