//! Fires a burst of requests with an expired token against a scripted upstream
//! and shows that they share a single refresh call.
//!
//! $ cargo run --bin refresh_demo -- 8

use backoffice::application_impl::*;
use backoffice::domain_model::*;
use backoffice::domain_port::*;
use backoffice::infra_http::*;
use backoffice::infra_memory::*;
use backoffice::logger::*;
use futures_util::future::join_all;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

const FRESH_TOKEN: &str = "fresh";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    logger.reload_from_config(&LogConfig {
        filter: "debug".to_string(),
    })?;

    let burst: usize = std::env::args()
        .nth(1)
        .map(|n| n.parse())
        .transpose()?
        .unwrap_or(5);

    let transport = Arc::new(
        FakeTransport::new(|req: &HttpRequest| {
            if req.path() == DEFAULT_REFRESH_PATH {
                return json_response(
                    200,
                    &json!({ "success": true, "data": { "accessToken": FRESH_TOKEN } }),
                );
            }
            match req.header("Authorization") {
                Some(h) if h == format!("Bearer {}", FRESH_TOKEN) => {
                    json_response(200, &json!({ "path": req.path() }))
                }
                _ => json_response(401, &json!({})),
            }
        })
        .with_delay(DEFAULT_REFRESH_PATH, Duration::from_millis(200)),
    );

    let store = Arc::new(MemorySessionStore::new());
    let client = ApiClient::new(
        ApiClientConfig {
            base_url: Some("http://upstream.invalid".to_string()),
            ..Default::default()
        },
        transport.clone(),
        store,
    );
    let session = client.session(Some(SessionId::from("demo")));
    session
        .session()
        .update(SessionPatch::tokens("stale", "refresh-1"))
        .await?;

    let results = join_all((0..burst).map(|i| {
        let session = session.clone();
        async move { session.get::<Value>(&format!("/user/{}", i)).await }
    }))
    .await;

    for result in results {
        match result {
            Ok(value) => info!(%value, "request completed"),
            Err(e) => warn!(error = %e, "request failed"),
        }
    }

    info!(
        requests = burst,
        refresh_calls = transport.calls_to(DEFAULT_REFRESH_PATH),
        "done"
    );
    Ok(())
}
