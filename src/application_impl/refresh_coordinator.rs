use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh-token";

struct QueuedRetry {
    session: Session,
    request: PendingRequest,
    reply: oneshot::Sender<Result<Value, ClientError>>,
}

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    queue: VecDeque<QueuedRetry>,
}

impl RefreshState {
    fn is_idle(&self) -> bool {
        !self.refreshing && self.queue.is_empty()
    }
}

/// Releases queued callers (they observe `Aborted`) if a cycle is dropped mid-flight.
struct SettleOnDrop<'a> {
    coordinator: &'a RefreshCoordinator,
    key: &'a RefreshKey,
    armed: bool,
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            drop(self.coordinator.settle(self.key));
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshedTokens {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<RefreshedTokens>,
}

#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    pub refresh_path: String,
    /// Drop the session record when a refresh cycle fails.
    pub clear_on_failure: bool,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        RefreshPolicy {
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            clear_on_failure: false,
        }
    }
}

/// Serializes token refreshes per session: callers that hit 401/403 while a
/// refresh is in flight for the same key are queued and replayed once it settles.
pub struct RefreshCoordinator {
    executor: Arc<RequestExecutor>,
    states: DashMap<RefreshKey, RefreshState>,
    policy: RefreshPolicy,
}

impl RefreshCoordinator {
    pub fn new(executor: Arc<RequestExecutor>, policy: RefreshPolicy) -> Self {
        RefreshCoordinator {
            executor,
            states: DashMap::new(),
            policy,
        }
    }

    /// Queue `request` for replay behind the session's refresh cycle, starting
    /// the cycle when none is in flight. Resolves with the replayed response or
    /// with the cycle's failure.
    pub async fn handle_unauthorized(
        self: &Arc<Self>,
        session: &Session,
        request: PendingRequest,
    ) -> Result<Value, ClientError> {
        let key = session.refresh_key().await?;
        let (reply, outcome) = oneshot::channel();

        // enqueue and check-and-set under the same entry guard
        let initiate = {
            let mut state = self.states.entry(key.clone()).or_default();
            state.queue.push_back(QueuedRetry {
                session: session.clone(),
                request,
                reply,
            });
            if state.refreshing {
                debug!(%key, queued = state.queue.len(), "refresh in flight, request queued");
                false
            } else {
                state.refreshing = true;
                true
            }
        };

        if initiate {
            tokio::spawn(self.clone().run_cycle(key, session.clone()));
        }

        outcome
            .await
            .unwrap_or_else(|_| Err(ClientError::RefreshFailed(RefreshError::Aborted)))
    }

    /// Drop the state for `key` if no cycle is running for it.
    pub fn forget(&self, key: &RefreshKey) {
        self.states.remove_if(key, |_, state| state.is_idle());
    }

    pub fn is_refreshing(&self, key: &RefreshKey) -> bool {
        self.states
            .get(key)
            .map(|state| state.refreshing)
            .unwrap_or(false)
    }

    /// Number of keys with live refresh state.
    pub fn tracked(&self) -> usize {
        self.states.len()
    }

    async fn run_cycle(self: Arc<Self>, key: RefreshKey, session: Session) {
        info!(%key, "refreshing access token");
        let mut guard = SettleOnDrop {
            coordinator: self.as_ref(),
            key: &key,
            armed: true,
        };
        let outcome = self.refresh_tokens(&session).await;
        guard.armed = false;
        let queue = self.settle(&key);

        match outcome {
            Ok(()) => {
                info!(%key, queued = queue.len(), "access token refreshed, replaying requests");
                for retry in queue {
                    let result = self
                        .executor
                        .execute(&retry.session, &retry.request)
                        .await
                        .map_err(ExecuteError::into_terminal);
                    if let Err(e) = &result {
                        debug!(
                            %key,
                            method = %retry.request.method,
                            endpoint = %retry.request.endpoint,
                            error = %e,
                            "replayed request failed"
                        );
                    }
                    let _ = retry.reply.send(result);
                }
            }
            Err(error) => {
                warn!(%key, queued = queue.len(), %error, "token refresh failed");
                if self.policy.clear_on_failure {
                    if let Err(e) = session.clear().await {
                        warn!(%key, error = %e, "failed to clear session after refresh failure");
                    }
                }
                for retry in queue {
                    let _ = retry
                        .reply
                        .send(Err(ClientError::RefreshFailed(error.clone())));
                }
            }
        }
    }

    /// Mark the key idle and hand back everything queued during the cycle.
    fn settle(&self, key: &RefreshKey) -> VecDeque<QueuedRetry> {
        let queue = match self.states.get_mut(key) {
            Some(mut state) => {
                state.refreshing = false;
                std::mem::take(&mut state.queue)
            }
            None => VecDeque::new(),
        };
        self.states.remove_if(key, |_, state| state.is_idle());
        queue
    }

    async fn refresh_tokens(&self, session: &Session) -> Result<(), RefreshError> {
        let data = session.data().await?;
        let refresh_token = data
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(RefreshError::NoRefreshToken)?;

        let body = json!({ "refreshToken": refresh_token });
        let response = self
            .executor
            .send_anonymous(HttpMethod::Post, &self.policy.refresh_path, &[], Some(&body))
            .await?;
        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status,
            });
        }

        let envelope: RefreshEnvelope =
            serde_json::from_slice(&response.body).map_err(|_| RefreshError::InvalidPayload)?;
        let tokens = match envelope {
            RefreshEnvelope {
                success: true,
                data: Some(tokens),
            } => tokens,
            _ => return Err(RefreshError::InvalidPayload),
        };

        session
            .update(SessionPatch {
                access_token: Some(tokens.access_token),
                refresh_token: Some(tokens.refresh_token.unwrap_or(refresh_token)),
                user: None,
            })
            .await?;
        Ok(())
    }
}
