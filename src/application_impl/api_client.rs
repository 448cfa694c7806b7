use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use nanoid::nanoid;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;

#[derive(Debug, Clone, Default)]
pub struct ApiClientConfig {
    pub base_url: Option<String>,
    pub refresh: RefreshPolicy,
}

/// Authenticated JSON client. Cheap to clone; clones share the refresh registry.
#[derive(Clone)]
pub struct ApiClient {
    executor: Arc<RequestExecutor>,
    coordinator: Arc<RefreshCoordinator>,
    store: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(
        config: ApiClientConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let executor = Arc::new(RequestExecutor::new(transport, config.base_url));
        let coordinator = Arc::new(RefreshCoordinator::new(executor.clone(), config.refresh));
        ApiClient {
            executor,
            coordinator,
            store,
        }
    }

    pub fn session(&self, id: Option<SessionId>) -> SessionClient {
        SessionClient {
            client: self.clone(),
            session: Session::new(id, self.store.clone()),
        }
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub(crate) fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Issue `request`; on 401/403 hand it to the coordinator for one replay.
    pub async fn send(&self, session: &Session, request: PendingRequest) -> Result<Value, ClientError> {
        let request_id = nanoid!(10);
        let span = tracing::debug_span!(
            "api_request",
            %request_id,
            method = %request.method,
            endpoint = %request.endpoint
        );

        async move {
            match self.executor.execute(session, &request).await {
                Ok(value) => Ok(value),
                Err(ExecuteError::Unauthorized { status, .. }) => {
                    tracing::debug!(status, "unauthorized, deferring to token refresh");
                    self.coordinator.handle_unauthorized(session, request).await
                }
                Err(ExecuteError::Failed(e)) => Err(e),
            }
        }
        .instrument(span)
        .await
    }

    pub async fn send_as<T: DeserializeOwned>(
        &self,
        session: &Session,
        request: PendingRequest,
    ) -> Result<T, ClientError> {
        let value = self.send(session, request).await?;
        serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Remove the session record and its idle refresh state.
    pub async fn clear_session(&self, session: &Session) -> Result<(), ClientError> {
        let key = session.refresh_key().await?;
        session.clear().await?;
        self.coordinator.forget(&key);
        Ok(())
    }
}

/// An [`ApiClient`] bound to one session.
#[derive(Clone)]
pub struct SessionClient {
    client: ApiClient,
    session: Session,
}

impl SessionClient {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        self.send(PendingRequest::new(HttpMethod::Get, endpoint)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send_with_body(HttpMethod::Post, endpoint, body).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send_with_body(HttpMethod::Put, endpoint, body).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send_with_body(HttpMethod::Patch, endpoint, body).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        self.send(PendingRequest::new(HttpMethod::Delete, endpoint)).await
    }

    pub async fn send<T: DeserializeOwned>(&self, request: PendingRequest) -> Result<T, ClientError> {
        self.client.send_as(&self.session, request).await
    }

    async fn send_with_body<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let body = serde_json::to_value(body).map_err(|e| ClientError::Encode(e.to_string()))?;
        self.send(PendingRequest::new(method, endpoint).with_body(body))
            .await
    }

    pub async fn clear(&self) -> Result<(), ClientError> {
        self.client.clear_session(&self.session).await
    }
}
