use crate::domain_model::*;
use crate::domain_port::*;
use std::fmt;
use std::sync::Arc;

/// A view of one session record in the store.
#[derive(Clone)]
pub struct Session {
    id: Option<SessionId>,
    store: Arc<dyn SessionStore>,
}

impl Session {
    pub fn new(id: Option<SessionId>, store: Arc<dyn SessionStore>) -> Self {
        Session { id, store }
    }

    pub fn id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    pub fn storage_key(&self) -> &str {
        self.id
            .as_ref()
            .map(SessionId::as_str)
            .unwrap_or(DEFAULT_SESSION_KEY)
    }

    pub async fn data(&self) -> Result<SessionData, SessionStoreError> {
        Ok(self
            .store
            .load(self.storage_key())
            .await?
            .unwrap_or_default())
    }

    pub async fn access_token(&self) -> Result<Option<String>, SessionStoreError> {
        Ok(self.data().await?.access_token.filter(|t| !t.is_empty()))
    }

    pub async fn update(&self, patch: SessionPatch) -> Result<SessionData, SessionStoreError> {
        self.store.update(self.storage_key(), patch).await
    }

    pub async fn clear(&self) -> Result<(), SessionStoreError> {
        self.store.clear(self.storage_key()).await
    }

    pub async fn refresh_key(&self) -> Result<RefreshKey, SessionStoreError> {
        let data = self.data().await?;
        Ok(RefreshKey::resolve(self.id.as_ref(), &data))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.storage_key())
            .finish_non_exhaustive()
    }
}
