use crate::domain_model::*;

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the record stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<SessionData>, SessionStoreError>;
    /// Merge `patch` into the record (creating it when absent) and return the result.
    async fn update(&self, key: &str, patch: SessionPatch)
    -> Result<SessionData, SessionStoreError>;
    /// Remove the record. Clearing a missing record is not an error.
    async fn clear(&self, key: &str) -> Result<(), SessionStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("corrupt session record: {0}")]
    Corrupt(String),
    #[error("infra error: {0}")]
    Store(String),
}
