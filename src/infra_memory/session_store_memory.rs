use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionData>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, key: &str) -> Result<Option<SessionData>, SessionStoreError> {
        Ok(self.sessions.get(key).map(|entry| entry.value().clone()))
    }

    async fn update(
        &self,
        key: &str,
        patch: SessionPatch,
    ) -> Result<SessionData, SessionStoreError> {
        let mut entry = self.sessions.entry(key.to_string()).or_default();
        entry.apply(patch);
        Ok(entry.value().clone())
    }

    async fn clear(&self, key: &str) -> Result<(), SessionStoreError> {
        self.sessions.remove(key);
        Ok(())
    }
}
