use crate::domain_model::*;
use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// Session records as JSON strings under `<prefix>:<key>`, expiring after `ttl_secs`.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
    ttl_secs: u64,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, ttl_secs: u64) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
            ttl_secs,
        }
    }

    pub async fn connect(
        url: &str,
        prefix: impl Into<String>,
        ttl_secs: u64,
    ) -> Result<Self, SessionStoreError> {
        let client = redis::Client::open(url).map_err(|e| SessionStoreError::Store(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(Self::new(conn, prefix, ttl_secs))
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, key: &str) -> Result<Option<SessionData>, SessionStoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(self.key(key))
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        raw.map(|s| serde_json::from_str(&s).map_err(|e| SessionStoreError::Corrupt(e.to_string())))
            .transpose()
    }

    // read-modify-write; concurrent writers to one session race last-write-wins
    async fn update(
        &self,
        key: &str,
        patch: SessionPatch,
    ) -> Result<SessionData, SessionStoreError> {
        let mut data = self.load(key).await?.unwrap_or_default();
        data.apply(patch);
        let raw = serde_json::to_string(&data).map_err(|e| SessionStoreError::Corrupt(e.to_string()))?;

        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(self.key(key), raw, self.ttl_secs)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(data)
    }

    async fn clear(&self, key: &str) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(self.key(key))
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(())
    }
}
