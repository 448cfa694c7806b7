use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage key used by a handle that carries no session id.
pub const DEFAULT_SESSION_KEY: &str = "default";

#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        SessionId(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        SessionId(value.to_owned())
    }
}

/// Authenticated user as returned by the upstream login endpoint.
/// Only `_id` is interpreted; the rest of the profile is carried verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub profile: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

impl SessionData {
    /// Merge semantics: fields absent from the patch keep their stored value.
    pub fn apply(&mut self, patch: SessionPatch) {
        if let Some(access_token) = patch.access_token {
            self.access_token = Some(access_token);
        }
        if let Some(refresh_token) = patch.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        if let Some(user) = patch.user {
            self.user = Some(user);
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<SessionUser>,
}

impl SessionPatch {
    pub fn tokens(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
            user: None,
        }
    }
}

/// Identity under which refresh cycles are serialized.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct RefreshKey(pub String);

impl RefreshKey {
    /// Session id when known, otherwise `user:<id>`, otherwise the fixed default key.
    pub fn resolve(session_id: Option<&SessionId>, data: &SessionData) -> Self {
        if let Some(id) = session_id {
            return RefreshKey(id.0.clone());
        }
        if let Some(user_id) = data.user_id() {
            return RefreshKey(format!("user:{}", user_id));
        }
        RefreshKey(DEFAULT_SESSION_KEY.to_owned())
    }
}

impl fmt::Display for RefreshKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
