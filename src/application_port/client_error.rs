use crate::domain_port::{SessionStoreError, TransportError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("API request failed: {status} {status_text}")]
    RequestFailed { status: u16, status_text: String },
    #[error("token refresh failed: {0}")]
    RefreshFailed(#[from] RefreshError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request encode error: {0}")]
    Encode(String),
    #[error("response decode error: {0}")]
    Decode(String),
    #[error("session error: {0}")]
    Session(String),
}

/// Outcome of a failed refresh cycle, shared by every caller queued on it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RefreshError {
    #[error("no refresh token available")]
    NoRefreshToken,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("refresh endpoint returned {status}")]
    Rejected { status: u16 },
    #[error("invalid refresh response")]
    InvalidPayload,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("session error: {0}")]
    Session(String),
    #[error("refresh cycle aborted")]
    Aborted,
}

impl From<TransportError> for ClientError {
    fn from(error: TransportError) -> Self {
        ClientError::Transport(error.to_string())
    }
}

impl From<SessionStoreError> for ClientError {
    fn from(error: SessionStoreError) -> Self {
        ClientError::Session(error.to_string())
    }
}

impl From<TransportError> for RefreshError {
    fn from(error: TransportError) -> Self {
        RefreshError::Transport(error.to_string())
    }
}

impl From<SessionStoreError> for RefreshError {
    fn from(error: SessionStoreError) -> Self {
        RefreshError::Session(error.to_string())
    }
}

impl From<ClientError> for RefreshError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Config(msg) => RefreshError::Config(msg),
            ClientError::RequestFailed { status, .. } => RefreshError::Rejected { status },
            ClientError::RefreshFailed(e) => e,
            ClientError::Transport(msg) => RefreshError::Transport(msg),
            ClientError::Encode(_) | ClientError::Decode(_) => RefreshError::InvalidPayload,
            ClientError::Session(msg) => RefreshError::Session(msg),
        }
    }
}

impl ClientError {
    pub fn is_refresh_failure(&self) -> bool {
        matches!(self, ClientError::RefreshFailed(_))
    }
}
