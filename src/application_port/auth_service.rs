use crate::application_port::ClientError;
use crate::domain_model::{SessionId, SessionUser};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("login failed: {0}")]
    LoginFailed(String),
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub session_id: SessionId,
    pub user: SessionUser,
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verify credentials upstream and store the issued tokens. A fresh session id
    /// is minted when the caller has none.
    async fn login(
        &self,
        session_id: Option<SessionId>,
        input: LoginInput,
    ) -> Result<LoginResult, AuthError>;
    /// Drop the session record and any idle refresh state tied to it.
    async fn logout(&self, session_id: Option<&SessionId>) -> Result<(), AuthError>;
}
