use crate::application_impl::ApiClient;
use crate::application_port::*;
use crate::domain_model::*;
use serde::Deserialize;
use tracing::info;

pub const VERIFY_PASSWORD_PATH: &str = "/auth/verify-password";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    access_token: String,
    refresh_token: String,
    user: SessionUser,
}

#[derive(Debug, Deserialize)]
struct LoginEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<LoginData>,
}

pub struct RealAuthService {
    client: ApiClient,
}

impl RealAuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn login(
        &self,
        session_id: Option<SessionId>,
        input: LoginInput,
    ) -> Result<LoginResult, AuthError> {
        let query = [
            ("email".to_string(), input.email),
            ("password".to_string(), input.password),
            ("purpose".to_string(), "AUTH".to_string()),
        ];
        let response = self
            .client
            .executor()
            .send_anonymous(HttpMethod::Get, VERIFY_PASSWORD_PATH, &query, None)
            .await?;
        if !response.is_success() {
            return Err(AuthError::LoginFailed(format!(
                "{} {}",
                response.status, response.status_text
            )));
        }

        let envelope: LoginEnvelope = serde_json::from_slice(&response.body)
            .map_err(|_| AuthError::LoginFailed("invalid response".to_string()))?;
        let data = match envelope {
            LoginEnvelope {
                success: true,
                data: Some(data),
            } => data,
            _ => return Err(AuthError::LoginFailed("invalid response".to_string())),
        };

        let session_id = session_id.unwrap_or_else(SessionId::generate);
        let session = self.client.session(Some(session_id.clone()));
        session
            .session()
            .update(SessionPatch {
                access_token: Some(data.access_token),
                refresh_token: Some(data.refresh_token),
                user: Some(data.user.clone()),
            })
            .await
            .map_err(ClientError::from)?;

        info!(user = %data.user.id, "login succeeded");
        Ok(LoginResult {
            session_id,
            user: data.user,
        })
    }

    async fn logout(&self, session_id: Option<&SessionId>) -> Result<(), AuthError> {
        self.client.session(session_id.cloned()).clear().await?;
        info!("session cleared");
        Ok(())
    }
}
