use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::SessionId;
use crate::domain_port::*;
use crate::infra_http::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use std::sync::Arc;
use std::time::Duration;

/// Wires the configured session backend and transport into a client.
pub struct AppContext {
    pub client: ApiClient,
    pub auth_service: Arc<dyn AuthService>,
    pub cookie: Option<SessionCookie>,
}

impl AppContext {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(
            Duration::from_secs(settings.api.timeout_secs),
        )?);
        let store = session_store(settings).await?;
        Self::with_parts(settings, transport, store)
    }

    pub fn with_parts(
        settings: &Settings,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn SessionStore>,
    ) -> anyhow::Result<Self> {
        let config = ApiClientConfig {
            base_url: settings.api.base_url.clone(),
            refresh: RefreshPolicy {
                refresh_path: settings.api.refresh_path.clone(),
                clear_on_failure: settings.session.clear_on_refresh_failure,
            },
        };
        if config.base_url.is_none() {
            warn!("api.base_url is not set; requests will fail until it is configured");
        }

        let client = ApiClient::new(config, transport, store);
        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(client.clone()));

        let cookie = match settings.session.secret.as_deref() {
            Some(secret) => Some(SessionCookie::new(
                settings.session.cookie_name.clone(),
                secret,
                settings.session.secure,
                settings.session.ttl_secs,
            )?),
            None => None,
        };

        Ok(AppContext {
            client,
            auth_service,
            cookie,
        })
    }

    /// Log in and mint the `Set-Cookie` header for the session. The cookie
    /// signer is required up front so no session is stored without one.
    pub async fn login(
        &self,
        session_id: Option<SessionId>,
        input: LoginInput,
    ) -> Result<(LoginResult, String), AuthError> {
        let cookie = self.require_cookie()?;
        let result = self.auth_service.login(session_id, input).await?;
        let header = cookie.set_cookie(&result.session_id)?;
        Ok((result, header))
    }

    /// Like `cookie`, but missing configuration is an error.
    pub fn require_cookie(&self) -> Result<&SessionCookie, ClientError> {
        self.cookie
            .as_ref()
            .ok_or_else(|| ClientError::Config("session.secret is not set".to_string()))
    }
}

async fn session_store(settings: &Settings) -> anyhow::Result<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match settings.session.backend.as_str() {
        "memory" => Arc::new(MemorySessionStore::new()),
        "redis" => {
            let url = settings
                .session
                .redis_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("session.redis_url is required for the redis backend"))?;
            Arc::new(
                RedisSessionStore::connect(
                    url,
                    settings.session.redis_prefix.clone(),
                    settings.session.ttl_secs,
                )
                .await?,
            )
        }
        other => return Err(anyhow::anyhow!("Unknown session backend: {}", other)),
    };
    info!(backend = %settings.session.backend, "session store ready");
    Ok(store)
}
