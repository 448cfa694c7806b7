use anyhow::{Result, anyhow};
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub api: Api,
    #[serde(default)]
    pub session: Session,
    #[serde(default)]
    pub log: Log,
}

#[derive(Debug, Deserialize)]
pub struct Api {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    #[serde(default = "default_session_backend")]
    pub backend: String, // "memory" or "redis"
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default)]
    pub clear_on_refresh_failure: bool,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_redis_prefix")]
    pub redis_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            backend: default_session_backend(),
            secret: None,
            cookie_name: default_cookie_name(),
            secure: false,
            ttl_secs: default_session_ttl_secs(),
            clear_on_refresh_failure: false,
            redis_url: None,
            redis_prefix: default_redis_prefix(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Log {
            filter: default_log_filter(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_refresh_path() -> String {
    crate::application_impl::DEFAULT_REFRESH_PATH.to_string()
}

fn default_session_backend() -> String {
    "memory".to_string()
}

fn default_cookie_name() -> String {
    crate::application_impl::DEFAULT_COOKIE_NAME.to_string()
}

fn default_session_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_redis_prefix() -> String {
    "session".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "BACKOFFICE";

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Settings> {
    let settings: Settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);
    finish(Config::builder().add_source(File::with_name(path)))
}

pub fn parse_settings_str(toml: &str) -> Result<Settings> {
    finish(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
}
