use service_core::config::{self as core_config, get_env, get_optional_env};
use service_core::error::AppError;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_LLM_SERVICE_URL: &str = "http://localhost:5100";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub common: core_config::Config,
    pub understanding: UnderstandingConfig,
    pub catalog: CatalogConfig,
    pub session: SessionConfig,
    pub observability: ObservabilityConfig,
    /// Largest accepted request body, image uploads included.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct UnderstandingConfig {
    /// Base address of the understanding service (`LLM_SERVICE_URL`).
    pub base_url: String,
    pub timeout: Duration,
    /// Retries on transient failures; 0 means a single attempt.
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub products_path: PathBuf,
    pub faqs_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub expiry_hours: i64,
    /// Only send the session cookie over HTTPS.
    pub secure_cookie: bool,
}

impl SessionConfig {
    /// Inactivity window shared by the cookie session and its conversation.
    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_hours.max(1) as u64 * 60 * 60)
    }
}

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// Spans are exported only when set.
    pub otlp_endpoint: Option<String>,
}

impl ChatConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = core_config::is_production();

        Ok(ChatConfig {
            common: common_config,
            understanding: UnderstandingConfig {
                base_url: get_env("LLM_SERVICE_URL", Some(DEFAULT_LLM_SERVICE_URL), is_prod)?,
                timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 30)?),
                max_retries: parse_env("LLM_MAX_RETRIES", 0)?,
                retry_backoff: Duration::from_millis(parse_env("LLM_RETRY_BACKOFF_MS", 250)?),
            },
            catalog: CatalogConfig {
                products_path: get_env("CATALOG_PRODUCTS_PATH", Some("products.json"), is_prod)?
                    .into(),
                faqs_path: get_env("CATALOG_FAQS_PATH", Some("faqs.json"), is_prod)?.into(),
            },
            session: SessionConfig {
                expiry_hours: parse_env("SESSION_EXPIRY_HOURS", 24)?,
                secure_cookie: parse_env("SESSION_SECURE_COOKIE", is_prod)?,
            },
            observability: ObservabilityConfig {
                log_level: get_optional_env("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
                otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
            },
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

/// Parse an optional variable, keeping `default` when it is unset.
fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional_env(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, e))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_uses_default_when_unset() {
        let value: u32 = parse_env("CHAT_SERVICE_TEST_UNSET", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn session_expiry_is_at_least_an_hour() {
        let session = SessionConfig {
            expiry_hours: 0,
            secure_cookie: false,
        };
        assert_eq!(session.expiry(), Duration::from_secs(3600));

        let session = SessionConfig {
            expiry_hours: 24,
            secure_cookie: false,
        };
        assert_eq!(session.expiry(), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn parse_env_rejects_garbage() {
        std::env::set_var("CHAT_SERVICE_TEST_GARBAGE", "soon");
        let result: Result<u64, _> = parse_env("CHAT_SERVICE_TEST_GARBAGE", 30);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
