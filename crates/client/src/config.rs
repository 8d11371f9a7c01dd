/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the scan backend, without a trailing `/`.
    pub api_url: String,
}

/// Errors raised while loading [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Env var holding the backend base URL.
pub const API_URL_VAR: &str = "API_URL";

impl ClientConfig {
    /// Load configuration from the environment.
    ///
    /// | Env Var   | Default    |
    /// |-----------|------------|
    /// | `API_URL` | (required) |
    ///
    /// Call `dotenvy::dotenv()` first to pick up a local `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var(API_URL_VAR).unwrap_or_default();
        Self::from_api_url(&api_url)
    }

    /// Build a configuration from an explicit base URL.
    pub fn from_api_url(api_url: &str) -> Result<Self, ConfigError> {
        let api_url = api_url.trim().trim_end_matches('/');
        if api_url.is_empty() {
            return Err(ConfigError::Missing(API_URL_VAR));
        }
        Ok(Self {
            api_url: api_url.to_string(),
        })
    }
}
