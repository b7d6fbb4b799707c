use crate::auth::AuthMode;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("JIRA_BASE_URL is required")]
    MissingBaseUrl,

    #[error("invalid JIRA_BASE_URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("invalid {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("port cannot be 0")]
    InvalidPort,

    #[error("unknown JIRA_AUTH_MODE: {0} (expected service_account, impersonate or passthrough)")]
    UnknownAuthMode(String),
}

/// Network listener configuration
#[derive(Clone, Debug)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        Ok(())
    }
}

/// Proxy configuration, read from the environment once at startup and
/// immutable afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    pub listener: Listener,
    /// Upstream Jira base URL, without trailing slash.
    pub jira_base_url: Url,
    /// Authentication mode, fixed for the lifetime of the process.
    pub auth: AuthMode,
    pub debug: bool,
    /// Allowed CORS origins; `*` allows any.
    pub allow_origins: Vec<String>,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url_raw = get("JIRA_BASE_URL")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingBaseUrl)?;
        let jira_base_url = Url::parse(base_url_raw.trim_end_matches('/'))?;

        let host = get("PROXY_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match get("PROXY_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: "PROXY_PORT",
                    value: raw,
                })?,
            None => 8000,
        };

        let username = get("JIRA_SERVICE_USERNAME").unwrap_or_default();
        let api_token = get("JIRA_SERVICE_API_TOKEN").unwrap_or_default();
        let mode = get("JIRA_AUTH_MODE").unwrap_or_else(|| "service_account".to_string());
        let auth = match mode.as_str() {
            "service_account" => AuthMode::ServiceAccount {
                username,
                api_token,
            },
            "impersonate" => AuthMode::Impersonate {
                username,
                api_token,
            },
            "passthrough" => AuthMode::Passthrough,
            other => return Err(ConfigError::UnknownAuthMode(other.to_string())),
        };

        let debug = get("DEBUG")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let allow_origins = get("ALLOW_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["*".to_string()]);

        let config = Config {
            listener: Listener { host, port },
            jira_base_url,
            auth,
            debug,
            allow_origins,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listener.validate()
    }
}
