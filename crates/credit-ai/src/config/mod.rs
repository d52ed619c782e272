use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub upstream: UpstreamConfig,
    pub reasoning: ReasoningConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            upstream: UpstreamConfig::load()?,
            reasoning: ReasoningConfig::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection settings for the upstream loan-origination platform.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub auth_email: Option<String>,
    pub auth_password: Option<String>,
    pub timeout: Duration,
}

impl UpstreamConfig {
    fn load() -> Result<Self, ConfigError> {
        let base_url = env::var("PLATFORM_API_BASE")
            .unwrap_or_else(|_| "https://api.kalaplatform.tech".to_string());
        let timeout_secs = env::var("PLATFORM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidDuration {
                name: "PLATFORM_TIMEOUT_SECS",
            })?;

        Ok(Self {
            base_url,
            auth_email: env::var("PLATFORM_AUTH_EMAIL").ok(),
            auth_password: env::var("PLATFORM_AUTH_PASSWORD").ok(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Resolves the credential pair, failing when either half is missing.
    pub fn credentials(&self) -> Result<(&str, &str), ConfigError> {
        match (self.auth_email.as_deref(), self.auth_password.as_deref()) {
            (Some(email), Some(password)) => Ok((email, password)),
            (None, _) => Err(ConfigError::MissingVar {
                name: "PLATFORM_AUTH_EMAIL",
            }),
            (_, None) => Err(ConfigError::MissingVar {
                name: "PLATFORM_AUTH_PASSWORD",
            }),
        }
    }
}

/// Settings for the external reasoning service that applies the credit policy.
#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub retry: RetryConfig,
}

impl ReasoningConfig {
    fn load() -> Result<Self, ConfigError> {
        let base_url = env::var("REASONING_API_BASE")
            .unwrap_or_else(|_| "https://api.anthropic.com".to_string());
        let model = env::var("REASONING_MODEL")
            .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string());
        let max_tokens = env::var("REASONING_MAX_TOKENS")
            .unwrap_or_else(|_| "4096".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidNumber {
                name: "REASONING_MAX_TOKENS",
            })?;

        Ok(Self {
            base_url,
            api_key: env::var("REASONING_API_KEY").ok(),
            model,
            max_tokens,
            retry: RetryConfig::load()?,
        })
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingVar {
            name: "REASONING_API_KEY",
        })
    }
}

/// Retry knobs for the reasoning invocation. Defaults preserve the
/// immediate-retry behavior (three attempts, no delay).
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

impl RetryConfig {
    fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_attempts = env::var("REASONING_MAX_ATTEMPTS")
            .map(|raw| raw.parse::<u32>())
            .unwrap_or(Ok(defaults.max_attempts))
            .map_err(|_| ConfigError::InvalidNumber {
                name: "REASONING_MAX_ATTEMPTS",
            })?;
        let base_delay_ms = env::var("REASONING_BASE_DELAY_MS")
            .map(|raw| raw.parse::<u64>())
            .unwrap_or(Ok(defaults.base_delay.as_millis() as u64))
            .map_err(|_| ConfigError::InvalidDuration {
                name: "REASONING_BASE_DELAY_MS",
            })?;
        let max_delay_ms = env::var("REASONING_MAX_DELAY_MS")
            .map(|raw| raw.parse::<u64>())
            .unwrap_or(Ok(defaults.max_delay.as_millis() as u64))
            .map_err(|_| ConfigError::InvalidDuration {
                name: "REASONING_MAX_DELAY_MS",
            })?;

        Ok(Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDuration { name: &'static str },
    InvalidNumber { name: &'static str },
    MissingVar { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDuration { name } => {
                write!(f, "{name} must be a whole number of time units")
            }
            ConfigError::InvalidNumber { name } => {
                write!(f, "{name} must be a non-negative integer")
            }
            ConfigError::MissingVar { name } => write!(f, "{name} must be set"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
