//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every section has defaults so a missing file still yields a runnable
//! development configuration.

use serde::{Deserialize, Serialize};

/// Placeholder secret shipped in the defaults. Rejected in production.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Root configuration for the API.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Environment mode and data-store addresses.
    pub environment: EnvironmentConfig,

    /// Admission control.
    pub rate_limit: RateLimitConfig,

    /// Credential signing and verification.
    pub auth: AuthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Response hardening and body limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port.
    pub port: u16,
}

impl ListenerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Deployment mode.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentMode {
    Production,
    #[default]
    Development,
}

impl std::str::FromStr for EnvironmentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(EnvironmentMode::Production),
            "development" | "dev" => Ok(EnvironmentMode::Development),
            other => Err(format!("unknown environment mode '{}'", other)),
        }
    }
}

/// Environment mode and the data-store address it selects.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub mode: EnvironmentMode,

    /// Data-store URI used in production. Must be provided explicitly.
    pub production_database_uri: Option<String>,

    /// Data-store URI used everywhere else.
    pub development_database_uri: String,
}

impl EnvironmentConfig {
    pub fn is_production(&self) -> bool {
        self.mode == EnvironmentMode::Production
    }

    /// The data-store address selected by the current mode.
    pub fn database_uri(&self) -> Option<&str> {
        match self.mode {
            EnvironmentMode::Production => self.production_database_uri.as_deref(),
            EnvironmentMode::Development => Some(&self.development_database_uri),
        }
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            mode: EnvironmentMode::Development,
            production_database_uri: None,
            development_database_uri: "mongodb://localhost:27017/moviesdb".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests admitted per address per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Windows idle for this long are evicted.
    pub idle_evict_secs: u64,

    /// Eviction sweep interval in seconds.
    pub sweep_interval_secs: u64,

    /// Key on the first X-Forwarded-For hop instead of the peer address.
    /// Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 15 * 60,
            idle_evict_secs: 30 * 60,
            sweep_interval_secs: 60,
            trust_forwarded_for: false,
        }
    }
}

/// Credential configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HMAC secret for signing and verifying credentials.
    pub jwt_secret: String,

    /// Credential lifetime in seconds.
    pub token_ttl_secs: u64,

    /// `iss` claim written and required.
    pub issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_secs: 7 * 24 * 60 * 60,
            issuer: "movies-api".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Add hardening response headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 100 * 1024, // 100KB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
