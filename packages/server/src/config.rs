use classifieds_common::StorageConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins. Empty means any origin.
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Key anonymous rate limits by the first `X-Forwarded-For` hop.
    /// Enable only behind a reverse proxy that sets the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Load demo users, listings and media at startup if the database is empty.
    #[serde(default)]
    pub seed_demo_data: bool,
}

fn default_max_connections() -> u32 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Access token lifetime in seconds. Default: 1 hour.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,
}

fn default_token_ttl() -> i64 {
    3600
}

/// A fixed-window request budget.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    /// Requests allowed per window. 0 disables the rule.
    pub max_requests: u32,
    pub window_secs: u64,
}

impl RateLimitRule {
    pub const fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window_secs: 60,
        }
    }

    pub const fn per_hour(max_requests: u32) -> Self {
        Self {
            max_requests,
            window_secs: 3600,
        }
    }
}

/// Per-route request budgets. Anonymous routes are keyed by client address,
/// authenticated routes by user ID.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub register: RateLimitRule,
    pub login: RateLimitRule,
    pub current_user: RateLimitRule,
    pub update_user: RateLimitRule,
    pub delete_user: RateLimitRule,
    pub create_listing: RateLimitRule,
    pub update_listing: RateLimitRule,
    pub delete_listing: RateLimitRule,
    pub delete_media: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            register: RateLimitRule::per_hour(5),
            login: RateLimitRule::per_minute(10),
            current_user: RateLimitRule::per_hour(60),
            update_user: RateLimitRule::per_hour(60),
            delete_user: RateLimitRule::per_hour(5),
            create_listing: RateLimitRule::per_hour(30),
            update_listing: RateLimitRule::per_hour(60),
            delete_listing: RateLimitRule::per_hour(60),
            delete_media: RateLimitRule::per_hour(60),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("database.url", "sqlite://./app.db?mode=rwc")?
            .set_default("storage.media_root", "./media")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., CLASSIFIEDS__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("CLASSIFIEDS").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
