use std::env;

use auth::HashCost;
use chrono::Duration;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::domain::session::models::SessionPolicy;

/// Application configuration for session-service.
///
/// Read once at startup and never mutated afterwards.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Storage backend selection.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Postgres,
    /// Process-local storage, lost on restart
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DatabaseBackend,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

/// Token signing configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_expiration_ms: i64,
    pub refresh_expiration_ms: i64,
}

impl JwtConfig {
    pub fn access_ttl(&self) -> Duration {
        Duration::milliseconds(self.access_expiration_ms)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::milliseconds(self.refresh_expiration_ms)
    }
}

/// Argon2id cost for new password hashes.
#[derive(Debug, Deserialize, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        let cost = HashCost::default();
        Self {
            memory_kib: cost.memory_kib,
            iterations: cost.iterations,
            parallelism: cost.parallelism,
        }
    }
}

impl PasswordConfig {
    pub fn hash_cost(&self) -> HashCost {
        HashCost {
            memory_kib: self.memory_kib,
            iterations: self.iterations,
            parallelism: self.parallelism,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionConfig {
    /// Issue a new refresh token on every refresh exchange
    #[serde(default)]
    pub rotate_refresh_tokens: bool,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (JWT__SECRET, SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(Self::environment())
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Unprefixed `SECTION__KEY` variables, e.g. JWT__SECRET overrides jwt.secret
    fn environment() -> Environment {
        Environment::default().separator("__")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.access_expiration_ms <= 0 || self.jwt.refresh_expiration_ms <= 0 {
            return Err(ConfigError::Message(
                "jwt token lifetimes must be positive".to_string(),
            ));
        }

        if self.database.backend == DatabaseBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigError::Message(
                "database.url is required for the postgres backend".to_string(),
            ));
        }

        Ok(())
    }

    /// Token lifetimes and rotation policy for the authentication service.
    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            access_ttl: self.jwt.access_ttl(),
            refresh_ttl: self.jwt.refresh_ttl(),
            rotate_refresh_tokens: self.session.rotate_refresh_tokens,
        }
    }
}
