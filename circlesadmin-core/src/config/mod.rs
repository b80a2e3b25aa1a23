//! Configuration management for the circles admin API
//!
//! Layered as defaults, then an optional TOML file, then environment
//! variables. Every load path ends in [`Config::validate`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::net::SocketAddr;
use std::path::Path;

mod error;

pub use error::ConfigError;

const ENV_PREFIX: &str = "CIRCLESADMIN";

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Administrative identity configuration
    pub admin: AdminConfig,

    /// Seed data for the bundled engine
    pub engine: EngineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Prefix every route is mounted below, e.g. `/api/v1`
    pub base_path: String,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

/// Administrative identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Application identity circles are created under
    pub app_id: String,

    /// Administrator used when a request carries no user header
    pub default_user: String,

    /// Header naming the requesting administrator
    pub user_header: String,
}

/// Seed data for the in-memory engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub users: Vec<SeedUser>,
}

/// A directory user registered at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedUser {
    pub id: String,

    /// Defaults to the id when omitted
    #[serde(default)]
    pub display_name: Option<String>,
}

impl SeedUser {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { id: id.into(), display_name: Some(display_name.into()) }
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            base_path: "/api/v1".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json_format: false, with_target: true }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            app_id: "circlesadmin".to_string(),
            default_user: "admin".to_string(),
            user_header: "x-circlesadmin-user".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: CIRCLESADMIN_<SECTION>_<KEY>
    /// Example: CIRCLESADMIN_SERVER_BIND_ADDRESS=0.0.0.0:8080
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the file if given, then the environment
    ///
    /// Validation runs once, after the environment overlay.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::read_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Overlay `CIRCLESADMIN_*` variables onto this configuration
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Server config
        if let Some(addr) = env_var("SERVER_BIND_ADDRESS") {
            self.server.bind_address = addr
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid bind address: {}", e)))?;
        }
        if let Some(base_path) = env_var("SERVER_BASE_PATH") {
            self.server.base_path = base_path;
        }

        // Logging config
        if let Some(level) = env_var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = env_var("LOG_JSON") {
            self.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }

        // Admin config
        if let Some(app_id) = env_var("ADMIN_APP_ID") {
            self.admin.app_id = app_id;
        }
        if let Some(user) = env_var("ADMIN_DEFAULT_USER") {
            self.admin.default_user = user;
        }

        // Engine seed
        if let Some(users) = env_var("ENGINE_USERS") {
            self.engine.users = parse_seed_users(&users);
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server config
        let base_path = &self.server.base_path;
        if !base_path.is_empty() && (!base_path.starts_with('/') || base_path.ends_with('/')) {
            return Err(ConfigError::ValidationFailed(format!(
                "base_path must start with '/' and not end with '/': {}",
                base_path
            )));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        // Validate admin config
        for (field, value) in [
            ("app_id", &self.admin.app_id),
            ("default_user", &self.admin.default_user),
            ("user_header", &self.admin.user_header),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!("{} must not be empty", field)));
            }
        }

        // Validate engine seed
        let mut seen = HashSet::new();
        for user in &self.engine.users {
            if user.id.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "seed user id must not be empty".to_string(),
                ));
            }
            if !seen.insert(user.id.as_str()) {
                return Err(ConfigError::ValidationFailed(format!(
                    "duplicate seed user: {}",
                    user.id
                )));
            }
        }

        Ok(())
    }

    /// Render configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(format!("{}_{}", ENV_PREFIX, key)).ok()
}

/// Parse `id` / `id:Display Name` entries separated by commas
fn parse_seed_users(raw: &str) -> Vec<SeedUser> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((id, name)) => SeedUser::new(id.trim(), name.trim()),
            None => SeedUser { id: entry.to_string(), display_name: None },
        })
        .collect()
}
