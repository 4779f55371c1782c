use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use argon2::PasswordHash;
use serde::{Deserialize, Serialize};
use tokengate_auth::{AuthConfig, UserIdentity};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Token lifecycle configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Accounts accepted by the login endpoint
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.cleanup_interval.is_zero() {
            return Err("server.cleanup_interval must be > 0".into());
        }

        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }

        self.auth
            .validate()
            .map_err(|e| format!("auth config error: {e}"))?;

        let mut ids = HashSet::new();
        let mut usernames = HashSet::new();
        for user in &self.users {
            if user.id.is_empty() || user.username.is_empty() {
                return Err("users[].id and users[].username must not be empty".into());
            }
            if !ids.insert(user.id.as_str()) {
                return Err(format!("duplicate user id '{}'", user.id));
            }
            if !usernames.insert(user.username.as_str()) {
                return Err(format!("duplicate username '{}'", user.username));
            }
            PasswordHash::new(&user.password_hash).map_err(|e| {
                format!("users[{}].password_hash is not a PHC string: {e}", user.username)
            })?;
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// How often expired session records are purged
    #[serde(default = "default_cleanup_interval", with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cleanup_interval() -> Duration {
    Duration::from_secs(300)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// A login account. The password is stored as an Argon2 PHC string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserRecord {
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            name: self.name.clone(),
            roles: self.roles.clone(),
            ..UserIdentity::new(self.id.clone(), self.username.clone())
        }
    }
}

pub mod loader {
    use std::path::PathBuf;

    use config::{Config, Environment, File};

    use super::AppConfig;

    pub const DEFAULT_CONFIG_PATH: &str = "tokengate.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., TOKENGATE__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("TOKENGATE")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
