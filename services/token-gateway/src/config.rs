//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The access password is loaded from the ACCESS_PWD env var or
//! access_password_file, never stored in the TOML directly to avoid leaking
//! secrets. REDIS_URL overrides store.url.

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Which key-value store backs sessions and credentials
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    /// In-process only; everything is lost on restart
    Memory,
}

/// Key-value store settings
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Redis connection URL. May embed a password, so it is never logged.
    #[serde(default)]
    pub url: Option<String>,
}

/// Session gate settings
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    #[serde(skip)]
    pub access_password: Option<Secret<String>>,
    /// Path to a file containing the access password (alternative to ACCESS_PWD env var)
    #[serde(default)]
    pub access_password_file: Option<PathBuf>,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_password: None,
            access_password_file: None,
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

fn default_max_connections() -> usize {
    1000
}

fn default_session_ttl_secs() -> u64 {
    24 * 60 * 60
}

const REDIS_URL_SCHEMES: &[&str] = &["redis://", "rediss://", "unix://"];

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Access password resolution order:
    /// 1. ACCESS_PWD env var
    /// 2. access_password_file path from config
    ///
    /// File contents are trimmed. The gate stays disabled only when neither
    /// source yields a non-empty password.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(url) = std::env::var("REDIS_URL") {
            config.store.url = Some(url);
        }

        if config.store.backend == StoreBackend::Redis {
            let url = config.store.url.as_deref().ok_or_else(|| {
                common::Error::Config("store.url (or REDIS_URL) is required for the redis backend".into())
            })?;
            if !REDIS_URL_SCHEMES.iter().any(|s| url.starts_with(s)) {
                return Err(common::Error::Config(
                    "store.url must start with redis://, rediss:// or unix://".into(),
                ));
            }
        }

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if config.auth.session_ttl_secs == 0 {
            return Err(common::Error::Config(
                "session_ttl_secs must be greater than 0".into(),
            ));
        }

        // Resolve access password: a non-empty env var takes precedence over
        // the file. An empty ACCESS_PWD counts as unset.
        match std::env::var("ACCESS_PWD").ok().filter(|p| !p.is_empty()) {
            Some(password) => {
                config.auth.access_password = Some(Secret::new(password));
            }
            None => {
                if let Some(ref password_file) = config.auth.access_password_file {
                    let password = std::fs::read_to_string(password_file).map_err(|e| {
                        common::Error::Config(format!(
                            "failed to read access_password_file {}: {e}",
                            password_file.display()
                        ))
                    })?;
                    let password = password.trim().to_owned();
                    if !password.is_empty() {
                        config.auth.access_password = Some(Secret::new(password));
                    }
                }
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("token-gateway.toml")
    }
}
