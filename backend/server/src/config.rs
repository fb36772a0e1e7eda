use std::{
    env,
    fmt::{self, Display},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use sqlx::postgres::PgSslMode;
use tracing::{info, warn};

use crate::error::ConfigError;

const SECRETS_DIR: &str = "/run/secrets";

pub struct Config {
    pub port: u16,
    pub request_timeout: Duration,
    pub database: DatabaseConfig,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub ssl_mode: PgSslMode,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("dbname", &self.dbname)
            .field("ssl_mode", &self.ssl_mode)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(|key| env::var(key).ok(), Path::new(SECRETS_DIR))
    }

    /// Resolve every option through `lookup`, reading secrets from `secrets_dir` first.
    pub fn from_sources<F>(lookup: F, secrets_dir: &Path) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let loader = Loader {
            lookup,
            secrets_dir: secrets_dir.to_path_buf(),
        };

        Ok(Self {
            port: loader.try_load("RUST_PORT", "3006")?,
            request_timeout: Duration::from_millis(loader.try_load("REQUEST_TIMEOUT_MS", "10000")?),
            database: DatabaseConfig::from_loader(&loader)?,
        })
    }
}

impl DatabaseConfig {
    /// Settings for the store alone, used by tools and tests that never bind a listener.
    pub fn load() -> Result<Self, ConfigError> {
        let loader = Loader {
            lookup: |key: &str| env::var(key).ok(),
            secrets_dir: PathBuf::from(SECRETS_DIR),
        };

        Self::from_loader(&loader)
    }

    fn from_loader<F>(loader: &Loader<F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            host: loader.try_load("POSTGRES_HOST", "localhost")?,
            port: loader.try_load("POSTGRES_PORT", "5432")?,
            user: loader.try_load("POSTGRES_USER", "pguser")?,
            password: loader.read_secret("POSTGRES_PASSWORD"),
            dbname: loader.try_load("POSTGRES_DB", "user-db")?,
            ssl_mode: loader.try_load("POSTGRES_SSLMODE", "disable")?,
            max_connections: loader.try_load("POSTGRES_MAX_CONNECTIONS", "10")?,
            acquire_timeout: Duration::from_millis(
                loader.try_load("POSTGRES_ACQUIRE_TIMEOUT_MS", "5000")?,
            ),
        })
    }
}

struct Loader<F> {
    lookup: F,
    secrets_dir: PathBuf,
}

impl<F> Loader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.is_empty())
    }

    fn try_load<T: FromStr>(&self, key: &'static str, default: &str) -> Result<T, ConfigError>
    where
        T::Err: Display,
    {
        let value = self.var(key).unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        });

        match value.parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                warn!("Invalid {key} value: {e}");
                Err(ConfigError::Invalid {
                    key,
                    reason: e.to_string(),
                    value,
                })
            }
        }
    }

    fn read_secret(&self, secret_name: &str) -> String {
        let path = self.secrets_dir.join(secret_name);

        match read_to_string(&path) {
            Ok(secret) => secret.trim().to_string(),
            Err(e) => {
                info!("Secret file {} unavailable ({e}), checking environment", path.display());
                self.var(secret_name).unwrap_or_else(|| {
                    warn!("{secret_name} not set, using an empty value");
                    String::new()
                })
            }
        }
    }
}
