//! Configuration loading from environment variables.

use crate::backends::kv::RedisSettings;
use crate::backends::object::{AzureSettings, S3Settings};
use crate::constants::*;
use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration for hashpaste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub backend: BackendConfig,
    pub max_paste_size: usize,
    pub paste_list_active: bool,
    pub enabled_visibilities: Vec<String>,
}

/// Which substrate backs the paste store, with its connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Filesystem { root: PathBuf },
    Sqlite { path: PathBuf, timeout: Duration },
    Postgres { connection: String, timeout: Duration },
    /// Embedded redb key-value file.
    Kv { path: PathBuf },
    Redis(RedisSettings),
    S3(S3Settings),
    Azure(AzureSettings),
    /// Process-local object store; nothing persists.
    Memory,
}

impl BackendConfig {
    /// Short name as accepted by `HASHPASTE_BACKEND`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Filesystem { .. } => "filesystem",
            Self::Sqlite { .. } => "sqlite",
            Self::Postgres { .. } => "postgres",
            Self::Kv { .. } => "kv",
            Self::Redis(_) => "redis",
            Self::S3(_) => "s3",
            Self::Azure(_) => "azure",
            Self::Memory => "memory",
        }
    }

    /// Read the settings of the backend called `name` from the environment.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for unknown names, missing required variables,
    /// or malformed numbers.
    pub fn from_env(name: &str) -> Result<Self, ConfigError> {
        let timeout = Duration::from_secs(parse_var(
            ENV_BACKEND_TIMEOUT,
            DEFAULT_BACKEND_TIMEOUT_SECS,
        )?);
        let backend = match name.trim().to_ascii_lowercase().as_str() {
            "filesystem" => Self::Filesystem {
                root: PathBuf::from(
                    optional_var(ENV_FILESYSTEM_ROOT)
                        .unwrap_or_else(|| DEFAULT_FILESYSTEM_ROOT.to_string()),
                ),
            },
            "sqlite" => Self::Sqlite {
                path: PathBuf::from(required_var(ENV_SQLITE_PATH)?),
                timeout,
            },
            "postgres" => Self::Postgres {
                connection: required_var(ENV_POSTGRES_CONNECTION)?,
                timeout,
            },
            "kv" => Self::Kv {
                path: PathBuf::from(
                    optional_var(ENV_KV_PATH).unwrap_or_else(|| DEFAULT_KV_PATH.to_string()),
                ),
            },
            "redis" => Self::Redis(RedisSettings {
                host: optional_var(ENV_REDIS_HOST)
                    .unwrap_or_else(|| DEFAULT_REDIS_HOST.to_string()),
                port: parse_var(ENV_REDIS_PORT, DEFAULT_REDIS_PORT)?,
                password: optional_var(ENV_REDIS_PASSWORD),
                db_index: parse_var(ENV_REDIS_DB_INDEX, DEFAULT_REDIS_DB_INDEX)?,
                timeout,
            }),
            "s3" => Self::S3(S3Settings {
                access_key_id: required_var(ENV_S3_ACCESS_KEY_ID)?,
                secret_access_key: required_var(ENV_S3_SECRET_ACCESS_KEY)?,
                bucket: optional_var(ENV_S3_BUCKET)
                    .unwrap_or_else(|| DEFAULT_CONTAINER.to_string()),
                region: optional_var(ENV_S3_REGION),
                endpoint: optional_var(ENV_S3_ENDPOINT),
                timeout,
            }),
            "azure" => Self::Azure(AzureSettings {
                account_name: required_var(ENV_AZURE_ACCOUNT_NAME)?,
                account_key: required_var(ENV_AZURE_ACCOUNT_KEY)?,
                container: optional_var(ENV_AZURE_CONTAINER)
                    .unwrap_or_else(|| DEFAULT_CONTAINER.to_string()),
                endpoint: optional_var(ENV_AZURE_ENDPOINT),
                timeout,
            }),
            "memory" => Self::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: ENV_BACKEND.to_string(),
                    value: other.to_string(),
                    reason: "expected one of filesystem, sqlite, postgres, kv, redis, s3, \
                             azure, memory"
                        .to_string(),
                })
            }
        };
        Ok(backend)
    }
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma separated visibility list, dropping blanks.
pub fn parse_visibilities(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Non-empty value of `name`, if set.
fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn required_var(name: &str) -> Result<String, ConfigError> {
    optional_var(name).ok_or_else(|| ConfigError::MissingVar(name.to_string()))
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_var(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
            name: name.to_string(),
            value: value.clone(),
            reason: err.to_string(),
        }),
    }
}

fn flag_var(name: &str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => parse_env_flag(&value).ok_or_else(|| ConfigError::Invalid {
            name: name.to_string(),
            value,
            reason: "expected a boolean flag".to_string(),
        }),
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_name = optional_var(ENV_BACKEND).unwrap_or_else(|| "filesystem".to_string());
        let enabled_visibilities = match optional_var(ENV_ENABLED_VISIBILITIES) {
            Some(value) => parse_visibilities(&value),
            None => DEFAULT_VISIBILITIES.iter().map(|v| v.to_string()).collect(),
        };
        Ok(Self {
            backend: BackendConfig::from_env(&backend_name)?,
            max_paste_size: parse_var(ENV_MAX_PASTE_SIZE, DEFAULT_MAX_PASTE_SIZE)?,
            paste_list_active: flag_var(ENV_PASTE_LIST_ACTIVE, true)?,
            enabled_visibilities,
        })
    }
}
