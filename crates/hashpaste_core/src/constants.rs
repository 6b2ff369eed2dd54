//! Shared constants used across hashpaste crates.

/// Default maximum paste size accepted by the orchestration layer.
pub const DEFAULT_MAX_PASTE_SIZE: usize = 10 * 1024 * 1024;

/// Visibilities enabled when none are configured.
pub const DEFAULT_VISIBILITIES: &[&str] = &["public", "unlisted"];

/// Visibility required for a paste to appear in listings.
pub const PUBLIC_VISIBILITY: &str = "public";

/// Metadata key holding the creation time (unix seconds).
pub const DATE_KEY: &str = "date";
/// Metadata key holding the paste visibility.
pub const VISIBILITY_KEY: &str = "visibility";

/// Length of a hex-encoded SHA-256 paste id.
pub const PASTE_ID_LENGTH: usize = 64;

/// Default root directory of the filesystem backend.
pub const DEFAULT_FILESYSTEM_ROOT: &str = "pastes";
/// Default database file of the embedded key-value backend.
pub const DEFAULT_KV_PATH: &str = "pastes.redb";
/// Default bucket/container name for object storage backends.
pub const DEFAULT_CONTAINER: &str = "hashpaste";
/// Default timeout applied to network substrates, in seconds.
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 10;

/// Default Redis endpoint and database index.
pub const DEFAULT_REDIS_HOST: &str = "127.0.0.1";
/// Default Redis port.
pub const DEFAULT_REDIS_PORT: u16 = 6379;
/// Default Redis database index.
pub const DEFAULT_REDIS_DB_INDEX: i64 = 1;

/// Environment variable selecting the storage backend.
pub const ENV_BACKEND: &str = "HASHPASTE_BACKEND";
/// Environment variable holding the maximum paste size in bytes.
pub const ENV_MAX_PASTE_SIZE: &str = "MAX_PASTE_SIZE";
/// Environment flag enabling the paste listing.
pub const ENV_PASTE_LIST_ACTIVE: &str = "PASTE_LIST_ACTIVE";
/// Environment variable listing enabled visibilities, comma separated.
pub const ENV_ENABLED_VISIBILITIES: &str = "ENABLED_PASTE_VISIBILITIES";
/// Environment variable holding the network backend timeout in seconds.
pub const ENV_BACKEND_TIMEOUT: &str = "HASHPASTE_BACKEND_TIMEOUT_SECONDS";

pub const ENV_FILESYSTEM_ROOT: &str = "HASHPASTE_FILESYSTEM_ROOT";
pub const ENV_SQLITE_PATH: &str = "HASHPASTE_SQLITE_DATABASE_PATH";
pub const ENV_POSTGRES_CONNECTION: &str = "HASHPASTE_POSTGRES_DATABASE_CONNECTION";
pub const ENV_KV_PATH: &str = "HASHPASTE_KV_PATH";

pub const ENV_REDIS_HOST: &str = "HASHPASTE_REDIS_HOST";
pub const ENV_REDIS_PORT: &str = "HASHPASTE_REDIS_PORT";
pub const ENV_REDIS_PASSWORD: &str = "HASHPASTE_REDIS_PASSWORD";
pub const ENV_REDIS_DB_INDEX: &str = "HASHPASTE_REDIS_DB_INDEX";

pub const ENV_S3_ACCESS_KEY_ID: &str = "HASHPASTE_S3_ACCESS_KEY_ID";
pub const ENV_S3_SECRET_ACCESS_KEY: &str = "HASHPASTE_S3_SECRET_ACCESS_KEY";
pub const ENV_S3_BUCKET: &str = "HASHPASTE_S3_BUCKET";
pub const ENV_S3_REGION: &str = "HASHPASTE_S3_REGION";
pub const ENV_S3_ENDPOINT: &str = "HASHPASTE_S3_ENDPOINT";

pub const ENV_AZURE_ACCOUNT_NAME: &str = "HASHPASTE_AZURE_ACCOUNT_NAME";
pub const ENV_AZURE_ACCOUNT_KEY: &str = "HASHPASTE_AZURE_ACCOUNT_KEY";
pub const ENV_AZURE_CONTAINER: &str = "HASHPASTE_AZURE_CONTAINER";
pub const ENV_AZURE_ENDPOINT: &str = "HASHPASTE_AZURE_ENDPOINT";
