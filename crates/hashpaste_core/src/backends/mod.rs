//! Substrate adapters implementing [`PasteStore`] and the factory that picks
//! one from configuration.

pub mod filesystem;
pub mod kv;
pub mod object;
pub mod sql;

use crate::config::BackendConfig;
use crate::error::{wrap_native, StoreResult};
use crate::store::PasteStore;
use self::filesystem::FilesystemStore;
use self::kv::{KeyValueStore, RedbClient, RedisSettings};
use self::object::ObjectStorageStore;
use self::sql::SqlStore;

const KV_OPEN_ERROR: &str = "Could not open the key-value database. Please try again later. \
If the error persists, please contact a system administrator.";

/// Build the adapter selected by `config`.
///
/// The store is not initialized; call [`PasteStore::initialize_backend`]
/// once at startup. Network backends connect lazily.
///
/// # Errors
/// Returns [`crate::error::StoreError::Recoverable`] when the adapter cannot be
/// constructed.
pub fn open_store(config: &BackendConfig) -> StoreResult<Box<dyn PasteStore>> {
    let store: Box<dyn PasteStore> = match config {
        BackendConfig::Filesystem { root } => Box::new(FilesystemStore::new(root.clone())),
        BackendConfig::Sqlite { path, timeout } => Box::new(SqlStore::sqlite(path, *timeout)?),
        BackendConfig::Postgres {
            connection,
            timeout,
        } => Box::new(SqlStore::postgres(connection, *timeout)?),
        BackendConfig::Kv { path } => {
            let client = RedbClient::open(path).map_err(wrap_native("open redb", KV_OPEN_ERROR))?;
            Box::new(KeyValueStore::new(client))
        }
        BackendConfig::Redis(settings) => open_redis(settings)?,
        BackendConfig::S3(settings) => Box::new(ObjectStorageStore::s3(settings)?),
        BackendConfig::Azure(settings) => Box::new(ObjectStorageStore::azure(settings)?),
        BackendConfig::Memory => Box::new(ObjectStorageStore::in_memory()?),
    };
    tracing::info!(backend = config.name(), "Opened paste store");
    Ok(store)
}

#[cfg(feature = "redis")]
fn open_redis(settings: &RedisSettings) -> StoreResult<Box<dyn PasteStore>> {
    let client = kv::RedisClient::new(settings).map_err(wrap_native(
        "build redis client",
        "Could not connect to the backend database. Please try again later.",
    ))?;
    Ok(Box::new(KeyValueStore::new(client)))
}

#[cfg(not(feature = "redis"))]
fn open_redis(_settings: &RedisSettings) -> StoreResult<Box<dyn PasteStore>> {
    tracing::error!("Redis backend selected but hashpaste was built without the redis feature");
    Err(crate::error::StoreError::recoverable(
        "The configured storage backend is not available in this build.",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::logic::paste_id_for;
    use tempfile::TempDir;

    #[test]
    fn factory_opens_in_process_backends() {
        let temp_dir = TempDir::new().expect("temp dir");
        let configs = [
            BackendConfig::Filesystem {
                root: temp_dir.path().join("fs"),
            },
            BackendConfig::Sqlite {
                path: temp_dir.path().join("db.sqlite3"),
                timeout: std::time::Duration::from_secs(5),
            },
            BackendConfig::Kv {
                path: temp_dir.path().join("kv.redb"),
            },
            BackendConfig::Memory,
        ];
        for config in &configs {
            let store = open_store(config).expect("open");
            store.initialize_backend().expect("initialize");
            let paste_id = paste_id_for(config.name());
            store.new_paste(&paste_id, config.name()).expect("write");
            assert_eq!(
                store.get_paste_contents(&paste_id).expect("read"),
                config.name()
            );
        }
    }

    #[cfg(not(feature = "redis"))]
    #[test]
    fn redis_without_feature_is_recoverable() {
        let settings = RedisSettings {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            db_index: 1,
            timeout: std::time::Duration::from_secs(1),
        };
        let err = open_store(&BackendConfig::Redis(settings))
            .err()
            .expect("feature disabled");
        assert!(matches!(err, StoreError::Recoverable(_)));
    }
}
