//! Paste storage on a flat key-value substrate.
//!
//! Content lives under the bare paste id and every metadata entry under a
//! synthetic `<id>.<key>` key. The substrate only needs single-key
//! get/set/delete plus prefix and full key scans, see [`KeyValueClient`].

mod redb_client;
#[cfg(feature = "redis")]
mod redis_client;

pub use self::redb_client::RedbClient;
#[cfg(feature = "redis")]
pub use self::redis_client::RedisClient;

use crate::error::{wrap_native, StoreError, StoreResult};
use crate::filter::{finish_listing, matches};
use crate::store::{
    missing_metadata_value, require_metadata, validate_metadata_key, Metadata, PasteStore,
};
use std::time::Duration;
use thiserror::Error;

/// Separator between a paste id and a metadata key.
pub const METADATA_SEPARATOR: char = '.';

const CONNECT_ERROR: &str = "Could not connect to the backend database. Please try again later. \
If the error persists, please contact a system administrator.";
const KV_ERROR: &str = "Error while communicating with the key-value store";

/// Connection settings for a Redis-compatible server.
///
/// Always available so configuration can name the backend; connecting needs
/// the `redis` feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db_index: i64,
    pub timeout: Duration,
}

/// Native errors raised by key-value clients.
#[derive(Error, Debug)]
pub enum KvError {
    #[error("Database error: {0}")]
    Redb(#[from] redb::Error),

    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Key-value error: {0}")]
    Message(String),
}

impl From<redb::DatabaseError> for KvError {
    fn from(value: redb::DatabaseError) -> Self {
        Self::Redb(value.into())
    }
}

impl From<redb::TransactionError> for KvError {
    fn from(value: redb::TransactionError) -> Self {
        Self::Redb(value.into())
    }
}

impl From<redb::TableError> for KvError {
    fn from(value: redb::TableError) -> Self {
        Self::Redb(value.into())
    }
}

impl From<redb::StorageError> for KvError {
    fn from(value: redb::StorageError) -> Self {
        Self::Redb(value.into())
    }
}

impl From<redb::CommitError> for KvError {
    fn from(value: redb::CommitError) -> Self {
        Self::Redb(value.into())
    }
}

/// Minimal single-key operations a key-value substrate must offer.
///
/// None of these are grouped into transactions by the store, so the client
/// may be a network server shared by several processes.
pub trait KeyValueClient: Send + Sync {
    /// Verify the substrate is reachable and ready.
    fn ping(&self) -> Result<(), KvError>;
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    fn set(&self, key: &str, value: &str) -> Result<(), KvError>;
    /// Remove `key`; removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), KvError>;
    fn exists(&self, key: &str) -> Result<bool, KvError>;
    /// Every key starting with `prefix`.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, KvError>;
    /// Every key in the keyspace.
    fn keys(&self) -> Result<Vec<String>, KvError>;
}

/// [`PasteStore`] over any [`KeyValueClient`].
pub struct KeyValueStore<C> {
    client: C,
}

fn kv_error(context: &'static str) -> impl Fn(KvError) -> StoreError {
    wrap_native(context, KV_ERROR)
}

fn metadata_key(paste_id: &str, key: &str) -> String {
    format!("{}{}{}", paste_id, METADATA_SEPARATOR, key)
}

fn metadata_prefix(paste_id: &str) -> String {
    format!("{}{}", paste_id, METADATA_SEPARATOR)
}

impl<C: KeyValueClient> KeyValueStore<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn read_metadata(&self, paste_id: &str) -> StoreResult<Metadata> {
        let prefix = metadata_prefix(paste_id);
        let mut metadata = Metadata::new();
        for full_key in self
            .client
            .scan_prefix(&prefix)
            .map_err(kv_error("scan metadata"))?
        {
            let Some(key) = full_key.strip_prefix(prefix.as_str()) else {
                continue;
            };
            // Keys deleted between scan and read are skipped.
            if let Some(value) = self.client.get(&full_key).map_err(kv_error("read metadata"))? {
                metadata.insert(key.to_string(), value);
            }
        }
        Ok(metadata)
    }

    /// Fetch only the metadata keys named by `filters`.
    fn read_filter_values(&self, paste_id: &str, filters: &Metadata) -> StoreResult<Metadata> {
        let mut metadata = Metadata::new();
        for key in filters.keys() {
            if let Some(value) = self
                .client
                .get(&metadata_key(paste_id, key))
                .map_err(kv_error("read filter value"))?
            {
                metadata.insert(key.clone(), value);
            }
        }
        Ok(metadata)
    }
}

impl<C: KeyValueClient> PasteStore for KeyValueStore<C> {
    fn initialize_backend(&self) -> StoreResult<()> {
        self.client
            .ping()
            .map_err(wrap_native("ping key-value store", CONNECT_ERROR))?;
        tracing::info!("Key-value paste store ready");
        Ok(())
    }

    fn new_paste(&self, paste_id: &str, content: &str) -> StoreResult<()> {
        self.client
            .set(paste_id, content)
            .map_err(kv_error("write paste"))
    }

    fn update_paste_metadata(&self, paste_id: &str, metadata: &Metadata) -> StoreResult<()> {
        for key in metadata.keys() {
            validate_metadata_key(key)?;
        }
        for stale in self
            .client
            .scan_prefix(&metadata_prefix(paste_id))
            .map_err(kv_error("scan metadata"))?
        {
            self.client
                .delete(&stale)
                .map_err(kv_error("delete metadata"))?;
        }
        for (key, value) in metadata {
            self.client
                .set(&metadata_key(paste_id, key), value)
                .map_err(kv_error("write metadata"))?;
        }
        tracing::debug!(paste_id, keys = metadata.len(), "Replaced paste metadata");
        Ok(())
    }

    fn does_paste_exist(&self, paste_id: &str) -> StoreResult<bool> {
        if paste_id.contains(METADATA_SEPARATOR) {
            return Ok(false);
        }
        self.client
            .exists(paste_id)
            .map_err(kv_error("check paste"))
    }

    fn get_paste_contents(&self, paste_id: &str) -> StoreResult<String> {
        self.client
            .get(paste_id)
            .map_err(kv_error("read paste"))?
            .ok_or_else(|| {
                tracing::warn!(paste_id, "Paste content key missing");
                StoreError::recoverable(KV_ERROR)
            })
    }

    fn get_paste_metadata(&self, paste_id: &str) -> StoreResult<Metadata> {
        require_metadata(self.read_metadata(paste_id)?)
    }

    fn get_paste_metadata_value(&self, paste_id: &str, key: &str) -> StoreResult<Option<String>> {
        validate_metadata_key(key)?;
        match self
            .client
            .get(&metadata_key(paste_id, key))
            .map_err(kv_error("read metadata value"))?
        {
            Some(value) => Ok(Some(value)),
            None => {
                let has_any = !self
                    .client
                    .scan_prefix(&metadata_prefix(paste_id))
                    .map_err(kv_error("scan metadata"))?
                    .is_empty();
                missing_metadata_value(has_any)
            }
        }
    }

    fn get_all_paste_ids(
        &self,
        filters: &Metadata,
        fdefaults: &Metadata,
    ) -> StoreResult<Vec<String>> {
        let keys = self.client.keys().map_err(kv_error("list keys"))?;
        let mut ids = Vec::new();
        for paste_id in keys
            .into_iter()
            .filter(|key| !key.contains(METADATA_SEPARATOR))
        {
            if filters.is_empty()
                || matches(
                    &self.read_filter_values(&paste_id, filters)?,
                    filters,
                    fdefaults,
                )
            {
                ids.push(paste_id);
            }
        }
        Ok(finish_listing(ids))
    }
}
