//! Embedded key-value client backed by a redb file.

use super::{KeyValueClient, KvError};
use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;

/// Single flat string table holding every key.
const ENTRIES: TableDefinition<&str, &str> = TableDefinition::new("entries");

/// [`KeyValueClient`] over a local redb database.
///
/// redb locks its file, so one process owns a database at a time; threads in
/// that process share this client.
pub struct RedbClient {
    db: redb::Database,
}

impl RedbClient {
    /// Open or create the database file and its table.
    ///
    /// # Errors
    /// Returns an error when redb cannot open the file or create the table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KvError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| KvError::Message(format!("Failed to create directory: {}", err)))?;
        }
        let db = redb::Database::create(path)?;
        let client = Self { db };
        client.ensure_table()?;
        Ok(client)
    }

    fn ensure_table(&self) -> Result<(), KvError> {
        let write_txn = self.db.begin_write()?;
        write_txn.open_table(ENTRIES)?;
        write_txn.commit()?;
        Ok(())
    }

    fn collect_keys(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;
        let mut keys = Vec::new();
        for item in table.range(prefix..)? {
            let (key, _) = item?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key.to_string());
        }
        Ok(keys)
    }
}

impl KeyValueClient for RedbClient {
    fn ping(&self) -> Result<(), KvError> {
        self.ensure_table()
    }

    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;
        let value = table.get(key)?.map(|guard| guard.value().to_string());
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ENTRIES)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), KvError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ENTRIES)?;
            let _ = table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, KvError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;
        let found = table.get(key)?.is_some();
        Ok(found)
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        self.collect_keys(prefix)
    }

    fn keys(&self) -> Result<Vec<String>, KvError> {
        self.collect_keys("")
    }
}
