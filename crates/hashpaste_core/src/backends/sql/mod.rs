//! Relational paste stores (SQLite and Postgres) sharing one SQL core.

pub mod engine;

pub use self::engine::{PlaceholderStyle, SqlCore};

use crate::error::{wrap_native, StoreError, StoreResult};
use crate::runtime::BlockingRuntime;
use crate::store::{
    missing_metadata_value, require_metadata, validate_metadata_key, Metadata, PasteStore,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sqlx::any::AnyPoolOptions;
use std::path::Path;
use std::time::Duration;

// Everything but path separators and unreserved characters.
const SQLITE_PATH_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Connection URL for a SQLite file, created on first use.
fn sqlite_url(path: &Path) -> String {
    format!(
        "sqlite://{}?mode=rwc",
        utf8_percent_encode(&path.to_string_lossy(), SQLITE_PATH_ESCAPES)
    )
}

/// Supported relational dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Sqlite,
    Postgres,
}

impl SqlDialect {
    pub fn placeholders(self) -> PlaceholderStyle {
        match self {
            Self::Sqlite => PlaceholderStyle::QuestionMark,
            Self::Postgres => PlaceholderStyle::DollarNumbered,
        }
    }

    fn error_message(self) -> &'static str {
        match self {
            Self::Sqlite => "Error while communicating with the SQLite database",
            Self::Postgres => "Error while communicating with the Postgres database",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }

    // SQLite serializes writers anyway; one connection avoids busy errors.
    fn max_connections(self) -> u32 {
        match self {
            Self::Sqlite => 1,
            Self::Postgres => 5,
        }
    }
}

/// [`PasteStore`] over a relational database.
pub struct SqlStore {
    core: SqlCore,
    dialect: SqlDialect,
    runtime: BlockingRuntime,
}

impl SqlStore {
    /// Open (lazily) a SQLite database file, creating it on first use.
    ///
    /// # Errors
    /// Returns [`StoreError::Recoverable`] when the parent directory or the
    /// pool cannot be prepared.
    pub fn sqlite(path: impl AsRef<Path>, timeout: Duration) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(wrap_native(
                "create sqlite directory",
                SqlDialect::Sqlite.error_message(),
            ))?;
        }
        Self::connect(SqlDialect::Sqlite, &sqlite_url(path), timeout)
    }

    /// Open (lazily) a Postgres database from a connection URL.
    ///
    /// # Errors
    /// Returns [`StoreError::Recoverable`] when the URL is unusable.
    pub fn postgres(connection: &str, timeout: Duration) -> StoreResult<Self> {
        Self::connect(SqlDialect::Postgres, connection, timeout)
    }

    fn connect(dialect: SqlDialect, url: &str, timeout: Duration) -> StoreResult<Self> {
        sqlx::any::install_default_drivers();
        let runtime = BlockingRuntime::new(dialect.label())?;
        let pool = runtime
            .block_on(async {
                AnyPoolOptions::new()
                    .max_connections(dialect.max_connections())
                    .acquire_timeout(timeout)
                    .connect_lazy(url)
            })
            .map_err(wrap_native("open sql pool", dialect.error_message()))?;
        Ok(Self {
            core: SqlCore::new(pool, dialect.placeholders()),
            dialect,
            runtime,
        })
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    fn wrap(&self, context: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
        wrap_native(context, self.dialect.error_message())
    }
}

impl PasteStore for SqlStore {
    fn initialize_backend(&self) -> StoreResult<()> {
        self.runtime
            .block_on(self.core.initialize())
            .map_err(self.wrap("initialize schema"))?;
        tracing::info!(dialect = self.dialect.label(), "SQL paste store ready");
        Ok(())
    }

    fn new_paste(&self, paste_id: &str, content: &str) -> StoreResult<()> {
        self.runtime
            .block_on(self.core.new_paste(paste_id, content))
            .map_err(self.wrap("insert paste"))
    }

    fn update_paste_metadata(&self, paste_id: &str, metadata: &Metadata) -> StoreResult<()> {
        for key in metadata.keys() {
            validate_metadata_key(key)?;
        }
        self.runtime
            .block_on(self.core.update_paste_metadata(paste_id, metadata))
            .map_err(self.wrap("replace metadata"))
    }

    fn does_paste_exist(&self, paste_id: &str) -> StoreResult<bool> {
        self.runtime
            .block_on(self.core.does_paste_exist(paste_id))
            .map_err(self.wrap("check paste"))
    }

    fn get_paste_contents(&self, paste_id: &str) -> StoreResult<String> {
        self.runtime
            .block_on(self.core.get_paste_contents(paste_id))
            .map_err(self.wrap("read paste"))?
            .ok_or_else(|| {
                tracing::warn!(paste_id, "Paste content row missing");
                StoreError::recoverable(self.dialect.error_message())
            })
    }

    fn get_paste_metadata(&self, paste_id: &str) -> StoreResult<Metadata> {
        let metadata = self
            .runtime
            .block_on(self.core.get_paste_metadata(paste_id))
            .map_err(self.wrap("read metadata"))?;
        require_metadata(metadata)
    }

    fn get_paste_metadata_value(&self, paste_id: &str, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .runtime
            .block_on(self.core.get_paste_metadata_value(paste_id, key))
            .map_err(self.wrap("read metadata value"))?;
        if value.is_some() {
            return Ok(value);
        }
        let has_any = !self
            .runtime
            .block_on(self.core.get_paste_metadata(paste_id))
            .map_err(self.wrap("read metadata"))?
            .is_empty();
        missing_metadata_value(has_any)
    }

    fn get_all_paste_ids(
        &self,
        filters: &Metadata,
        fdefaults: &Metadata,
    ) -> StoreResult<Vec<String>> {
        self.runtime
            .block_on(self.core.get_all_paste_ids(filters, fdefaults))
            .map_err(self.wrap("list pastes"))
    }
}

#[cfg(test)]
mod tests;
