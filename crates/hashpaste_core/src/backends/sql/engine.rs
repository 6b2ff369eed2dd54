//! Dialect-agnostic relational engine shared by the SQL-backed stores.
//!
//! Schema (kept stable for existing databases):
//! `pastes(id, content)` keyed by `id`, and `pastes_metadata(id, key, value)`
//! keyed by `(id, key)`.

use crate::filter::{finish_listing, matches};
use crate::store::Metadata;
use sqlx::AnyPool;
use sqlx::Row;
use std::collections::BTreeMap;

/// Bind-parameter syntax of the target dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` for every parameter (SQLite).
    QuestionMark,
    /// `$1`, `$2`, ... (Postgres).
    DollarNumbered,
}

impl PlaceholderStyle {
    /// Rewrite a statement written with `?` placeholders into this style.
    pub fn prepare(self, sql: &str) -> String {
        match self {
            Self::QuestionMark => sql.to_string(),
            Self::DollarNumbered => {
                let mut prepared = String::with_capacity(sql.len() + 8);
                let mut index = 0;
                for ch in sql.chars() {
                    if ch == '?' {
                        index += 1;
                        prepared.push('$');
                        prepared.push_str(&index.to_string());
                    } else {
                        prepared.push(ch);
                    }
                }
                prepared
            }
        }
    }
}

const CREATE_PASTES: &str = "CREATE TABLE IF NOT EXISTS pastes (
    id TEXT,
    content TEXT,
    PRIMARY KEY (id))";
const CREATE_PASTES_METADATA: &str = "CREATE TABLE IF NOT EXISTS pastes_metadata (
    id TEXT,
    key TEXT,
    value TEXT,
    PRIMARY KEY (id, key))";
const INSERT_PASTE: &str =
    "INSERT INTO pastes (id, content) VALUES (?, ?) ON CONFLICT (id) DO NOTHING";
const DELETE_METADATA: &str = "DELETE FROM pastes_metadata WHERE id = ?";
const INSERT_METADATA: &str = "INSERT INTO pastes_metadata (id, key, value) VALUES (?, ?, ?)";
const SELECT_EXISTS: &str = "SELECT 1 FROM pastes WHERE id = ?";
const SELECT_CONTENT: &str = "SELECT content FROM pastes WHERE id = ?";
const SELECT_METADATA: &str = "SELECT key, value FROM pastes_metadata WHERE id = ?";
const SELECT_METADATA_VALUE: &str = "SELECT value FROM pastes_metadata WHERE id = ? AND key = ?";
const SELECT_LISTING: &str = "SELECT id, key, value FROM pastes_metadata
    UNION
    SELECT id, '', '' FROM pastes";

/// Relational paste engine over one connection pool and one placeholder style.
///
/// Methods return raw [`sqlx::Error`]; wrapping into the store taxonomy is the
/// caller's job.
pub struct SqlCore {
    pool: AnyPool,
    placeholders: PlaceholderStyle,
}

impl SqlCore {
    pub fn new(pool: AnyPool, placeholders: PlaceholderStyle) -> Self {
        Self { pool, placeholders }
    }

    fn sql(&self, statement: &str) -> String {
        self.placeholders.prepare(statement)
    }

    /// Create both tables if missing.
    pub async fn initialize(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&self.sql(CREATE_PASTES))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&self.sql(CREATE_PASTES_METADATA))
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    /// Insert content; an existing row for `paste_id` is left untouched.
    pub async fn new_paste(&self, paste_id: &str, content: &str) -> Result<(), sqlx::Error> {
        sqlx::query(&self.sql(INSERT_PASTE))
            .bind(paste_id)
            .bind(content)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete every metadata row for `paste_id` and insert `metadata`, in one
    /// transaction so readers see either the old or the new set.
    pub async fn update_paste_metadata(
        &self,
        paste_id: &str,
        metadata: &Metadata,
    ) -> Result<(), sqlx::Error> {
        let delete = self.sql(DELETE_METADATA);
        let insert = self.sql(INSERT_METADATA);

        let mut tx = self.pool.begin().await?;
        sqlx::query(&delete)
            .bind(paste_id)
            .execute(&mut *tx)
            .await?;
        for (key, value) in metadata {
            sqlx::query(&insert)
                .bind(paste_id)
                .bind(key.as_str())
                .bind(value.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await
    }

    pub async fn does_paste_exist(&self, paste_id: &str) -> Result<bool, sqlx::Error> {
        let row = sqlx::query(&self.sql(SELECT_EXISTS))
            .bind(paste_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn get_paste_contents(&self, paste_id: &str) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query(&self.sql(SELECT_CONTENT))
            .bind(paste_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| row.try_get::<String, _>(0)).transpose()
    }

    pub async fn get_paste_metadata(&self, paste_id: &str) -> Result<Metadata, sqlx::Error> {
        let rows = sqlx::query(&self.sql(SELECT_METADATA))
            .bind(paste_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| -> Result<(String, String), sqlx::Error> {
                Ok((row.try_get(0)?, row.try_get(1)?))
            })
            .collect()
    }

    pub async fn get_paste_metadata_value(
        &self,
        paste_id: &str,
        key: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query(&self.sql(SELECT_METADATA_VALUE))
            .bind(paste_id)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| row.try_get::<String, _>(0)).transpose()
    }

    /// Ids of stored pastes whose metadata passes the filter, with the `none`
    /// sentinel when nothing matches.
    ///
    /// Pastes without metadata still appear through their synthetic empty row;
    /// metadata rows with no stored paste are ignored.
    pub async fn get_all_paste_ids(
        &self,
        filters: &Metadata,
        fdefaults: &Metadata,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query(&self.sql(SELECT_LISTING))
            .fetch_all(&self.pool)
            .await?;

        let mut grouped: BTreeMap<String, (bool, Metadata)> = BTreeMap::new();
        for row in &rows {
            let paste_id: String = row.try_get(0)?;
            let key: String = row.try_get(1)?;
            let value: String = row.try_get(2)?;
            let (stored, metadata) = grouped.entry(paste_id).or_default();
            if key.is_empty() {
                *stored = true;
            } else {
                metadata.insert(key, value);
            }
        }

        let ids = grouped
            .into_iter()
            .filter(|(_, (stored, metadata))| *stored && matches(metadata, filters, fdefaults))
            .map(|(paste_id, _)| paste_id)
            .collect();
        Ok(finish_listing(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::PlaceholderStyle;

    #[test]
    fn question_marks_pass_through() {
        assert_eq!(
            PlaceholderStyle::QuestionMark.prepare("SELECT 1 WHERE a = ? AND b = ?"),
            "SELECT 1 WHERE a = ? AND b = ?"
        );
    }

    #[test]
    fn dollar_style_numbers_parameters_in_order() {
        assert_eq!(
            PlaceholderStyle::DollarNumbered
                .prepare("INSERT INTO t (a, b, c) VALUES (?, ?, ?)"),
            "INSERT INTO t (a, b, c) VALUES ($1, $2, $3)"
        );
    }
}
