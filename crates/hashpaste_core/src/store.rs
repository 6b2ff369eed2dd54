//! The paste store contract every backend adapter implements.

use crate::error::{StoreError, StoreResult, METADATA_UNAVAILABLE};
use std::collections::BTreeMap;

/// Metadata attached to a paste: ASCII keys, UTF-8 values, unique keys.
pub type Metadata = BTreeMap<String, String>;

/// Reserved enumeration result meaning "no matching pastes".
pub const NO_PASTES_SENTINEL: &str = "none";

/// Storage contract shared by every substrate adapter.
///
/// All operations are blocking and may be called concurrently from several
/// threads or processes. Adapters rely on their substrate for concurrency
/// control and hold no cross-call locks.
///
/// `update_paste_metadata` is a full replace. On the filesystem, key-value and
/// object-storage adapters it is a delete-then-write (or clear-then-set)
/// sequence, so a concurrent reader may briefly observe empty or partial
/// metadata, and a failure between the two steps leaves the old keys removed.
/// Retrying the update restores a consistent set.
pub trait PasteStore: Send + Sync {
    /// Create whatever the substrate needs (schema, directory, table) if
    /// absent. Safe to call on every start; never destroys data.
    fn initialize_backend(&self) -> StoreResult<()>;

    /// Persist `content` under `paste_id`. No existence check is performed.
    fn new_paste(&self, paste_id: &str, content: &str) -> StoreResult<()>;

    /// Replace all metadata of `paste_id` with exactly `metadata`.
    fn update_paste_metadata(&self, paste_id: &str, metadata: &Metadata) -> StoreResult<()>;

    /// `true` iff content is stored and readable for `paste_id`.
    fn does_paste_exist(&self, paste_id: &str) -> StoreResult<bool>;

    /// Stored content. Callers check existence first; a missing paste is a
    /// [`StoreError::Recoverable`].
    fn get_paste_contents(&self, paste_id: &str) -> StoreResult<String>;

    /// All stored metadata. Returns [`StoreError::Warning`] when nothing is
    /// stored, since callers expect at least the creation date.
    fn get_paste_metadata(&self, paste_id: &str) -> StoreResult<Metadata>;

    /// A single metadata value; `Ok(None)` when the key is unset while other
    /// keys exist, [`StoreError::Warning`] when the paste has no metadata.
    fn get_paste_metadata_value(&self, paste_id: &str, key: &str) -> StoreResult<Option<String>>;

    /// Ids whose metadata matches `filters` (missing keys fall back to
    /// `fdefaults`), or `["none"]` when nothing matches.
    fn get_all_paste_ids(&self, filters: &Metadata, fdefaults: &Metadata)
        -> StoreResult<Vec<String>>;
}

impl<S: PasteStore + ?Sized> PasteStore for Box<S> {
    fn initialize_backend(&self) -> StoreResult<()> {
        (**self).initialize_backend()
    }

    fn new_paste(&self, paste_id: &str, content: &str) -> StoreResult<()> {
        (**self).new_paste(paste_id, content)
    }

    fn update_paste_metadata(&self, paste_id: &str, metadata: &Metadata) -> StoreResult<()> {
        (**self).update_paste_metadata(paste_id, metadata)
    }

    fn does_paste_exist(&self, paste_id: &str) -> StoreResult<bool> {
        (**self).does_paste_exist(paste_id)
    }

    fn get_paste_contents(&self, paste_id: &str) -> StoreResult<String> {
        (**self).get_paste_contents(paste_id)
    }

    fn get_paste_metadata(&self, paste_id: &str) -> StoreResult<Metadata> {
        (**self).get_paste_metadata(paste_id)
    }

    fn get_paste_metadata_value(&self, paste_id: &str, key: &str) -> StoreResult<Option<String>> {
        (**self).get_paste_metadata_value(paste_id, key)
    }

    fn get_all_paste_ids(
        &self,
        filters: &Metadata,
        fdefaults: &Metadata,
    ) -> StoreResult<Vec<String>> {
        (**self).get_all_paste_ids(filters, fdefaults)
    }
}

/// Reject metadata keys that cannot be stored as a `<id>.<key>` name.
///
/// # Errors
/// Returns [`StoreError::Recoverable`] for empty, non-ASCII, or path-like keys.
pub(crate) fn validate_metadata_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key.is_ascii()
        && !key.contains(['/', '\\'])
        && !key.chars().any(|c| c.is_ascii_control())
        && key != "."
        && key != "..";
    if valid {
        Ok(())
    } else {
        Err(StoreError::recoverable(format!(
            "Invalid metadata key '{}'.",
            key.escape_default()
        )))
    }
}

/// Result for a metadata key that is not stored.
///
/// `has_any_metadata` tells unset keys apart from pastes with no metadata.
pub(crate) fn missing_metadata_value(has_any_metadata: bool) -> StoreResult<Option<String>> {
    if has_any_metadata {
        Ok(None)
    } else {
        Err(StoreError::warning(METADATA_UNAVAILABLE))
    }
}

/// Reject empty metadata read back from a substrate.
pub(crate) fn require_metadata(metadata: Metadata) -> StoreResult<Metadata> {
    if metadata.is_empty() {
        Err(StoreError::warning(METADATA_UNAVAILABLE))
    } else {
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_keys_reject_path_traversal_and_empty() {
        for key in ["", "../date", "a/b", "a\\b", ".", "..", "daté", "a\nb"] {
            assert!(validate_metadata_key(key).is_err(), "key: {:?}", key);
        }
        for key in ["date", "visibility", "x-custom.key"] {
            assert!(validate_metadata_key(key).is_ok(), "key: {:?}", key);
        }
    }

    #[test]
    fn missing_value_distinguishes_unset_key_from_missing_metadata() {
        assert_eq!(missing_metadata_value(true), Ok(None));
        assert!(matches!(
            missing_metadata_value(false),
            Err(StoreError::Warning(_))
        ));
    }
}
