//! Shared test-only helpers for hashpaste_core.

use crate::backends::filesystem::FilesystemStore;
use crate::filter::metadata_from;
use crate::logic::paste_id_for;
use crate::store::{Metadata, PasteStore};
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Process environment overrides for one test, undone on drop.
///
/// Holds a crate-wide lock for its whole lifetime, so tests that read or
/// write `HASHPASTE_*` variables never interleave.
pub(crate) struct ScopedEnv {
    saved: Vec<(String, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl ScopedEnv {
    /// Take the lock and unset every name in `names`.
    pub(crate) fn cleared(names: &[&str]) -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut env = Self {
            saved: Vec::new(),
            _lock: lock,
        };
        for name in names {
            env.remember(name);
            std::env::remove_var(name);
        }
        env
    }

    pub(crate) fn set(&mut self, name: &str, value: &str) -> &mut Self {
        self.remember(name);
        std::env::set_var(name, value);
        self
    }

    // Only the first value seen is restored.
    fn remember(&mut self, name: &str) {
        if !self.saved.iter().any(|(saved, _)| saved == name) {
            self.saved.push((name.to_string(), std::env::var(name).ok()));
        }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (name, previous) in self.saved.drain(..).rev() {
            match previous {
                Some(value) => std::env::set_var(&name, value),
                None => std::env::remove_var(&name),
            }
        }
    }
}

/// Creates an initialized filesystem store in a fresh temp dir.
///
/// Keep the [`TempDir`] alive for the full test to preserve the backing files.
///
/// # Panics
/// Panics if temp-dir creation or backend initialization fails.
pub(crate) fn setup_temp_fs_store() -> (FilesystemStore, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let store = FilesystemStore::new(temp_dir.path().join("pastes"));
    store.initialize_backend().expect("initialize filesystem store");
    (store, temp_dir)
}

/// Store `content` under its content-derived id and return the id.
pub(crate) fn put_paste<S: PasteStore + ?Sized>(store: &S, content: &str) -> String {
    let paste_id = paste_id_for(content);
    store.new_paste(&paste_id, content).expect("new paste");
    paste_id
}

/// Behaviour every [`PasteStore`] adapter must share.
///
/// `store` must be initialized and empty.
pub(crate) mod contract {
    use super::*;
    use crate::error::StoreError;

    pub(crate) fn run_all<S: PasteStore + ?Sized>(store: &S) {
        empty_store_lists_sentinel(store);
        initialize_is_idempotent(store);
        content_round_trips(store);
        existence_tracks_creation(store);
        metadata_update_is_full_replace(store);
        missing_metadata_is_a_warning(store);
        metadata_value_lookup(store);
        listing_applies_filters_and_defaults(store);
    }

    fn empty_store_lists_sentinel<S: PasteStore + ?Sized>(store: &S) {
        let ids = store
            .get_all_paste_ids(&Metadata::new(), &Metadata::new())
            .expect("list empty store");
        assert_eq!(ids, vec!["none".to_string()]);

        let filters = metadata_from([("visibility", "public")]);
        let ids = store
            .get_all_paste_ids(&filters, &filters)
            .expect("list empty store with filters");
        assert_eq!(ids, vec!["none".to_string()]);
    }

    fn initialize_is_idempotent<S: PasteStore + ?Sized>(store: &S) {
        let paste_id = put_paste(store, "survives re-initialization");
        store.initialize_backend().expect("second initialize");
        store.initialize_backend().expect("third initialize");
        assert!(store.does_paste_exist(&paste_id).expect("exists"));
        assert_eq!(
            store.get_paste_contents(&paste_id).expect("contents"),
            "survives re-initialization"
        );
    }

    fn content_round_trips<S: PasteStore + ?Sized>(store: &S) {
        for content in [
            "hello world",
            "",
            "multi\nline\r\ncontent\twith tabs",
            "ünïcödé ✓ 中文 🦀",
        ] {
            let paste_id = put_paste(store, content);
            assert_eq!(
                store.get_paste_contents(&paste_id).expect("contents"),
                content,
                "content: {:?}",
                content
            );
        }
    }

    fn existence_tracks_creation<S: PasteStore + ?Sized>(store: &S) {
        let content = "existence check";
        let paste_id = paste_id_for(content);
        assert!(!store.does_paste_exist(&paste_id).expect("exists before"));
        store.new_paste(&paste_id, content).expect("new paste");
        assert!(store.does_paste_exist(&paste_id).expect("exists after"));
    }

    fn metadata_update_is_full_replace<S: PasteStore + ?Sized>(store: &S) {
        let paste_id = put_paste(store, "full replace");
        let first = metadata_from([("date", "100"), ("visibility", "public"), ("a", "1")]);
        let second = metadata_from([("visibility", "unlisted"), ("b", "2")]);

        store
            .update_paste_metadata(&paste_id, &first)
            .expect("first update");
        assert_eq!(store.get_paste_metadata(&paste_id).expect("meta"), first);

        store
            .update_paste_metadata(&paste_id, &second)
            .expect("second update");
        assert_eq!(store.get_paste_metadata(&paste_id).expect("meta"), second);
        assert_eq!(
            store
                .get_paste_metadata_value(&paste_id, "date")
                .expect("date lookup"),
            None
        );
    }

    fn missing_metadata_is_a_warning<S: PasteStore + ?Sized>(store: &S) {
        let paste_id = put_paste(store, "no metadata yet");
        assert!(matches!(
            store.get_paste_metadata(&paste_id),
            Err(StoreError::Warning(_))
        ));
        assert!(matches!(
            store.get_paste_metadata_value(&paste_id, "date"),
            Err(StoreError::Warning(_))
        ));
    }

    fn metadata_value_lookup<S: PasteStore + ?Sized>(store: &S) {
        let paste_id = put_paste(store, "value lookup");
        let metadata = metadata_from([("date", "1700000000"), ("visibility", "public")]);
        store
            .update_paste_metadata(&paste_id, &metadata)
            .expect("update");
        assert_eq!(
            store
                .get_paste_metadata_value(&paste_id, "date")
                .expect("date"),
            Some("1700000000".to_string())
        );
        assert_eq!(
            store
                .get_paste_metadata_value(&paste_id, "unset")
                .expect("unset"),
            None
        );
    }

    fn listing_applies_filters_and_defaults<S: PasteStore + ?Sized>(store: &S) {
        let public = put_paste(store, "listing: public");
        let unlisted = put_paste(store, "listing: unlisted");
        let legacy = put_paste(store, "listing: no visibility key");
        store
            .update_paste_metadata(&public, &metadata_from([("visibility", "public")]))
            .expect("public meta");
        store
            .update_paste_metadata(&unlisted, &metadata_from([("visibility", "unlisted")]))
            .expect("unlisted meta");
        store
            .update_paste_metadata(&legacy, &metadata_from([("date", "1")]))
            .expect("legacy meta");

        let filters = metadata_from([("visibility", "public")]);
        let ids = store
            .get_all_paste_ids(&filters, &filters)
            .expect("filtered list");
        assert!(ids.contains(&public));
        assert!(ids.contains(&legacy), "missing key must fall back to default");
        assert!(!ids.contains(&unlisted));

        let ids = store
            .get_all_paste_ids(&filters, &Metadata::new())
            .expect("filtered list without defaults");
        assert!(ids.contains(&public));
        assert!(!ids.contains(&legacy));

        let all = store
            .get_all_paste_ids(&Metadata::new(), &Metadata::new())
            .expect("unfiltered list");
        for paste_id in [&public, &unlisted, &legacy] {
            assert!(all.contains(paste_id));
        }
        assert!(!all.iter().any(|id| id == "none"));
    }
}

#[test]
fn scoped_env_restores_what_it_touched() {
    let name = "HASHPASTE_TEST_SCOPED_ENV";
    {
        let mut env = ScopedEnv::cleared(&[name]);
        assert!(std::env::var(name).is_err());
        env.set(name, "first").set(name, "second");
        assert_eq!(std::env::var(name).as_deref(), Ok("second"));
    }
    assert!(std::env::var(name).is_err());
}
