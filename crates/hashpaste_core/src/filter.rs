//! Substrate-independent metadata filtering used by every enumeration path.

use crate::store::{Metadata, NO_PASTES_SENTINEL};

/// Decide whether `metadata` satisfies every filter.
///
/// A filter key missing from `metadata` takes its value from `fdefaults`; a key
/// missing from both never matches. No filters means everything matches.
pub fn matches(metadata: &Metadata, filters: &Metadata, fdefaults: &Metadata) -> bool {
    filters.iter().all(|(key, required)| {
        metadata
            .get(key)
            .or_else(|| fdefaults.get(key))
            .is_some_and(|value| value == required)
    })
}

/// Collapse an empty id listing to the `["none"]` sentinel.
pub(crate) fn finish_listing(mut ids: Vec<String>) -> Vec<String> {
    if ids.is_empty() {
        return vec![NO_PASTES_SENTINEL.to_string()];
    }
    ids.sort_unstable();
    ids
}

/// Build a [`Metadata`] map from string pairs.
pub fn metadata_from<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Metadata {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
