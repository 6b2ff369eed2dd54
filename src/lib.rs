//! Root crate facade for hashpaste.

pub use hashpaste_core::{
    backends, config, constants, error, filter, logic, open_store, store, BackendConfig,
    Config, ConfigError, LogicError, Metadata, Outcome, PasteService, PasteStore, PasteView,
    ServiceSettings, Severity, StoreError, StoreResult, NO_PASTES_SENTINEL,
};
