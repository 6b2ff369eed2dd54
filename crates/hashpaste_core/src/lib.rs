//! Core library for hashpaste: the paste store contract, its substrate
//! adapters, and the orchestration layer on top.

/// Substrate adapters and the backend factory.
pub mod backends;
/// Configuration loading and defaults.
pub mod config;
/// Shared constants and environment variable names.
pub mod constants;
/// Error taxonomy shared by stores and orchestration.
pub mod error;
/// Metadata filter matching.
pub mod filter;
/// Create, view, and list operations over a store.
pub mod logic;
mod runtime;
/// The paste store contract.
pub mod store;

#[cfg(test)]
mod test_support;

pub use backends::open_store;
pub use config::{BackendConfig, Config};
pub use error::{ConfigError, LogicError, Severity, StoreError, StoreResult};
pub use logic::{Outcome, PasteService, PasteView, ServiceSettings};
pub use store::{Metadata, PasteStore, NO_PASTES_SENTINEL};
