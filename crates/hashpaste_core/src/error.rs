//! Outcome severities and error types shared by every paste store and the
//! orchestration layer.
use std::fmt::Display;
use thiserror::Error;

/// Severity attached to every outcome handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The action did not complete; the caller should report and allow a retry.
    Error,
    /// The primary action completed but an auxiliary expectation was not met.
    Warning,
    /// The action completed; an optional note is attached.
    Info,
}

/// The only error a [`crate::store::PasteStore`] adapter may return.
///
/// Messages are substrate-agnostic and safe to show to end users. Native
/// driver errors are logged at the adapter boundary and never carried here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0}")]
    Recoverable(String),

    #[error("{0}")]
    Warning(String),
}

impl StoreError {
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self::Recoverable(message.into())
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning(message.into())
    }

    /// Severity of this error in the shared taxonomy.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Recoverable(_) => Severity::Error,
            Self::Warning(_) => Severity::Warning,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Recoverable(message) | Self::Warning(message) => message,
        }
    }
}

/// Result alias used by every store operation.
pub type StoreResult<T> = Result<T, StoreError>;

/// Message returned when stored metadata could not be found for a paste.
pub const METADATA_UNAVAILABLE: &str = "Failed to load Paste Metadata. Some features like the \
paste date may not work. If the problem persists, try notifying a system administrator.";

/// Build a wrapper that logs a native substrate error and replaces it with a
/// fixed, substrate-agnostic [`StoreError::Recoverable`].
///
/// # Arguments
/// - `context`: Short operation label used only in logs.
/// - `message`: User-facing message carried by the returned error.
///
/// # Returns
/// A closure suitable for `map_err`.
pub(crate) fn wrap_native<E: Display>(
    context: &'static str,
    message: &'static str,
) -> impl Fn(E) -> StoreError {
    move |err| {
        tracing::warn!(operation = context, error = %err, "Paste store operation failed");
        StoreError::Recoverable(message.to_string())
    }
}

/// Configuration errors raised while reading the environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Required environment variable {0} not set")]
    MissingVar(String),

    #[error("Environment variable {name} with value {value} is not valid: {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
}

/// Errors produced by the orchestration layer before or around store calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogicError {
    #[error("The requested paste visibility is not currently supported.")]
    UnsupportedVisibility,

    #[error("Invalid Paste ID. Please check the link you used or use the Pastes button above.")]
    InvalidPasteId,

    #[error(
        "Paste ID has invalid length. Paste IDs are 64 characters long. Please make sure \
         the link you clicked is correct or use the Pastes button above."
    )]
    InvalidPasteIdLength,

    #[error("A paste with this Paste ID could not be found. Sorry.")]
    NotFound,

    #[error(
        "The paste sent is too large. This instance has a maximum allowed paste size of {limit}."
    )]
    TooLarge { limit: String },

    #[error("Paste listing has been disabled by the administrator.")]
    ListingDisabled,

    #[error(
        "A different paste is already stored under this Paste ID. Please notify a system \
         administrator."
    )]
    Collision,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LogicError {
    /// HTTP status the presentation layer should use for this failure.
    pub fn suggested_status(&self) -> u16 {
        match self {
            Self::UnsupportedVisibility | Self::InvalidPasteId | Self::InvalidPasteIdLength => 400,
            Self::NotFound => 404,
            Self::TooLarge { .. } => 413,
            Self::Collision => 409,
            Self::ListingDisabled => 503,
            Self::Store(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_severity_matches_variant() {
        assert_eq!(
            StoreError::recoverable("boom").severity(),
            Severity::Error
        );
        assert_eq!(StoreError::warning("meh").severity(), Severity::Warning);
    }

    #[test]
    fn wrap_native_hides_driver_text() {
        let wrap = wrap_native::<String>("test", "Error while communicating with the backend");
        let err = wrap("constraint failed: secret_table.password".to_string());
        assert_eq!(
            err,
            StoreError::Recoverable("Error while communicating with the backend".to_string())
        );
        assert!(!err.to_string().contains("secret_table"));
    }

    #[test]
    fn too_large_message_embeds_limit() {
        let err = LogicError::TooLarge {
            limit: "10.0 MB".to_string(),
        };
        assert!(err.to_string().contains("10.0 MB"));
        assert_eq!(err.suggested_status(), 413);
    }

    #[test]
    fn listing_disabled_is_distinct_from_store_failure() {
        let disabled = LogicError::ListingDisabled;
        let unreachable = LogicError::from(StoreError::recoverable("down"));
        assert_ne!(disabled, unreachable);
        assert_eq!(disabled.suggested_status(), 503);
        assert_eq!(unreachable.suggested_status(), 500);
    }
}
