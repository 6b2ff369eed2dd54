//! Orchestration between callers and a [`PasteStore`]: input validation,
//! content addressing, size limits, and outcome severities.

use crate::config::Config;
use crate::constants::{
    DATE_KEY, DEFAULT_MAX_PASTE_SIZE, DEFAULT_VISIBILITIES, PASTE_ID_LENGTH, PUBLIC_VISIBILITY,
    VISIBILITY_KEY,
};
use crate::error::{LogicError, Severity, StoreError};
use crate::filter::metadata_from;
use crate::store::{Metadata, PasteStore};
use serde::Serialize;
use sha2::{Digest, Sha256};

const SIZE_SCALES: [&str; 6] = ["bytes", "kB", "MB", "GB", "TB", "PB"];

/// Note attached when a create finds the identical paste already stored.
pub const ALREADY_STORED_NOTE: &str = "This paste already exists.";

/// Tagged result handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Ok(T),
    /// Success with a note the caller may display.
    Info { value: T, note: String },
    /// The primary action succeeded; something auxiliary did not.
    Warning { value: T, message: String },
    Error(LogicError),
}

impl<T> Outcome<T> {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Ok(_) | Self::Info { .. } => Severity::Info,
            Self::Warning { .. } => Severity::Warning,
            Self::Error(_) => Severity::Error,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ok(value) | Self::Info { value, .. } | Self::Warning { value, .. } => Some(value),
            Self::Error(_) => None,
        }
    }

    /// Note, warning, or error text, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Ok(_) => None,
            Self::Info { note, .. } => Some(note.clone()),
            Self::Warning { message, .. } => Some(message.clone()),
            Self::Error(err) => Some(err.to_string()),
        }
    }

    fn from_result(result: Result<T, LogicError>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(err) => Self::Error(err),
        }
    }

    /// Drop notes and warnings, keeping only success or failure.
    pub fn into_result(self) -> Result<T, LogicError> {
        match self {
            Self::Ok(value) | Self::Info { value, .. } | Self::Warning { value, .. } => Ok(value),
            Self::Error(err) => Err(err),
        }
    }
}

impl<T> From<LogicError> for Outcome<T> {
    fn from(err: LogicError) -> Self {
        Self::Error(err)
    }
}

impl<T> From<StoreError> for Outcome<T> {
    fn from(err: StoreError) -> Self {
        Self::Error(LogicError::Store(err))
    }
}

/// Early-return the error arm of a `Result` as an [`Outcome::Error`].
macro_rules! try_outcome {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => return Outcome::from(err),
        }
    };
}

/// A paste prepared for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasteView {
    pub id: String,
    pub content: String,
    /// Creation time in unix seconds; `None` when metadata is unavailable.
    pub date: Option<String>,
    /// Human readable content size, see [`format_size`].
    pub size: String,
}

/// Content-derived paste id: lowercase hex SHA-256 of the UTF-8 bytes.
pub fn paste_id_for(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Format a byte count with 1024-based units and one decimal.
///
/// ```
/// use hashpaste_core::logic::format_size;
/// assert_eq!(format_size(1024), "1.0 kB");
/// ```
pub fn format_size(size: u64) -> String {
    let mut scaled = size as f64;
    let mut scale = 0;
    while scaled >= 1024.0 && scale < SIZE_SCALES.len() - 1 {
        scaled /= 1024.0;
        scale += 1;
    }
    format!("{:.1} {}", scaled, SIZE_SCALES[scale])
}

/// Check the shape of a caller-supplied paste id before touching the store.
///
/// # Errors
/// [`LogicError::InvalidPasteId`] for non-alphanumeric ids,
/// [`LogicError::InvalidPasteIdLength`] for ids that are not 64 characters.
pub fn validate_paste_id(paste_id: &str) -> Result<(), LogicError> {
    if paste_id.is_empty() || !paste_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(LogicError::InvalidPasteId);
    }
    if paste_id.len() != PASTE_ID_LENGTH {
        return Err(LogicError::InvalidPasteIdLength);
    }
    Ok(())
}

/// Limits and switches applied by [`PasteService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub max_paste_size: usize,
    pub enabled_visibilities: Vec<String>,
    pub paste_list_active: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            max_paste_size: DEFAULT_MAX_PASTE_SIZE,
            enabled_visibilities: DEFAULT_VISIBILITIES.iter().map(|v| v.to_string()).collect(),
            paste_list_active: true,
        }
    }
}

impl From<&Config> for ServiceSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_paste_size: config.max_paste_size,
            enabled_visibilities: config.enabled_visibilities.clone(),
            paste_list_active: config.paste_list_active,
        }
    }
}

/// Paste operations over an explicitly owned store handle.
pub struct PasteService<S: ?Sized> {
    settings: ServiceSettings,
    store: S,
}

impl<S: PasteStore> PasteService<S> {
    pub fn new(store: S, settings: ServiceSettings) -> Self {
        Self { settings, store }
    }
}

impl<S: PasteStore + ?Sized> PasteService<S> {
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Store `content` with the given visibility and return its id.
    ///
    /// Re-creating identical content is an [`Outcome::Info`] that leaves the
    /// stored metadata alone, unless that metadata is missing, in which case
    /// it is written again. The note says so when the requested visibility
    /// differs from the one kept. Different content under an existing id is a
    /// [`LogicError::Collision`] and nothing is written.
    pub fn create(&self, content: &str, visibility: &str) -> Outcome<String> {
        if !self
            .settings
            .enabled_visibilities
            .iter()
            .any(|enabled| enabled == visibility)
        {
            return Outcome::Error(LogicError::UnsupportedVisibility);
        }

        let paste_id = paste_id_for(content);
        if content.len() > self.settings.max_paste_size {
            return Outcome::Error(LogicError::TooLarge {
                limit: format_size(self.settings.max_paste_size as u64),
            });
        }

        if try_outcome!(self.store.does_paste_exist(&paste_id)) {
            let stored = try_outcome!(self.store.get_paste_contents(&paste_id));
            if stored != content {
                tracing::error!(paste_id = %paste_id, "Different content stored under paste id");
                return Outcome::Error(LogicError::Collision);
            }
            match self.store.get_paste_metadata(&paste_id) {
                Ok(stored_metadata) => {
                    let note = match stored_metadata.get(VISIBILITY_KEY) {
                        Some(kept) if kept != visibility => format!(
                            "{} Its visibility was left as {}.",
                            ALREADY_STORED_NOTE, kept
                        ),
                        _ => ALREADY_STORED_NOTE.to_string(),
                    };
                    return Outcome::Info {
                        value: paste_id,
                        note,
                    };
                }
                Err(StoreError::Warning(_)) => {
                    tracing::warn!(paste_id = %paste_id, "Rewriting missing metadata");
                }
                Err(err) => return Outcome::from(err),
            }
        } else {
            try_outcome!(self.store.new_paste(&paste_id, content));
        }

        let date = chrono::Utc::now().timestamp().to_string();
        let metadata = metadata_from([(DATE_KEY, date.as_str()), (VISIBILITY_KEY, visibility)]);
        try_outcome!(self.store.update_paste_metadata(&paste_id, &metadata));
        tracing::debug!(paste_id = %paste_id, bytes = content.len(), "Created paste");
        Outcome::Ok(paste_id)
    }

    /// Load a paste for display.
    ///
    /// A missing creation date is a [`Outcome::Warning`]; the content is
    /// still returned.
    pub fn view(&self, paste_id: &str) -> Outcome<PasteView> {
        let content = try_outcome!(self.load_content(paste_id));
        let mut view = PasteView {
            id: paste_id.to_string(),
            size: format_size(content.len() as u64),
            content,
            date: None,
        };
        match self.store.get_paste_metadata_value(paste_id, DATE_KEY) {
            Ok(date) => {
                view.date = date;
                Outcome::Ok(view)
            }
            Err(StoreError::Warning(message)) => Outcome::Warning {
                value: view,
                message,
            },
            Err(err) => Outcome::from(err),
        }
    }

    /// Content only, for plain-text delivery.
    pub fn raw(&self, paste_id: &str) -> Outcome<String> {
        Outcome::from_result(self.load_content(paste_id))
    }

    /// Ids of public pastes, or `["none"]`.
    ///
    /// Pastes without a visibility key count as public.
    pub fn list(&self) -> Outcome<Vec<String>> {
        if !self.settings.paste_list_active {
            return Outcome::Error(LogicError::ListingDisabled);
        }
        let public = metadata_from([(VISIBILITY_KEY, PUBLIC_VISIBILITY)]);
        let ids = try_outcome!(self.store.get_all_paste_ids(&public, &public));
        Outcome::Ok(ids)
    }

    /// Every stored metadata entry of a paste.
    ///
    /// Missing metadata is a [`Outcome::Warning`] carrying an empty map.
    pub fn metadata(&self, paste_id: &str) -> Outcome<Metadata> {
        try_outcome!(self.require_existing(paste_id));
        match self.store.get_paste_metadata(paste_id) {
            Ok(metadata) => Outcome::Ok(metadata),
            Err(StoreError::Warning(message)) => Outcome::Warning {
                value: Metadata::new(),
                message,
            },
            Err(err) => Outcome::from(err),
        }
    }

    fn require_existing(&self, paste_id: &str) -> Result<(), LogicError> {
        validate_paste_id(paste_id)?;
        if !self.store.does_paste_exist(paste_id)? {
            return Err(LogicError::NotFound);
        }
        Ok(())
    }

    fn load_content(&self, paste_id: &str) -> Result<String, LogicError> {
        self.require_existing(paste_id)?;
        Ok(self.store.get_paste_contents(paste_id)?)
    }
}
