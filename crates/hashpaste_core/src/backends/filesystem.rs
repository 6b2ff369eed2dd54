//! Paste storage on the local filesystem.
//!
//! Layout (kept stable for existing data directories):
//! `<root>/<id[0:2]>/<id[2:4]>/<id>` holds the content and
//! `<root>/<id[0:2]>/<id[2:4]>/<id>.<key>` holds one metadata value per file.

use crate::error::{StoreError, StoreResult};
use crate::filter::{finish_listing, matches};
use crate::store::{
    missing_metadata_value, require_metadata, validate_metadata_key, Metadata, PasteStore,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

const FILESYSTEM_ERROR: &str = "An issue occurred with the local filesystem. Please try again \
later. If the problem persists, try notifying a system administrator.";

fn fs_error(context: &'static str) -> impl Fn(io::Error) -> StoreError {
    crate::error::wrap_native(context, FILESYSTEM_ERROR)
}

/// Filesystem-backed [`PasteStore`].
pub struct FilesystemStore {
    root: PathBuf,
    #[cfg(test)]
    fail_after_metadata_delete: AtomicBool,
}

impl FilesystemStore {
    /// Create a store rooted at `root`. Nothing is touched until
    /// [`PasteStore::initialize_backend`] runs.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            #[cfg(test)]
            fail_after_metadata_delete: AtomicBool::new(false),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Make the next metadata update stop after deleting the old files.
    #[cfg(test)]
    pub(crate) fn fail_next_update_after_delete(&self) {
        self.fail_after_metadata_delete.store(true, Ordering::SeqCst);
    }

    #[cfg(test)]
    fn injected_failure(&self) -> StoreResult<()> {
        if self.fail_after_metadata_delete.swap(false, Ordering::SeqCst) {
            return Err(StoreError::recoverable(FILESYSTEM_ERROR));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn injected_failure(&self) -> StoreResult<()> {
        Ok(())
    }

    fn shard_dir(&self, paste_id: &str) -> Option<PathBuf> {
        let usable = paste_id.len() >= 4 && paste_id.bytes().all(|b| b.is_ascii_alphanumeric());
        usable.then(|| self.root.join(&paste_id[0..2]).join(&paste_id[2..4]))
    }

    fn require_shard_dir(&self, paste_id: &str) -> StoreResult<PathBuf> {
        self.shard_dir(paste_id).ok_or_else(|| {
            tracing::warn!(paste_id, "Rejected paste id unusable as a filesystem path");
            StoreError::recoverable(FILESYSTEM_ERROR)
        })
    }

    fn metadata_prefix(paste_id: &str) -> String {
        format!("{}.", paste_id)
    }

    /// Read every `<id>.<key>` file. A missing shard directory means no metadata.
    fn read_metadata(&self, dir: &Path, paste_id: &str) -> StoreResult<Metadata> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Metadata::new()),
            Err(err) => return Err(fs_error("read metadata dir")(err)),
        };

        let prefix = Self::metadata_prefix(paste_id);
        let mut metadata = Metadata::new();
        for entry in entries {
            let entry = entry.map_err(fs_error("read metadata entry"))?;
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(|name| name.strip_prefix(prefix.as_str()))
            else {
                continue;
            };
            match fs::read_to_string(entry.path()) {
                Ok(value) => {
                    metadata.insert(key.to_string(), value);
                }
                // Removed by a concurrent update between listing and reading.
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(fs_error("read metadata file")(err)),
            }
        }
        Ok(metadata)
    }

    fn remove_metadata_files(&self, dir: &Path, paste_id: &str) -> StoreResult<()> {
        let prefix = Self::metadata_prefix(paste_id);
        for entry in fs::read_dir(dir).map_err(fs_error("list metadata files"))? {
            let entry = entry.map_err(fs_error("list metadata files"))?;
            let is_metadata = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(prefix.as_str()));
            if !is_metadata {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(fs_error("remove metadata file")(err)),
            }
        }
        Ok(())
    }

    fn list_dir_names(dir: &Path) -> io::Result<Vec<(String, PathBuf)>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if !name.contains('.') {
                    names.push((name.to_string(), entry.path()));
                }
            }
        }
        Ok(names)
    }

    fn collect_paste_ids(&self) -> io::Result<Vec<(String, PathBuf)>> {
        let mut ids = Vec::new();
        for (_, level1) in Self::list_dir_names(&self.root)? {
            if !level1.is_dir() {
                continue;
            }
            for (_, level2) in Self::list_dir_names(&level1)? {
                if !level2.is_dir() {
                    continue;
                }
                for (name, path) in Self::list_dir_names(&level2)? {
                    if path.is_file() {
                        ids.push((name, level2.clone()));
                    }
                }
            }
        }
        Ok(ids)
    }
}

/// Write `data` to `target` through a temp file in the same directory so
/// readers never see a half-written file.
fn write_atomically(dir: &Path, target: &Path, data: &str) -> io::Result<()> {
    let mut temp = tempfile::Builder::new().prefix(".tmp").tempfile_in(dir)?;
    temp.write_all(data.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|err| err.error)?;
    Ok(())
}

impl PasteStore for FilesystemStore {
    fn initialize_backend(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.root).map_err(fs_error("create root"))?;
        tracing::info!(root = %self.root.display(), "Filesystem paste store ready");
        Ok(())
    }

    fn new_paste(&self, paste_id: &str, content: &str) -> StoreResult<()> {
        let dir = self.require_shard_dir(paste_id)?;
        fs::create_dir_all(&dir).map_err(fs_error("create shard dir"))?;
        write_atomically(&dir, &dir.join(paste_id), content).map_err(fs_error("write paste"))?;
        tracing::debug!(paste_id, "Stored paste content");
        Ok(())
    }

    fn update_paste_metadata(&self, paste_id: &str, metadata: &Metadata) -> StoreResult<()> {
        for key in metadata.keys() {
            validate_metadata_key(key)?;
        }
        let dir = self.require_shard_dir(paste_id)?;
        fs::create_dir_all(&dir).map_err(fs_error("create shard dir"))?;

        self.remove_metadata_files(&dir, paste_id)?;

        self.injected_failure()?;

        let prefix = Self::metadata_prefix(paste_id);
        for (key, value) in metadata {
            let target = dir.join(format!("{}{}", prefix, key));
            write_atomically(&dir, &target, value).map_err(fs_error("write metadata"))?;
        }
        tracing::debug!(paste_id, keys = metadata.len(), "Replaced paste metadata");
        Ok(())
    }

    fn does_paste_exist(&self, paste_id: &str) -> StoreResult<bool> {
        Ok(self
            .shard_dir(paste_id)
            .is_some_and(|dir| dir.join(paste_id).is_file()))
    }

    fn get_paste_contents(&self, paste_id: &str) -> StoreResult<String> {
        let dir = self.require_shard_dir(paste_id)?;
        fs::read_to_string(dir.join(paste_id)).map_err(fs_error("read paste"))
    }

    fn get_paste_metadata(&self, paste_id: &str) -> StoreResult<Metadata> {
        let dir = self.require_shard_dir(paste_id)?;
        require_metadata(self.read_metadata(&dir, paste_id)?)
    }

    fn get_paste_metadata_value(&self, paste_id: &str, key: &str) -> StoreResult<Option<String>> {
        validate_metadata_key(key)?;
        let dir = self.require_shard_dir(paste_id)?;
        let path = dir.join(format!("{}{}", Self::metadata_prefix(paste_id), key));
        match fs::read_to_string(path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let has_any = !self.read_metadata(&dir, paste_id)?.is_empty();
                missing_metadata_value(has_any)
            }
            Err(err) => Err(fs_error("read metadata value")(err)),
        }
    }

    fn get_all_paste_ids(
        &self,
        filters: &Metadata,
        fdefaults: &Metadata,
    ) -> StoreResult<Vec<String>> {
        let candidates = match self.collect_paste_ids() {
            Ok(candidates) => candidates,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(fs_error("walk paste tree")(err)),
        };

        let mut ids = Vec::with_capacity(candidates.len());
        for (paste_id, dir) in candidates {
            if filters.is_empty() || matches(&self.read_metadata(&dir, &paste_id)?, filters, fdefaults)
            {
                ids.push(paste_id);
            }
        }
        Ok(finish_listing(ids))
    }
}
