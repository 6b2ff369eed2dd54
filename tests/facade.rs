//! The root facade exposes the whole workflow without naming the core crate.

use hashpaste::backends::filesystem::FilesystemStore;
use hashpaste::{Outcome, PasteService, PasteStore, ServiceSettings};
use tempfile::TempDir;

#[test]
fn facade_drives_a_filesystem_store() {
    let temp_dir = TempDir::new().expect("temp dir");
    let store = FilesystemStore::new(temp_dir.path().join("pastes"));
    store.initialize_backend().expect("initialize");
    let service = PasteService::new(store, ServiceSettings::default());

    let id = service
        .create("through the facade", "public")
        .into_result()
        .expect("create");
    assert_eq!(
        service.raw(&id),
        Outcome::Ok("through the facade".to_string())
    );
    assert_eq!(service.list(), Outcome::Ok(vec![id]));
}
