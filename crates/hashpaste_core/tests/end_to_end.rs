//! End-to-end scenarios through the public API, one per in-process backend.

use hashpaste_core::logic::paste_id_for;
use hashpaste_core::{
    open_store, BackendConfig, LogicError, Metadata, Outcome, PasteService, PasteStore,
    ServiceSettings, Severity,
};
use std::time::Duration;
use tempfile::TempDir;

const HELLO_WORLD_ID: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

fn in_process_backends(temp_dir: &TempDir) -> Vec<BackendConfig> {
    vec![
        BackendConfig::Filesystem {
            root: temp_dir.path().join("pastes"),
        },
        BackendConfig::Sqlite {
            path: temp_dir.path().join("pastes.sqlite3"),
            timeout: Duration::from_secs(5),
        },
        BackendConfig::Kv {
            path: temp_dir.path().join("pastes.redb"),
        },
        BackendConfig::Memory,
    ]
}

fn open_service(config: &BackendConfig) -> PasteService<Box<dyn PasteStore>> {
    let store = open_store(config).expect("open store");
    store.initialize_backend().expect("initialize");
    PasteService::new(store, ServiceSettings::default())
}

#[test]
fn hello_world_lifecycle_on_every_backend() {
    let temp_dir = TempDir::new().expect("temp dir");
    for config in in_process_backends(&temp_dir) {
        let service = open_service(&config);
        let backend = config.name();

        assert!(
            !service.store().does_paste_exist(HELLO_WORLD_ID).expect("exists"),
            "{}",
            backend
        );
        assert_eq!(
            service.create("hello world", "public"),
            Outcome::Ok(HELLO_WORLD_ID.to_string()),
            "{}",
            backend
        );
        assert!(service.store().does_paste_exist(HELLO_WORLD_ID).expect("exists"));
        assert_eq!(
            service.store().get_paste_contents(HELLO_WORLD_ID).expect("contents"),
            "hello world"
        );

        let view = service.view(HELLO_WORLD_ID);
        assert_eq!(view.severity(), Severity::Info, "{}", backend);
        let view = view.into_result().expect("view");
        assert_eq!(view.content, "hello world");
        assert!(view.date.is_some(), "{}", backend);
    }
}

#[test]
fn listing_shows_only_public_on_every_backend() {
    let temp_dir = TempDir::new().expect("temp dir");
    for config in in_process_backends(&temp_dir) {
        let service = open_service(&config);
        let backend = config.name();
        assert_eq!(
            service.list(),
            Outcome::Ok(vec!["none".to_string()]),
            "{}",
            backend
        );

        let public = service.create("public paste", "public").into_result().expect("public");
        let unlisted = service
            .create("unlisted paste", "unlisted")
            .into_result()
            .expect("unlisted");
        assert_ne!(public, unlisted);
        assert_eq!(service.list(), Outcome::Ok(vec![public]), "{}", backend);
    }
}

#[test]
fn metadata_replace_is_exact_on_every_backend() {
    let temp_dir = TempDir::new().expect("temp dir");
    for config in in_process_backends(&temp_dir) {
        let store = open_store(&config).expect("open");
        store.initialize_backend().expect("initialize");
        let paste_id = paste_id_for("replace me");
        store.new_paste(&paste_id, "replace me").expect("new");

        let first: Metadata = [("date", "1"), ("visibility", "public"), ("extra", "x")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let second: Metadata = [("visibility", "unlisted")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        store.update_paste_metadata(&paste_id, &first).expect("first");
        store.update_paste_metadata(&paste_id, &second).expect("second");
        assert_eq!(
            store.get_paste_metadata(&paste_id).expect("metadata"),
            second,
            "{}",
            config.name()
        );
    }
}

#[test]
fn data_outlives_the_store_handle() {
    let temp_dir = TempDir::new().expect("temp dir");
    for config in in_process_backends(&temp_dir) {
        if config == BackendConfig::Memory {
            continue;
        }
        let id = open_service(&config)
            .create("durable", "unlisted")
            .into_result()
            .expect("create");
        let reopened = open_service(&config);
        assert_eq!(
            reopened.raw(&id),
            Outcome::Ok("durable".to_string()),
            "{}",
            config.name()
        );
    }
}

#[test]
fn orchestration_errors_map_to_statuses() {
    let service = open_service(&BackendConfig::Memory);
    let invalid = service.view("../etc").into_result().expect_err("invalid");
    assert_eq!(invalid, LogicError::InvalidPasteId);
    assert_eq!(invalid.suggested_status(), 400);

    let missing = service.raw(HELLO_WORLD_ID).into_result().expect_err("missing");
    assert_eq!(missing.suggested_status(), 404);
}
