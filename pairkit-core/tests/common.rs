//! Common test utilities shared across integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pairkit_core::{CredentialStore, JsonFileStore, OsSecretGenerator, StoreConfig};
use tempfile::TempDir;

/// Setup code used by every test store.
pub const TEST_PIN: &str = "031-45-154";

/// A fresh directory and the store file path inside it.
pub fn temp_store() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("homekit.json");
    (dir, path)
}

/// Opens the file at `path` the way a server does on every start.
pub fn open_store(path: &Path) -> CredentialStore {
    let backend = Arc::new(JsonFileStore::open(path).expect("open backend"));
    CredentialStore::initialize(TEST_PIN, backend, &OsSecretGenerator).expect("initialize")
}

/// A store config pointing at `path` with the test PIN.
pub fn config_for(path: &Path) -> StoreConfig {
    StoreConfig {
        pin: TEST_PIN.to_string(),
        storage_path: path.to_path_buf(),
    }
}
