//! Store configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{PairingStoreError, StoreResult};

/// Setup code used when none is configured.
pub const DEFAULT_PIN: &str = "031-45-154";

/// Configuration for a file-backed credential store.
///
/// The PIN is never written to the key-value backend; it must be supplied from
/// configuration on every start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Setup code clients enter when pairing for the first time.
    #[serde(default = "default_pin")]
    pub pin: String,
    /// Location of the JSON key-value file.
    pub storage_path: PathBuf,
}

fn default_pin() -> String {
    DEFAULT_PIN.to_string()
}

impl StoreConfig {
    /// Creates a configuration with the default PIN.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(storage_path: P) -> Self {
        Self {
            pin: default_pin(),
            storage_path: storage_path.into(),
        }
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|err| PairingStoreError::io(format!("reading {}", path.display()), err))?;
        serde_json::from_slice(&bytes).map_err(|err| {
            PairingStoreError::Serialization(format!("parsing {}: {err}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_defaults_when_missing() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"storage_path": "/var/lib/pairkit/store.json"}"#).unwrap();
        assert_eq!(config.pin, DEFAULT_PIN);
        assert_eq!(config, StoreConfig::new("/var/lib/pairkit/store.json"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairkit.json");
        std::fs::write(
            &path,
            r#"{"pin": "111-22-333", "storage_path": "store.json"}"#,
        )
        .unwrap();

        let config = StoreConfig::from_file(&path).unwrap();
        assert_eq!(config.pin, "111-22-333");
        assert_eq!(config.storage_path, PathBuf::from("store.json"));

        match StoreConfig::from_file(dir.path().join("missing.json")) {
            Err(PairingStoreError::Io { .. }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
