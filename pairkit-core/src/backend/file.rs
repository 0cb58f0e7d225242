//! JSON-file key-value backend.
//!
//! The file is the only copy of the data. Reads load it fresh, so several
//! handles (a running server and the `pairkit` CLI, say) always see each
//! other's changes. Every mutation takes an exclusive lock on a `<file>.lock`
//! sidecar, re-reads the file, applies the change and writes the result back
//! using the write-to-temp-then-rename pattern. The file on disk is therefore
//! always either the complete old content or the complete new content, and no
//! writer overwrites a change it has not seen.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::lock::FileLockGuard;
use super::KeyValueStore;
use crate::{PairingStoreError, StoreResult};

type Entries = BTreeMap<String, String>;

/// [`KeyValueStore`] persisted as a single JSON object of string values.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileStore {
    /// Opens the store at `path`, checking that an existing file is readable.
    ///
    /// A missing file is treated as an empty store; it is created on the first
    /// write.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a JSON
    /// object of strings.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let lock_path = sibling(&path, ".lock");
        let store = Self { path, lock_path };
        let entries = store.load()?;
        log::debug!(
            "opened key-value file {} ({} entries)",
            store.path.display(),
            entries.len()
        );
        Ok(store)
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoreResult<Entries> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
                PairingStoreError::Serialization(format!(
                    "parsing {}: {err}",
                    self.path.display()
                ))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(err) => Err(PairingStoreError::io(
                format!("reading {}", self.path.display()),
                err,
            )),
        }
    }

    fn persist(&self, entries: &Entries) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|err| PairingStoreError::Serialization(err.to_string()))?;

        let tmp_path = sibling(&self.path, ".tmp");

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                PairingStoreError::io(format!("creating {}", parent.display()), err)
            })?;
        }

        let mut file = fs::File::create(&tmp_path).map_err(|err| {
            PairingStoreError::io(format!("creating {}", tmp_path.display()), err)
        })?;
        file.write_all(&bytes)
            .and_then(|()| file.sync_all())
            .map_err(|err| PairingStoreError::io(format!("writing {}", tmp_path.display()), err))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(|err| {
            PairingStoreError::io(format!("renaming into {}", self.path.display()), err)
        })
    }

    /// Runs `apply` against the current file content under the write lock and
    /// persists the result if `apply` reports a change. A failed write leaves
    /// the file as it was.
    fn update(&self, apply: impl FnOnce(&mut Entries) -> bool) -> StoreResult<()> {
        let _guard = FileLockGuard::acquire(&self.lock_path)?;
        let mut entries = self.load()?;
        if apply(&mut entries) {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.update(|entries| entries.remove(key).is_some())
    }

    fn remove_all(&self, keys: &[String]) -> StoreResult<()> {
        self.update(|entries| {
            keys.iter()
                .fold(false, |changed, key| entries.remove(key).is_some() || changed)
        })
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.load()?.into_keys().collect())
    }

    fn any_key_with_prefix(&self, prefix: &str) -> StoreResult<bool> {
        // keys are sorted, so the first key at or after `prefix` decides
        Ok(self
            .load()?
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .next()
            .is_some_and(|(key, _)| key.starts_with(prefix)))
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
