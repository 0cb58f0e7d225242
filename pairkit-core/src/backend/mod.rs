//! Key-value backends for the credential store.
//!
//! The store depends on a flat, string-keyed persistence service provided by
//! the host. Two implementations ship with the crate:
//!
//! - [`MemoryStore`] — process-local map, for tests and ephemeral servers
//! - [`JsonFileStore`] — a JSON object file rewritten atomically on each change,
//!   safe to share between processes

mod file;
mod lock;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::StoreResult;

/// Flat string-keyed persistence consumed by the credential store.
///
/// Keys are opaque strings with no implied structure. Implementations must
/// provide read-your-writes consistency within a single process.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))` if the key exists
    /// - `Ok(None)` if the key does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes `value` under `key`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn put(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// Returns `Ok(())` even if the key doesn't exist.
    /// Only returns an error for actual backend failures.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Returns an owned snapshot of every key currently stored.
    ///
    /// The returned list is detached from the backend, so callers may mutate
    /// the backend while walking it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be enumerated.
    fn keys(&self) -> StoreResult<Vec<String>>;

    /// Removes every key in `keys`, skipping ones that don't exist.
    ///
    /// The default removes them one at a time. Backends that pay per write
    /// should override it to apply the whole batch at once.
    ///
    /// # Errors
    ///
    /// Returns the first backend failure. Keys before the failing one may
    /// already be gone.
    fn remove_all(&self, keys: &[String]) -> StoreResult<()> {
        keys.iter().try_for_each(|key| self.remove(key))
    }

    /// Returns `true` if at least one stored key starts with `prefix`.
    ///
    /// The default walks a [`keys`](Self::keys) snapshot. Backends that can
    /// answer without copying every key should override it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be enumerated.
    fn any_key_with_prefix(&self, prefix: &str) -> StoreResult<bool> {
        Ok(self.keys()?.iter().any(|key| key.starts_with(prefix)))
    }
}
