//! Credential store: identity bootstrap and pairing records.
//!
//! All state lives in an injected [`KeyValueStore`]. Three singleton keys hold
//! the device identity; every other key the store writes carries the
//! [`USER_KEY_PREFIX`] so pairing records can never collide with them.
//!
//! | key            | value                                  |
//! |----------------|----------------------------------------|
//! | `device_id`    | device identifier, verbatim            |
//! | `salt`         | canonical decimal integer              |
//! | `private_key`  | base64 (standard, padded)              |
//! | `user_<name>`  | base64 of the client's public key      |

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ruint::aliases::U256;
use strum::{Display, IntoStaticStr};
use zeroize::Zeroizing;

use crate::backend::{JsonFileStore, KeyValueStore};
use crate::config::StoreConfig;
use crate::generator::{derive_public_key, OsSecretGenerator, SecretGenerator, PRIVATE_KEY_LEN};
use crate::{AuthInfo, PairingStoreError, StoreResult};

/// Prefix reserved for pairing-record keys.
pub const USER_KEY_PREFIX: &str = "user_";

/// Singleton identity fields and their backend keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum IdentityField {
    /// Device identifier advertised to clients.
    DeviceId,
    /// Pair-setup salt.
    Salt,
    /// Long-term private key.
    PrivateKey,
}

impl IdentityField {
    /// Returns the backend key this field is stored under.
    #[must_use]
    pub fn key(self) -> &'static str {
        self.into()
    }
}

/// Durable store of the device identity and client pairing records.
///
/// Construction bootstraps any missing identity field; afterwards the store
/// only caches the identity and the PIN and holds no locks of its own.
/// Concurrent writers get whatever per-key guarantees the backend provides.
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
    pin: String,
    device_id: String,
    salt: U256,
    private_key: Zeroizing<String>,
}

impl CredentialStore {
    /// Loads the identity from `backend`, generating and persisting whatever is
    /// missing.
    ///
    /// Fields already present are never regenerated. A salt that is present but
    /// not a non-negative decimal integer of at most 256 bits fails the whole
    /// construction before anything is written.
    ///
    /// # Errors
    ///
    /// Returns [`PairingStoreError::Initialization`] for a malformed salt, or
    /// the backend's error if a read or write fails.
    pub fn initialize<S: Into<String>>(
        pin: S,
        backend: Arc<dyn KeyValueStore>,
        generator: &dyn SecretGenerator,
    ) -> StoreResult<Self> {
        let device_id = backend.get(IdentityField::DeviceId.key())?;
        let salt = backend
            .get(IdentityField::Salt.key())?
            .map(|value| parse_salt(&value))
            .transpose()?;
        let private_key = backend.get(IdentityField::PrivateKey.key())?;

        let device_id = if let Some(device_id) = device_id {
            device_id
        } else {
            let device_id = generator.generate_device_id();
            log::warn!(
                "no device id found in the credential store, generated {device_id}; \
                 previously paired clients must pair again"
            );
            backend.put(IdentityField::DeviceId.key(), &device_id)?;
            device_id
        };

        let salt = if let Some(salt) = salt {
            salt
        } else {
            let salt = generator.generate_salt();
            log::info!("no salt found in the credential store, generated a new one");
            backend.put(IdentityField::Salt.key(), &salt.to_string())?;
            salt
        };

        let private_key = if let Some(private_key) = private_key {
            Zeroizing::new(private_key)
        } else {
            let key_bytes = Zeroizing::new(generator.generate_private_key());
            let encoded = Zeroizing::new(STANDARD.encode(key_bytes.as_slice()));
            log::info!("no private key found in the credential store, generated a new one");
            backend.put(IdentityField::PrivateKey.key(), &encoded)?;
            encoded
        };

        log::debug!("credential store ready for device {device_id}");
        Ok(Self {
            backend,
            pin: pin.into(),
            device_id,
            salt,
            private_key,
        })
    }

    /// Opens the JSON file named by `config` and bootstraps it with OS
    /// randomness.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or bootstrap fails.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let backend = Arc::new(JsonFileStore::open(&config.storage_path)?);
        Self::initialize(config.pin.clone(), backend, &OsSecretGenerator)
    }

    /// Returns the backend this store writes to.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// Returns the Ed25519 public key matching the stored private key.
    ///
    /// # Errors
    ///
    /// Returns [`PairingStoreError::Decode`] if the private key is not valid
    /// base64 or is not a 32-byte seed.
    pub fn public_key(&self) -> StoreResult<[u8; 32]> {
        let private_key = Zeroizing::new(self.private_key()?);
        derive_public_key(&private_key).ok_or_else(|| {
            PairingStoreError::decode(
                IdentityField::PrivateKey.key(),
                format!(
                    "expected a {PRIVATE_KEY_LEN}-byte Ed25519 seed, got {} bytes",
                    private_key.len()
                ),
            )
        })
    }

    /// Returns the usernames of all pairing records, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend keys cannot be listed.
    pub fn list_users(&self) -> StoreResult<Vec<String>> {
        let mut users: Vec<String> = self
            .backend
            .keys()?
            .into_iter()
            .filter_map(|key| key.strip_prefix(USER_KEY_PREFIX).map(str::to_string))
            .collect();
        users.sort_unstable();
        Ok(users)
    }

    /// Removes every pairing record, leaving the identity untouched.
    ///
    /// Returns the number of records removed. A record created concurrently
    /// with this call may or may not survive it.
    ///
    /// # Errors
    ///
    /// Returns an error if the keys cannot be listed or a removal fails.
    pub fn clear(&self) -> StoreResult<usize> {
        // Owned copy of the key set; removals below must not walk a live view.
        let snapshot: Vec<String> = self
            .backend
            .keys()?
            .into_iter()
            .filter(|key| is_user_key(key))
            .collect();
        self.backend.remove_all(&snapshot)?;
        let removed = snapshot.len();
        log::info!("cleared {removed} pairing record(s)");
        Ok(removed)
    }
}

impl AuthInfo for CredentialStore {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn pin(&self) -> &str {
        &self.pin
    }

    fn private_key(&self) -> StoreResult<Vec<u8>> {
        STANDARD
            .decode(self.private_key.as_bytes())
            .map_err(|err| {
                PairingStoreError::decode(IdentityField::PrivateKey.key(), err.to_string())
            })
    }

    fn salt(&self) -> U256 {
        self.salt
    }

    fn create_user(&self, username: &str, public_key: &[u8]) -> StoreResult<()> {
        self.backend
            .put(&user_key(username), &STANDARD.encode(public_key))?;
        log::debug!("stored pairing for {username}");
        Ok(())
    }

    fn user_public_key(&self, username: &str) -> StoreResult<Option<Vec<u8>>> {
        let key = user_key(username);
        self.backend
            .get(&key)?
            .map(|encoded| {
                STANDARD
                    .decode(encoded.as_bytes())
                    .map_err(|err| PairingStoreError::decode(&key, err.to_string()))
            })
            .transpose()
    }

    fn remove_user(&self, username: &str) -> StoreResult<()> {
        self.backend.remove(&user_key(username))?;
        log::debug!("removed pairing for {username}");
        Ok(())
    }

    fn has_user(&self) -> StoreResult<bool> {
        self.backend.any_key_with_prefix(USER_KEY_PREFIX)
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("device_id", &self.device_id)
            .field("salt", &self.salt)
            .field("pin", &"<redacted>")
            .field("private_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

fn user_key(username: &str) -> String {
    format!("{USER_KEY_PREFIX}{username}")
}

fn is_user_key(key: &str) -> bool {
    key.starts_with(USER_KEY_PREFIX)
}

fn parse_salt(value: &str) -> StoreResult<U256> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PairingStoreError::initialization(
            IdentityField::Salt.key(),
            format!("{value:?} is not a non-negative decimal integer"),
        ));
    }
    U256::from_str_radix(value, 10).map_err(|_| {
        PairingStoreError::initialization(IdentityField::Salt.key(), "value exceeds 256 bits")
    })
}
