//! `pairkit-core` persists the credentials a HomeKit-style pairing server needs.
//!
//! The [`CredentialStore`] bootstraps the device identity (device id, salt,
//! long-term private key) on first start and keeps one pairing record per
//! client username. It implements [`AuthInfo`], the callback surface the
//! pairing server consumes, on top of any [`KeyValueStore`].
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use pairkit_core::{AuthInfo, CredentialStore, MemoryStore, OsSecretGenerator};
//!
//! # fn main() -> Result<(), pairkit_core::PairingStoreError> {
//! let store = CredentialStore::initialize(
//!     "031-45-154",
//!     Arc::new(MemoryStore::new()),
//!     &OsSecretGenerator,
//! )?;
//! assert!(!store.has_user()?);
//!
//! store.create_user("alice", &[0x42; 32])?;
//! assert_eq!(store.user_public_key("alice")?, Some(vec![0x42; 32]));
//! # Ok(())
//! # }
//! ```
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod auth_info;
pub use auth_info::AuthInfo;

/// Key-value backends the store persists into.
pub mod backend;
pub use backend::{JsonFileStore, KeyValueStore, MemoryStore};

mod config;
pub use config::{StoreConfig, DEFAULT_PIN};

mod error;
pub use error::{PairingStoreError, StoreResult};

/// Secret generation for identity bootstrap.
pub mod generator;
pub use generator::{OsSecretGenerator, SecretGenerator};

/// Bridge from the `log` facade to a host-provided logger.
pub mod logger;

mod store;
pub use store::{CredentialStore, IdentityField, USER_KEY_PREFIX};

pub use ruint::aliases::U256;
