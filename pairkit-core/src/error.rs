//! Error types for the pairing credential store.

use thiserror::Error;

/// Result type for credential store operations.
pub type StoreResult<T> = Result<T, PairingStoreError>;

/// Errors raised by the credential store and its backends.
///
/// A missing pairing record is never an error: lookups return `None` and
/// removals of unknown users succeed.
#[derive(Debug, Error)]
pub enum PairingStoreError {
    /// A persisted identity field could not be used to bootstrap the store.
    #[error("initialization error: {field} is malformed: {reason}")]
    Initialization {
        /// Backend key of the offending field.
        field: String,
        /// Description of the problem.
        reason: String,
    },

    /// A persisted byte encoding (private key or user public key) is corrupt.
    #[error("decode error for '{key}': {reason}")]
    Decode {
        /// Backend key holding the corrupt value.
        key: String,
        /// Description of the decode failure.
        reason: String,
    },

    /// Errors coming from the key-value backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// An I/O operation in a file-backed backend failed.
    #[error("I/O error during {context}: {source}")]
    Io {
        /// Context describing the operation.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization failures.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl PairingStoreError {
    /// Creates an initialization error for `field`.
    pub fn initialization<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::Initialization {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a decode error for the value stored under `key`.
    pub fn decode<K: Into<String>, R: Into<String>>(key: K, reason: R) -> Self {
        Self::Decode {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend(message.into())
    }

    /// Creates an I/O error with context.
    pub fn io<S: Into<String>>(context: S, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
