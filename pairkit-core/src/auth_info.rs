//! The authentication callback surface consumed by a pairing server.

use ruint::aliases::U256;

use crate::StoreResult;

/// Long-term identity and pairing records a pairing server needs to
/// authenticate clients.
///
/// A server is in first-use mode, accepting pair-setup with the PIN, exactly
/// when [`has_user`](AuthInfo::has_user) returns `false`.
pub trait AuthInfo: Send + Sync {
    /// Returns the device identifier advertised to clients.
    fn device_id(&self) -> &str;

    /// Returns the setup code clients enter during first pairing.
    fn pin(&self) -> &str;

    /// Returns the device's long-term private key.
    ///
    /// # Errors
    ///
    /// Returns [`PairingStoreError::Decode`](crate::PairingStoreError::Decode)
    /// if the persisted encoding is corrupt.
    fn private_key(&self) -> StoreResult<Vec<u8>>;

    /// Returns the salt used during pair-setup.
    fn salt(&self) -> U256;

    /// Records `public_key` for `username`, replacing any existing record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    fn create_user(&self, username: &str, public_key: &[u8]) -> StoreResult<()>;

    /// Looks up the public key paired under `username`.
    ///
    /// An unknown username is `Ok(None)`, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails or the stored value is not
    /// valid base64.
    fn user_public_key(&self, username: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Deletes the pairing record for `username`. Unknown usernames are a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend removal fails.
    fn remove_user(&self, username: &str) -> StoreResult<()>;

    /// Returns `true` if at least one pairing record exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend keys cannot be listed.
    fn has_user(&self) -> StoreResult<bool>;
}
