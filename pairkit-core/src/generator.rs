//! Generators for the device's long-term identity material.

use ed25519_dalek::SigningKey;
use rand::{rngs::OsRng, RngCore};
use ruint::aliases::U256;

/// Length in bytes of a generated salt.
pub const SALT_LEN: usize = 16;

/// Length in bytes of an Ed25519 private key seed.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Source of fresh identity secrets used when the backend has none persisted.
pub trait SecretGenerator: Send + Sync {
    /// Returns a new device identifier.
    fn generate_device_id(&self) -> String;

    /// Returns a new non-negative salt.
    fn generate_salt(&self) -> U256;

    /// Returns the private half of a new long-term keypair.
    fn generate_private_key(&self) -> Vec<u8>;
}

/// [`SecretGenerator`] backed by the operating system RNG.
///
/// - device ids are six random bytes formatted `XX:XX:XX:XX:XX:XX`
/// - salts are 128 random bits
/// - private keys are Ed25519 seeds
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSecretGenerator;

impl SecretGenerator for OsSecretGenerator {
    fn generate_device_id(&self) -> String {
        let mut bytes = [0u8; 6];
        OsRng.fill_bytes(&mut bytes);
        bytes
            .iter()
            .map(|b| hex::encode_upper([*b]))
            .collect::<Vec<_>>()
            .join(":")
    }

    fn generate_salt(&self) -> U256 {
        let mut bytes = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut bytes);
        U256::from_be_slice(&bytes)
    }

    fn generate_private_key(&self) -> Vec<u8> {
        SigningKey::generate(&mut OsRng).to_bytes().to_vec()
    }
}

/// Derives the Ed25519 public key for a private key seed.
///
/// Returns `None` if `private_key` is not exactly [`PRIVATE_KEY_LEN`] bytes.
#[must_use]
pub fn derive_public_key(private_key: &[u8]) -> Option<[u8; 32]> {
    let seed: [u8; PRIVATE_KEY_LEN] = private_key.try_into().ok()?;
    Some(SigningKey::from_bytes(&seed).verifying_key().to_bytes())
}
