//! Ed25519 signer key material.

use ed25519_dalek::Signer as _;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::address::{Address, Signature};
use crate::error::SolError;

/// A wallet key pair. The private half never leaves this type except through
/// [`Keypair::to_bytes`].
pub struct Keypair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Keypair {
    /// Generate a fresh key pair from the OS random source.
    pub fn generate() -> Self {
        Keypair {
            signing_key: ed25519_dalek::SigningKey::generate(&mut OsRng),
        }
    }

    /// Build a key pair from a 32-byte Ed25519 seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut seed = *seed;
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
        seed.zeroize();
        Keypair { signing_key }
    }

    /// Parse the 64-byte `secret || public` layout used by key files.
    ///
    /// The public half must match the one derived from the secret.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SolError> {
        if bytes.len() != 64 {
            return Err(SolError::InvalidPrivateKey(format!(
                "expected 64 bytes, got {}",
                bytes.len()
            )));
        }

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);
        let keypair = Keypair::from_seed(&seed);
        seed.zeroize();

        if keypair.pubkey().as_ref() != &bytes[32..] {
            return Err(SolError::InvalidPrivateKey(
                "public key does not match secret key".into(),
            ));
        }

        Ok(keypair)
    }

    /// The 64-byte `secret || public` layout. Callers own zeroising it.
    pub fn to_bytes(&self) -> [u8; 64] {
        self.signing_key.to_keypair_bytes()
    }

    pub fn pubkey(&self) -> Address {
        Address(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}
