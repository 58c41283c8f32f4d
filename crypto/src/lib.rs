//! Agora Cryptography
//!
//! Ed25519 key management, signing and verification, plus the hashing and
//! address-derivation helpers shared by the governance engine.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Prefix for derived account addresses.
pub const ADDRESS_PREFIX: &str = "AGORA1";

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid private key")]
    InvalidPrivateKey,
}

pub type Result<T> = std::result::Result<T, CryptoError>;

/// Key pair for signing governance messages
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate new random keypair
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create keypair from private key hex
    pub fn from_private_key_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str).map_err(|_| CryptoError::InvalidPrivateKey)?;

        let key_bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPrivateKey)?;

        let signing_key = SigningKey::from_bytes(&key_bytes);
        let verifying_key = signing_key.verifying_key();

        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Get public key as hex string
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key.as_bytes())
    }

    /// Get private key as hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Derived account address for this keypair
    pub fn address(&self) -> String {
        public_key_to_address(&self.public_key_hex())
    }

    /// Sign message
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

/// Verify a signature against a hex-encoded public key
pub fn verify(public_key_hex: &str, message: &[u8], signature_bytes: &[u8]) -> Result<()> {
    let pub_key_bytes = hex::decode(public_key_hex).map_err(|_| CryptoError::InvalidPublicKey)?;

    let pub_key_array: [u8; 32] = pub_key_bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidPublicKey)?;

    let verifying_key =
        VerifyingKey::from_bytes(&pub_key_array).map_err(|_| CryptoError::InvalidPublicKey)?;

    let sig_array: [u8; 64] = signature_bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidSignature)?;

    let signature = Signature::from_bytes(&sig_array);

    verifying_key
        .verify(message, &signature)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// Hash data with SHA256
pub fn hash_sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Hash data and return as hex string
pub fn hash_sha256_hex(data: &[u8]) -> String {
    hex::encode(hash_sha256(data))
}

/// Generate address from a hex-encoded public key.
///
/// Falls back to hashing the raw string when the key is shorter than the
/// address payload, so malformed keys still map to a stable address rather
/// than panicking.
pub fn public_key_to_address(public_key_hex: &str) -> String {
    if public_key_hex.len() >= 40 {
        format!("{}{}", ADDRESS_PREFIX, &public_key_hex[..40])
    } else {
        let digest = hash_sha256_hex(public_key_hex.as_bytes());
        format!("{}{}", ADDRESS_PREFIX, &digest[..40])
    }
}
