//! secp256k1 signing identity derived from the configured signing secret.

use std::sync::Arc;

use async_trait::async_trait;
use hkdf::Hkdf;
use k256::ecdsa::signature::Signer as _;
use k256::ecdsa::{Signature, SigningKey};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::chain::{KeyDerivation, Signer};
use crate::error::ChainError;

const KEY_DERIVATION_SALT: &[u8] = b"polkagent/signing-key/v1";
const KEY_DERIVATION_INFO: &[u8] = b"secp256k1";

/// ECDSA signer whose address is the blake3 digest of its compressed
/// public key.
pub struct EcdsaSigner {
    key: SigningKey,
    address: String,
}

impl EcdsaSigner {
    pub fn from_signing_key(key: SigningKey) -> Self {
        let public = key.verifying_key().to_sec1_bytes();
        let address = format!("0x{}", blake3::hash(&public).to_hex());
        Self { key, address }
    }
}

impl std::fmt::Debug for EcdsaSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcdsaSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Signer for EcdsaSigner {
    fn address(&self) -> &str {
        &self.address
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, ChainError> {
        let signature: Signature = self
            .key
            .try_sign(payload)
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }
}

/// Deterministic HKDF-SHA256 derivation of a secp256k1 key from a secret
/// phrase or seed.
#[derive(Debug, Default)]
pub struct EcdsaKeyDerivation;

impl EcdsaKeyDerivation {
    pub fn new() -> Self {
        Self
    }

    fn derive_key(secret: &str) -> Result<SigningKey, ChainError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(ChainError::KeyDerivation(
                "signing secret cannot be empty".to_string(),
            ));
        }

        let hk = Hkdf::<Sha256>::new(Some(KEY_DERIVATION_SALT), secret.as_bytes());
        let mut okm = [0u8; 32];
        hk.expand(KEY_DERIVATION_INFO, &mut okm)
            .map_err(|e| ChainError::KeyDerivation(e.to_string()))?;

        SigningKey::from_slice(&okm).map_err(|e| ChainError::KeyDerivation(e.to_string()))
    }
}

#[async_trait]
impl KeyDerivation for EcdsaKeyDerivation {
    async fn derive(&self, secret: &SecretString) -> Result<Arc<dyn Signer>, ChainError> {
        let key = Self::derive_key(secret.expose_secret())?;
        let signer = EcdsaSigner::from_signing_key(key);
        tracing::debug!("Derived signing identity {}", signer.address());
        Ok(Arc::new(signer))
    }
}
