//! Node signing keypair
//!
//! Each node owns one long-lived ed25519 keypair. The public half is
//! published through the node-info endpoint; the private half only ever
//! touches disk sealed by [`SecretVault`].

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::config::SwarmConfig;
use crate::error::{SwarmError, SwarmResult};
use crate::identity::vault::SecretVault;
use crate::storage::Storage;

/// The node's signing identity
pub struct NodeKeypair {
    signing: SigningKey,
}

impl NodeKeypair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        // Use getrandom directly to avoid rand version conflicts with
        // ed25519_dalek's rand_core re-export
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed).expect("Failed to get random bytes");
        Self {
            signing: SigningKey::from_bytes(&seed),
        }
    }

    /// Reconstruct a keypair from its 32-byte seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    /// The 32-byte seed, for sealing at rest
    pub fn seed(&self) -> [u8; 32] {
        self.signing.to_bytes()
    }

    /// Hex-encoded public key as published to peers
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing.verifying_key().as_bytes())
    }

    /// Sign a 32-byte digest, returning the hex-encoded signature
    pub fn sign_digest(&self, digest: &[u8; 32]) -> String {
        hex::encode(self.signing.sign(digest).to_bytes())
    }

    /// Verify a hex signature over a digest against a hex public key.
    ///
    /// Malformed keys or signatures verify as `false`, never as an error.
    pub fn verify_digest(public_key_hex: &str, digest: &[u8; 32], signature_hex: &str) -> bool {
        let Ok(key_bytes) = hex::decode(public_key_hex) else {
            return false;
        };
        let Ok(key_bytes) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
            return false;
        };
        let Ok(verifying) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(sig_bytes) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&sig_bytes) else {
            return false;
        };
        verifying.verify(digest, &signature).is_ok()
    }
}

impl Clone for NodeKeypair {
    fn clone(&self) -> Self {
        Self {
            signing: SigningKey::from_bytes(&self.signing.to_bytes()),
        }
    }
}

impl std::fmt::Debug for NodeKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeKeypair")
            .field("public", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Persisted shape of the keypair: sealed seed plus plaintext public key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredKeypair {
    pub encrypted_seed: Vec<u8>,
    pub public_key: String,
}

/// Loads the node keypair from storage, generating and persisting one on
/// first use.
pub struct KeypairStore {
    storage: Storage,
}

impl KeypairStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Return the node keypair, generating it if none is stored yet.
    ///
    /// Idempotent: the write is a plain upsert, so two processes racing on
    /// first call may both generate; the later write wins and every
    /// subsequent call converges on it.
    pub fn load_or_generate(&self, config: &SwarmConfig) -> SwarmResult<NodeKeypair> {
        let secret = config.shared_secret.as_deref().ok_or_else(|| {
            SwarmError::Configuration("shared secret for key encryption is not set".to_string())
        })?;
        let vault = SecretVault::from_secret(secret)?;

        if let Some(stored) = self.storage.load_node_keypair()? {
            let seed = vault.open(&stored.encrypted_seed)?;
            let seed: [u8; 32] = seed
                .as_slice()
                .try_into()
                .map_err(|_| SwarmError::Identity("Stored seed has wrong length".to_string()))?;
            return Ok(NodeKeypair::from_seed(&seed));
        }

        let keypair = NodeKeypair::generate();
        let stored = StoredKeypair {
            encrypted_seed: vault.seal(&keypair.seed())?,
            public_key: keypair.public_key_hex(),
        };
        self.storage.save_node_keypair(&stored)?;
        Ok(keypair)
    }
}
