//! At-rest protection for the node's private key
//!
//! The signing seed is sealed with ChaCha20-Poly1305 under a key derived
//! from the process-wide shared secret via scrypt with a fixed salt. The
//! sealed format is `[nonce (12 bytes)] + [ciphertext + tag]`.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use scrypt::{scrypt, Params};

use crate::error::{SwarmError, SwarmResult};

/// Nonce size for ChaCha20-Poly1305 (12 bytes)
const NONCE_SIZE: usize = 12;

/// Fixed salt for the key-encryption KDF. The shared secret is the only
/// input that must stay private; the salt just domain-separates this use.
const KDF_SALT: &[u8] = b"waggle-node-key-v1";

// scrypt cost parameters: N = 2^15, r = 8, p = 1
const SCRYPT_LOG_N: u8 = 15;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Symmetric cipher bound to a secret-derived key
pub struct SecretVault {
    cipher: ChaCha20Poly1305,
}

impl SecretVault {
    /// Derive the sealing key from the shared secret and build the cipher
    pub fn from_secret(shared_secret: &str) -> SwarmResult<Self> {
        let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, 32)
            .map_err(|e| SwarmError::Crypto(format!("Invalid KDF parameters: {}", e)))?;
        let mut key = [0u8; 32];
        scrypt(shared_secret.as_bytes(), KDF_SALT, &params, &mut key)
            .map_err(|e| SwarmError::Crypto(format!("Key derivation failed: {}", e)))?;

        Ok(Self {
            cipher: ChaCha20Poly1305::new((&key).into()),
        })
    }

    /// Seal plaintext; output is `[nonce] + [ciphertext + tag]`
    pub fn seal(&self, plaintext: &[u8]) -> SwarmResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| SwarmError::Crypto(format!("Encryption failed: {}", e)))?;

        let mut result = nonce_bytes.to_vec();
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Open sealed data produced by [`seal`](Self::seal)
    pub fn open(&self, sealed: &[u8]) -> SwarmResult<Vec<u8>> {
        if sealed.len() < NONCE_SIZE {
            return Err(SwarmError::Crypto(
                "Sealed data too short to contain nonce".to_string(),
            ));
        }

        let nonce = Nonce::from_slice(&sealed[..NONCE_SIZE]);
        self.cipher
            .decrypt(nonce, &sealed[NONCE_SIZE..])
            .map_err(|e| SwarmError::Crypto(format!("Decryption failed: {}", e)))
    }
}
