//! Signature engine
//!
//! Signs and verifies structured payloads over their canonical
//! serialization, and resolves the keys of remote nodes and users on
//! demand. Verification is fail-closed everywhere: a payload whose key
//! cannot be fetched, parsed, or matched is rejected, never tentatively
//! accepted.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::canonical::canonical_digest;
use crate::config::SwarmConfig;
use crate::error::SwarmResult;
use crate::identity::NodeKeypair;
use crate::registry::NodeRegistry;
use crate::storage::Storage;
use crate::types::wire::{user_profile_path, NODE_INFO_PATH};
use crate::types::{RemoteProfile, SwarmNodeInfo};

/// A hex key parses to exactly 32 bytes; anything else is treated as
/// missing so lookups fall through to a fresh fetch.
fn is_well_formed_key(key: &str) -> bool {
    matches!(hex::decode(key), Ok(bytes) if bytes.len() == 32)
}

#[derive(Clone)]
pub struct SignatureEngine {
    config: Arc<SwarmConfig>,
    client: reqwest::Client,
    registry: NodeRegistry,
    storage: Storage,
}

impl SignatureEngine {
    pub fn new(
        config: Arc<SwarmConfig>,
        client: reqwest::Client,
        registry: NodeRegistry,
        storage: Storage,
    ) -> Self {
        Self {
            config,
            client,
            registry,
            storage,
        }
    }

    /// Sign a payload with the node keypair, returning the hex signature
    /// over the SHA-256 digest of the canonical serialization.
    pub fn sign<T: Serialize>(payload: &T, keypair: &NodeKeypair) -> SwarmResult<String> {
        let digest = canonical_digest(payload)?;
        Ok(keypair.sign_digest(&digest))
    }

    /// Verify a payload signature against a hex public key.
    ///
    /// Any malformed input (payload, signature, key) verifies as `false`.
    pub fn verify<T: Serialize>(payload: &T, signature_hex: &str, public_key_hex: &str) -> bool {
        let Ok(digest) = canonical_digest(payload) else {
            return false;
        };
        NodeKeypair::verify_digest(public_key_hex, &digest, signature_hex)
    }

    /// Verify a payload against a remote *node's* key.
    ///
    /// The key is resolved from the registry cache first, then from the
    /// domain's public node-info endpoint. Resolution failure rejects the
    /// payload.
    pub async fn verify_remote<T: Serialize>(
        &self,
        payload: &T,
        signature_hex: &str,
        domain: &str,
    ) -> bool {
        let Some(public_key) = self.resolve_node_key(domain).await else {
            warn!(domain, "No public key resolvable; rejecting payload");
            return false;
        };
        Self::verify(payload, signature_hex, &public_key)
    }

    /// Verify a payload against a remote *user's* key.
    ///
    /// Prefers the local key cache; a cached but malformed key counts as a
    /// miss. On miss the user's remote profile is fetched and the key
    /// cached opportunistically.
    pub async fn verify_user_scoped<T: Serialize>(
        &self,
        payload: &T,
        signature_hex: &str,
        handle: &str,
        domain: &str,
    ) -> bool {
        let cached = self
            .storage
            .load_user_key(handle, domain)
            .unwrap_or_default()
            .filter(|key| is_well_formed_key(key));

        let public_key = match cached {
            Some(key) => key,
            None => {
                let Some(profile) = self.fetch_remote_profile(handle, domain).await else {
                    return false;
                };
                let Some(key) = profile.public_key.filter(|k| is_well_formed_key(k)) else {
                    warn!(handle, domain, "Remote profile has no usable key");
                    return false;
                };
                if let Err(e) = self.storage.save_user_key(handle, domain, &key) {
                    // cache failure is not a verification failure
                    warn!(handle, domain, error = %e, "Failed to cache user key");
                }
                key
            }
        };

        Self::verify(payload, signature_hex, &public_key)
    }

    /// Resolve a node's public key: registry cache first, then its public
    /// node-info endpoint. A freshly fetched key is cached via upsert.
    async fn resolve_node_key(&self, domain: &str) -> Option<String> {
        match self.registry.get_node(domain) {
            Ok(Some(node)) => {
                if let Some(key) = node.public_key.filter(|k| is_well_formed_key(k)) {
                    return Some(key);
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(domain, error = %e, "Registry lookup failed during key resolution");
                return None;
            }
        }

        let info = self.fetch_node_info(domain).await?;
        let key = info.public_key.clone().filter(|k| is_well_formed_key(k))?;
        if !self.config.is_self(domain) {
            if let Err(e) = self.registry.upsert_node(&info, None) {
                warn!(domain, error = %e, "Failed to cache fetched node key");
            }
        }
        Some(key)
    }

    /// Fetch a domain's public node info (bounded timeout); `None` on any
    /// network or decode failure.
    pub async fn fetch_node_info(&self, domain: &str) -> Option<SwarmNodeInfo> {
        let url = self.config.endpoint_url(domain, NODE_INFO_PATH);
        let response = self
            .client
            .get(&url)
            .timeout(self.config.fetch_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match response {
            Ok(response) => match response.json::<SwarmNodeInfo>().await {
                Ok(mut info) => {
                    info.domain = domain.to_string();
                    Some(info)
                }
                Err(e) => {
                    debug!(domain, error = %e, "Node info response failed to decode");
                    None
                }
            },
            Err(e) => {
                debug!(domain, error = %e, "Node info fetch failed");
                None
            }
        }
    }

    /// Fetch a user's remote profile (bounded timeout); `None` on any
    /// network or decode failure.
    pub async fn fetch_remote_profile(&self, handle: &str, domain: &str) -> Option<RemoteProfile> {
        let url = self.config.endpoint_url(domain, &user_profile_path(handle));
        let response = self
            .client
            .get(&url)
            .timeout(self.config.fetch_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match response {
            Ok(response) => match response.json::<RemoteProfile>().await {
                Ok(profile) => Some(profile),
                Err(e) => {
                    debug!(handle, domain, error = %e, "Profile response failed to decode");
                    None
                }
            },
            Err(e) => {
                debug!(handle, domain, error = %e, "Profile fetch failed");
                None
            }
        }
    }
}
