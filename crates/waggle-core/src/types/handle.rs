//! Handle registry entries and remote profiles
//!
//! The handle registry maps a globally unique user handle to its
//! decentralized identifier and owning node domain. Gossip piggy-backs
//! deltas of this table; conflicts resolve last-write-wins by `updated_at`.

use serde::{Deserialize, Serialize};

/// One handle → identity → home-node mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandleEntry {
    /// Globally unique user handle (e.g. "ada")
    pub handle: String,
    /// Decentralized identifier for the user
    pub did: String,
    /// Domain of the user's home node
    pub domain: String,
    /// Last-write-wins conflict cursor, unix milliseconds
    pub updated_at: i64,
}

impl HandleEntry {
    pub fn new(
        handle: impl Into<String>,
        did: impl Into<String>,
        domain: impl Into<String>,
        updated_at: i64,
    ) -> Self {
        Self {
            handle: handle.into(),
            did: did.into(),
            domain: domain.into(),
            updated_at,
        }
    }
}

/// A user profile as served by a node's public user endpoint.
///
/// Fetched directly (bypassing gossip) for user-scoped signature
/// verification and opportunistic handle-registry refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteProfile {
    pub handle: String,
    pub did: String,
    pub domain: String,
    /// Hex-encoded ed25519 public key for user-scoped signatures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_entry_serde() {
        let entry = HandleEntry::new("ada", "did:swarm:abc123", "a.example", 1_700_000_000_000);
        let json = serde_json::to_string(&entry).unwrap();
        let back: HandleEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }

    #[test]
    fn test_remote_profile_optional_key_omitted() {
        let profile = RemoteProfile {
            handle: "ada".to_string(),
            did: "did:swarm:abc123".to_string(),
            domain: "a.example".to_string(),
            public_key: None,
            display_name: None,
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("public_key"));
    }
}
