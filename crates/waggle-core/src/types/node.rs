//! Registry node types
//!
//! [`SwarmNode`] is the stored record for one known peer, keyed by domain.
//! [`SwarmNodeInfo`] is its wire shape: everything except the domain is
//! optional so a sparse announcement can never blank out locally known
//! fields, so upserts merge present fields over existing ones.

use serde::{Deserialize, Serialize};

use crate::types::now_millis;

/// Capabilities a node can advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Participates in handle-registry propagation
    Handles,
    /// Accepts gossip exchanges
    Gossip,
    /// Relays payloads for third parties
    Relay,
    /// Offers federated search
    Search,
}

/// Wire representation of a node's public metadata.
///
/// Used in announcements, gossip payloads, and the node-info endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwarmNodeInfo {
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    /// Hex-encoded ed25519 public key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsfw: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<Capability>>,
}

impl SwarmNodeInfo {
    /// Minimal info carrying only a domain
    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Default::default()
        }
    }
}

/// Stored record for one known peer node, keyed by domain.
///
/// Never hard-deleted: unreachable nodes decay to inactive and low trust
/// and recover on the next successful contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmNode {
    pub domain: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    /// Hex-encoded ed25519 public key, cached for signature verification
    pub public_key: Option<String>,
    pub software_version: Option<String>,
    pub user_count: Option<u64>,
    pub post_count: Option<u64>,
    pub nsfw: bool,
    pub capabilities: Vec<Capability>,

    /// Domain that first told us about this node
    pub discovered_via: Option<String>,
    pub discovered_at: i64,

    pub last_seen_at: i64,
    pub last_sync_at: Option<i64>,
    pub consecutive_failures: u32,
    pub is_active: bool,
    /// Bounded health metric, always within [0, 100]
    pub trust_score: i32,

    /// Last local mutation, drives incremental sync cursors
    pub updated_at: i64,
}

impl SwarmNode {
    /// Create a record from wire info on first discovery
    pub fn from_info(info: &SwarmNodeInfo, discovered_via: Option<&str>, initial_trust: i32) -> Self {
        let now = now_millis();
        Self {
            domain: info.domain.clone(),
            name: info.name.clone(),
            description: info.description.clone(),
            logo_url: info.logo_url.clone(),
            public_key: info.public_key.clone(),
            software_version: info.software_version.clone(),
            user_count: info.user_count,
            post_count: info.post_count,
            nsfw: info.nsfw.unwrap_or(false),
            capabilities: info.capabilities.clone().unwrap_or_default(),
            discovered_via: discovered_via.map(str::to_string),
            discovered_at: now,
            last_seen_at: now,
            last_sync_at: None,
            consecutive_failures: 0,
            is_active: true,
            trust_score: initial_trust.clamp(0, 100),
            updated_at: now,
        }
    }

    /// Merge wire info over this record.
    ///
    /// Present fields win; absent fields never erase known values. Any
    /// mention of a node counts as contact: failures reset, the node
    /// reactivates, and `last_seen_at` moves forward.
    pub fn merge_info(&mut self, info: &SwarmNodeInfo) {
        let now = now_millis();
        if let Some(ref name) = info.name {
            self.name = Some(name.clone());
        }
        if let Some(ref description) = info.description {
            self.description = Some(description.clone());
        }
        if let Some(ref logo_url) = info.logo_url {
            self.logo_url = Some(logo_url.clone());
        }
        if let Some(ref public_key) = info.public_key {
            self.public_key = Some(public_key.clone());
        }
        if let Some(ref software_version) = info.software_version {
            self.software_version = Some(software_version.clone());
        }
        if let Some(user_count) = info.user_count {
            self.user_count = Some(user_count);
        }
        if let Some(post_count) = info.post_count {
            self.post_count = Some(post_count);
        }
        if let Some(nsfw) = info.nsfw {
            self.nsfw = nsfw;
        }
        if let Some(ref capabilities) = info.capabilities {
            self.capabilities = capabilities.clone();
        }
        self.consecutive_failures = 0;
        self.is_active = true;
        self.last_seen_at = now;
        self.updated_at = now;
    }

    /// Wire shape of this record for gossip payloads
    pub fn to_info(&self) -> SwarmNodeInfo {
        SwarmNodeInfo {
            domain: self.domain.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            logo_url: self.logo_url.clone(),
            public_key: self.public_key.clone(),
            software_version: self.software_version.clone(),
            user_count: self.user_count,
            post_count: self.post_count,
            nsfw: Some(self.nsfw),
            capabilities: if self.capabilities.is_empty() {
                None
            } else {
                Some(self.capabilities.clone())
            },
        }
    }

    /// Record a successful contact
    pub fn apply_success(&mut self, trust_delta: i32) {
        let now = now_millis();
        self.trust_score = (self.trust_score + trust_delta).clamp(0, 100);
        self.consecutive_failures = 0;
        self.is_active = true;
        self.last_seen_at = now;
        self.last_sync_at = Some(now);
        self.updated_at = now;
    }

    /// Record a failed contact
    pub fn apply_failure(&mut self, trust_delta: i32, max_consecutive_failures: u32) {
        self.consecutive_failures += 1;
        self.trust_score = (self.trust_score - trust_delta).clamp(0, 100);
        self.is_active = self.consecutive_failures < max_consecutive_failures;
        self.updated_at = now_millis();
    }

    /// Whether this node qualifies as a gossip target
    pub fn is_gossip_candidate(&self, trust_floor: i32) -> bool {
        self.is_active && self.trust_score > trust_floor
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
