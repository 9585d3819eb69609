//! Node configuration
//!
//! Every component receives a [`SwarmConfig`] at construction instead of
//! reading process environment deep in call paths. The daemon binary is the
//! only place that touches env vars.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::types::Capability;

/// Configuration for this node's swarm participation
#[derive(Debug, Clone)]
pub struct SwarmConfig {
    /// This node's own domain (e.g. "social.example.org"). Globally unique
    /// node identity; never stored in the local registry.
    pub domain: String,
    /// URL scheme used to reach peers ("https" in production, "http" in
    /// tests against in-process servers)
    pub scheme: String,
    /// Human-readable node name used in announcements
    pub node_name: String,
    /// Node description for announcements
    pub description: Option<String>,
    /// Logo URL for announcements
    pub logo_url: Option<String>,
    /// Software version advertised to peers
    pub software_version: String,
    /// Whether this node hosts NSFW content
    pub nsfw: bool,
    /// Capabilities this node advertises
    pub capabilities: Vec<Capability>,
    /// Process-wide secret used to encrypt the node private key at rest.
    /// Absent secret makes keypair loading fail with a configuration error.
    pub shared_secret: Option<String>,
    /// Configured seed domains; empty means the built-in default list
    pub seeds: Vec<String>,
    /// Interval between gossip rounds
    pub gossip_interval: Duration,
    /// Number of peers contacted per gossip round
    pub gossip_fanout: usize,
    /// Timeout for a single gossip exchange
    pub gossip_timeout: Duration,
    /// Timeout for interaction delivery
    pub interaction_timeout: Duration,
    /// Timeout for node-info and profile fetches
    pub fetch_timeout: Duration,
    /// Trust added on a successful contact
    pub trust_success_delta: i32,
    /// Trust subtracted on a failed contact
    pub trust_failure_delta: i32,
    /// Nodes at or below this trust score are not selected as gossip targets
    pub trust_floor: i32,
    /// Failures after which a node is marked inactive
    pub max_consecutive_failures: u32,
    /// Trust score assigned to newly discovered nodes
    pub initial_trust: i32,
    /// Maximum node entries carried in one gossip payload
    pub max_nodes_per_gossip: usize,
    /// Maximum handle entries carried in one gossip payload
    pub max_handles_per_gossip: usize,
}

impl SwarmConfig {
    /// Create a configuration with production defaults for the given domain
    pub fn new(domain: impl Into<String>) -> Self {
        let domain = domain.into();
        Self {
            node_name: domain.clone(),
            domain,
            scheme: "https".to_string(),
            description: None,
            logo_url: None,
            software_version: env!("CARGO_PKG_VERSION").to_string(),
            nsfw: false,
            capabilities: vec![Capability::Handles, Capability::Gossip],
            shared_secret: None,
            seeds: Vec::new(),
            gossip_interval: Duration::from_secs(300),
            gossip_fanout: 3,
            gossip_timeout: Duration::from_secs(10),
            interaction_timeout: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(10),
            trust_success_delta: 1,
            trust_failure_delta: 5,
            trust_floor: 20,
            max_consecutive_failures: 5,
            initial_trust: 50,
            max_nodes_per_gossip: 50,
            max_handles_per_gossip: 100,
        }
    }

    /// Base URL for a peer domain
    pub fn base_url(&self, domain: &str) -> String {
        format!("{}://{}", self.scheme, domain)
    }

    /// Full URL for an endpoint path on a peer domain
    pub fn endpoint_url(&self, domain: &str, path: &str) -> String {
        format!("{}://{}{}", self.scheme, domain, path)
    }

    /// Whether a domain refers to this node itself
    pub fn is_self(&self, domain: &str) -> bool {
        self.domain.eq_ignore_ascii_case(domain)
    }
}

/// Counts advertised in announcements and node info.
///
/// The content layer owns the real numbers; it pushes them here so the swarm
/// subsystem never reaches into content storage.
#[derive(Clone, Default)]
pub struct NodeStats {
    inner: Arc<RwLock<Counts>>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    users: u64,
    posts: u64,
}

impl NodeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_user_count(&self, users: u64) {
        self.inner.write().users = users;
    }

    pub fn set_post_count(&self, posts: u64) {
        self.inner.write().posts = posts;
    }

    pub fn user_count(&self) -> u64 {
        self.inner.read().users
    }

    pub fn post_count(&self) -> u64 {
        self.inner.read().posts
    }
}
