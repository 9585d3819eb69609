//! Transient wire structures and endpoint paths
//!
//! Nothing in this module is persisted; payloads are rebuilt from the
//! registry for every exchange.

use serde::{Deserialize, Serialize};

use crate::types::handle::HandleEntry;
use crate::types::node::SwarmNodeInfo;

/// Inbound announce endpoint (`POST`); responds with this node's own info
pub const ANNOUNCE_PATH: &str = "/api/swarm/announce";
/// Inbound gossip endpoint (`POST`), signed full-duplex exchange
pub const GOSSIP_PATH: &str = "/api/swarm/gossip";
/// Public node metadata + key endpoint (`GET`)
pub const NODE_INFO_PATH: &str = "/api/swarm/node-info";

/// Inbound interaction endpoint for one interaction kind (`POST`)
pub fn interaction_path(kind: &str) -> String {
    format!("/api/swarm/interactions/{kind}")
}

/// Public user profile endpoint (`GET`)
pub fn user_profile_path(handle: &str) -> String {
    format!("/api/swarm/users/{handle}")
}

/// Self-announcement pushed to seeds and served to probing peers.
///
/// Unsigned by default; callers that need authentication wrap it in a
/// [`SignedEnvelope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmAnnouncement {
    #[serde(flatten)]
    pub info: SwarmNodeInfo,
    pub sent_at: i64,
}

/// Outbound gossip payload: our own announcement-shaped entry, a bounded
/// slice of the registry, and handle-registry deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GossipPayload {
    /// Domain of the sending node
    pub sender: String,
    /// The sender's own registry entry
    pub announcement: SwarmNodeInfo,
    pub nodes: Vec<SwarmNodeInfo>,
    pub handles: Vec<HandleEntry>,
    /// Incremental-sync cursor: the receiver should answer with state
    /// updated strictly after this timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<i64>,
    pub sent_at: i64,
}

/// Reply half of a gossip exchange: the receiver's own payload plus counts
/// of what it took in. Both sides converge in one HTTP round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GossipResponse {
    pub sender: String,
    pub announcement: SwarmNodeInfo,
    pub nodes: Vec<SwarmNodeInfo>,
    pub handles: Vec<HandleEntry>,
    pub nodes_received: u32,
    pub handles_received: u32,
    pub sent_at: i64,
}

/// A payload plus the hex-encoded signature over its canonical serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedEnvelope<T> {
    pub payload: T,
    pub signature: String,
}

impl<T> SignedEnvelope<T> {
    pub fn new(payload: T, signature: String) -> Self {
        Self { payload, signature }
    }
}
