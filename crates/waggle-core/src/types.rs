//! Core types for the swarm subsystem

use serde::{Deserialize, Serialize};

pub mod handle;
pub mod interaction;
pub mod node;
pub mod seed;
pub mod wire;

pub use handle::{HandleEntry, RemoteProfile};
pub use interaction::{ActorRef, DeliveryAck, Interaction, InteractionKind};
pub use node::{Capability, SwarmNode, SwarmNodeInfo};
pub use seed::{SeedNode, DEFAULT_SEEDS};
pub use wire::{GossipPayload, GossipResponse, SignedEnvelope, SwarmAnnouncement};

/// Current unix time in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Direction of a gossip exchange as seen from this node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncDirection {
    /// We initiated the exchange
    Push,
    /// A peer initiated the exchange
    Pull,
}

impl std::fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncDirection::Push => write!(f, "push"),
            SyncDirection::Pull => write!(f, "pull"),
        }
    }
}

/// Append-only audit record of one gossip exchange.
///
/// Written after every attempt regardless of outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub remote_domain: String,
    pub direction: SyncDirection,
    pub nodes_sent: u32,
    pub nodes_received: u32,
    pub handles_sent: u32,
    pub handles_received: u32,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub created_at: i64,
}

/// Counts returned by batch upserts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub added: usize,
    pub updated: usize,
}

impl UpsertStats {
    pub fn total(&self) -> usize {
        self.added + self.updated
    }
}
