//! Swarm event notifications
//!
//! Background maintenance is invisible to end users; these events exist so
//! the hosting application (and tests) can observe what the subsystem is
//! doing without polling storage.

use crate::gossip::GossipRoundReport;
use crate::types::InteractionKind;

/// Events emitted by swarm components
#[derive(Debug, Clone)]
pub enum SwarmEvent {
    /// A previously unknown node entered the registry
    NodeDiscovered {
        domain: String,
        via: Option<String>,
    },
    /// A single gossip exchange finished
    GossipExchanged {
        domain: String,
        success: bool,
    },
    /// A scheduled gossip round finished
    GossipRoundCompleted(GossipRoundReport),
    /// An inbound interaction arrived on one of the interaction endpoints
    InteractionReceived {
        kind: InteractionKind,
        interaction_id: String,
        duplicate: bool,
    },
    /// A self-healing nudge completed successfully
    ConnectionHealed {
        did: String,
    },
}
