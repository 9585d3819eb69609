//! Bootstrap seed nodes

use serde::{Deserialize, Serialize};

use crate::types::now_millis;

/// Well-known bootstrap peers used when no seeds are configured
pub const DEFAULT_SEEDS: &[&str] = &["seed1.waggle.network", "seed2.waggle.network"];

/// A configured bootstrap peer.
///
/// Seeds are only used to join the swarm from an empty registry; once gossip
/// is flowing they are ordinary registry nodes like any other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedNode {
    pub domain: String,
    /// Ascending priority; lower is tried first
    pub priority: u32,
    pub is_enabled: bool,
    pub last_contact_at: Option<i64>,
    pub consecutive_failures: u32,
}

impl SeedNode {
    pub fn new(domain: impl Into<String>, priority: u32) -> Self {
        Self {
            domain: domain.into(),
            priority,
            is_enabled: true,
            last_contact_at: None,
            consecutive_failures: 0,
        }
    }

    /// Record the outcome of a contact attempt
    pub fn record_contact(&mut self, success: bool) {
        self.last_contact_at = Some(now_millis());
        if success {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
        }
    }
}
