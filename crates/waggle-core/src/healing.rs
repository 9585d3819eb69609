//! Self-healing
//!
//! Reactive repair for stale federation state. When a cached address for a
//! known identity stops working, an out-of-band gossip exchange with its
//! last known node refreshes both registries; any successfully fetched
//! remote profile is folded into the handle directory immediately instead
//! of waiting for the next gossip round.

use tracing::{debug, info};

use crate::error::SwarmResult;
use crate::gossip::GossipEngine;
use crate::handles::HandleDirectory;
use crate::storage::Storage;
use crate::types::{now_millis, HandleEntry, RemoteProfile};

#[derive(Clone)]
pub struct SelfHealing {
    gossip: GossipEngine,
    handles: HandleDirectory,
    storage: Storage,
}

impl SelfHealing {
    pub fn new(gossip: GossipEngine, handles: HandleDirectory, storage: Storage) -> Self {
        Self {
            gossip,
            handles,
            storage,
        }
    }

    /// Force an out-of-band gossip exchange with the node last known to
    /// host `did`.
    ///
    /// Returns `true` when the exchange succeeded and carried at least one
    /// handle update. This is a best-effort nudge, not a verified repair of the
    /// specific identity.
    pub async fn heal_connection(&self, did: &str, known_domain: Option<&str>) -> SwarmResult<bool> {
        let domain = match known_domain {
            Some(domain) => domain.to_string(),
            None => match self.handles.find_by_did(did)? {
                Some(entry) => entry.domain,
                None => {
                    debug!(did, "No known domain for identity; nothing to heal");
                    return Ok(false);
                }
            },
        };

        let outcome = self.gossip.gossip_to_node(&domain, None).await?;
        let healed = outcome.success && outcome.handles_received >= 1;
        if healed {
            info!(did, domain, handles = outcome.handles_received, "Connection healed");
        } else {
            debug!(did, domain, success = outcome.success, "Heal attempt did not refresh handles");
        }
        Ok(healed)
    }

    /// Fold a directly fetched remote profile into local state right away:
    /// upsert the handle mapping and opportunistically cache the user key.
    pub fn update_from_profile(&self, profile: &RemoteProfile) -> SwarmResult<()> {
        self.handles.upsert_entries(&[HandleEntry::new(
            profile.handle.clone(),
            profile.did.clone(),
            profile.domain.clone(),
            now_millis(),
        )])?;

        if let Some(ref key) = profile.public_key {
            self.storage
                .save_user_key(&profile.handle, &profile.domain, key)?;
        }

        debug!(handle = %profile.handle, domain = %profile.domain, "Handle refreshed from profile");
        Ok(())
    }
}
