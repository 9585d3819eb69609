//! Interaction delivery
//!
//! Stateless point-to-point delivery of user-level events to a peer's
//! interaction endpoints, independent of gossip. Delivery is
//! fire-and-forget with a bounded timeout: no sender-side retry, no
//! sender-side dedup. Receivers deduplicate on `interaction_id`.

use std::sync::Arc;

use tracing::debug;

use crate::config::SwarmConfig;
use crate::error::SwarmResult;
use crate::handles::HandleDirectory;
use crate::registry::NodeRegistry;
use crate::types::wire::interaction_path;
use crate::types::{DeliveryAck, Interaction};

/// Structured result of one delivery attempt. Callers decide whether to
/// retry; this component never does.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct InteractionDelivery {
    config: Arc<SwarmConfig>,
    client: reqwest::Client,
    registry: NodeRegistry,
    handles: HandleDirectory,
}

impl InteractionDelivery {
    pub fn new(
        config: Arc<SwarmConfig>,
        client: reqwest::Client,
        registry: NodeRegistry,
        handles: HandleDirectory,
    ) -> Self {
        Self {
            config,
            client,
            registry,
            handles,
        }
    }

    /// Deliver one interaction to a target domain's matching endpoint.
    ///
    /// Network failure and non-2xx responses become a failed outcome and a
    /// failure mark on the target; only persistence trouble is an `Err`.
    pub async fn deliver(
        &self,
        domain: &str,
        interaction: &Interaction,
    ) -> SwarmResult<DeliveryOutcome> {
        let url = self
            .config
            .endpoint_url(domain, &interaction_path(interaction.kind().as_str()));

        let result = async {
            let response = self
                .client
                .post(&url)
                .timeout(self.config.interaction_timeout)
                .json(interaction)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| e.to_string())?;
            response
                .json::<DeliveryAck>()
                .await
                .map_err(|e| e.to_string())
        }
        .await;

        match result {
            Ok(ack) => {
                self.registry.mark_success(domain)?;
                debug!(
                    domain,
                    kind = %interaction.kind(),
                    id = interaction.interaction_id(),
                    duplicate = ack.duplicate,
                    "Interaction delivered"
                );
                Ok(DeliveryOutcome {
                    success: true,
                    error: None,
                })
            }
            Err(error) => {
                self.registry.mark_failure(domain)?;
                debug!(
                    domain,
                    kind = %interaction.kind(),
                    %error,
                    "Interaction delivery failed"
                );
                Ok(DeliveryOutcome {
                    success: false,
                    error: Some(error),
                })
            }
        }
    }

    /// Whether a domain is a known, active swarm peer: the gate between
    /// this fast path and the legacy federation protocol.
    pub fn is_swarm_node(&self, domain: &str) -> SwarmResult<bool> {
        Ok(self
            .registry
            .get_node(domain)?
            .map(|n| n.is_active)
            .unwrap_or(false))
    }

    /// Whether a handle resolves to an active swarm peer
    pub fn is_swarm_handle(&self, handle: &str) -> SwarmResult<bool> {
        match self.handles.get(handle)? {
            Some(entry) => self.is_swarm_node(&entry.domain),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use crate::types::{ActorRef, HandleEntry, SwarmNodeInfo};
    use tempfile::tempdir;

    fn delivery_for(domain: &str) -> (InteractionDelivery, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("test.db")).unwrap();
        let config = Arc::new(SwarmConfig::new(domain));
        let registry = NodeRegistry::new(storage.clone(), config.clone());
        let handles = HandleDirectory::new(storage);
        (
            InteractionDelivery::new(config, reqwest::Client::new(), registry, handles),
            dir,
        )
    }

    fn actor() -> ActorRef {
        ActorRef {
            handle: "ada".to_string(),
            did: "did:swarm:a1".to_string(),
            domain: "self.example".to_string(),
        }
    }

    #[test]
    fn test_is_swarm_node_requires_known_and_active() {
        let (delivery, _dir) = delivery_for("self.example");

        assert!(!delivery.is_swarm_node("peer.example").unwrap());

        delivery
            .registry
            .upsert_node(&SwarmNodeInfo::for_domain("peer.example"), None)
            .unwrap();
        assert!(delivery.is_swarm_node("peer.example").unwrap());

        for _ in 0..5 {
            delivery.registry.mark_failure("peer.example").unwrap();
        }
        assert!(!delivery.is_swarm_node("peer.example").unwrap());
    }

    #[test]
    fn test_is_swarm_handle_resolves_through_directory() {
        let (delivery, _dir) = delivery_for("self.example");

        assert!(!delivery.is_swarm_handle("ada").unwrap());

        delivery
            .handles
            .upsert_entries(&[HandleEntry::new("ada", "did:swarm:a1", "peer.example", 100)])
            .unwrap();
        // handle known but node unknown
        assert!(!delivery.is_swarm_handle("ada").unwrap());

        delivery
            .registry
            .upsert_node(&SwarmNodeInfo::for_domain("peer.example"), None)
            .unwrap();
        assert!(delivery.is_swarm_handle("ada").unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_target_is_failed_outcome() {
        let (delivery, _dir) = delivery_for("self.example");
        delivery
            .registry
            .upsert_node(&SwarmNodeInfo::for_domain("127.0.0.1:1"), None)
            .unwrap();

        let outcome = delivery
            .deliver("127.0.0.1:1", &Interaction::like(actor(), "uri"))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.is_some());

        // the failed contact decayed the target's health
        let node = delivery.registry.get_node("127.0.0.1:1").unwrap().unwrap();
        assert_eq!(node.consecutive_failures, 1);
    }
}
