//! Main SwarmEngine - the primary entry point for the swarm subsystem
//!
//! SwarmEngine wires identity, storage, and the protocol components
//! together, runs the startup announcement, and drives the periodic
//! gossip rounds.
//!
//! # Example
//!
//! ```ignore
//! use waggle_core::{SwarmConfig, SwarmEngine};
//!
//! let mut config = SwarmConfig::new("social.example.org");
//! config.shared_secret = Some(std::env::var("WAGGLE_SECRET")?);
//! config.seeds = vec!["seed1.waggle.network".to_string()];
//!
//! let engine = SwarmEngine::open(config, "~/.waggle/data")?;
//! engine.start().await;
//!
//! // inbound endpoints
//! let app = waggle_core::http::router(engine.clone());
//! axum::serve(listener, app).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{NodeStats, SwarmConfig};
use crate::discovery::Discovery;
use crate::error::SwarmResult;
use crate::events::SwarmEvent;
use crate::gossip::GossipEngine;
use crate::handles::HandleDirectory;
use crate::healing::SelfHealing;
use crate::identity::{KeypairStore, NodeKeypair};
use crate::interaction::InteractionDelivery;
use crate::registry::NodeRegistry;
use crate::signing::SignatureEngine;
use crate::storage::Storage;
use crate::types::{
    DeliveryAck, GossipPayload, GossipResponse, Interaction, RemoteProfile, SeedNode,
    SignedEnvelope, SwarmAnnouncement, SwarmNodeInfo,
};

/// Default capacity for the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Top-level handle owning every swarm component
pub struct SwarmEngine {
    config: Arc<SwarmConfig>,
    storage: Storage,
    keypair: NodeKeypair,
    registry: NodeRegistry,
    handles: HandleDirectory,
    signing: SignatureEngine,
    discovery: Discovery,
    gossip: GossipEngine,
    interactions: InteractionDelivery,
    healing: SelfHealing,
    stats: NodeStats,
    event_tx: broadcast::Sender<SwarmEvent>,
    round_task: Mutex<Option<JoinHandle<()>>>,
}

impl SwarmEngine {
    /// Open the engine: storage, identity, and all components.
    ///
    /// Configured seeds are inserted into the seed table on first sight;
    /// the keypair is generated and sealed on first start.
    pub fn open(config: SwarmConfig, data_dir: impl AsRef<Path>) -> SwarmResult<Arc<Self>> {
        let storage = Storage::new(data_dir.as_ref().join("swarm.db"))?;

        for (i, domain) in config.seeds.iter().enumerate() {
            if storage.load_seed(domain)?.is_none() {
                storage.save_seed(&SeedNode::new(domain.clone(), i as u32))?;
            }
        }

        let config = Arc::new(config);
        let keypair = KeypairStore::new(storage.clone()).load_or_generate(&config)?;
        info!(domain = %config.domain, key = %keypair.public_key_hex(), "Swarm identity ready");

        let client = reqwest::Client::new();
        let registry = NodeRegistry::new(storage.clone(), config.clone());
        let handles = HandleDirectory::new(storage.clone());
        let stats = NodeStats::new();
        let signing = SignatureEngine::new(
            config.clone(),
            client.clone(),
            registry.clone(),
            storage.clone(),
        );
        let discovery = Discovery::new(
            config.clone(),
            client.clone(),
            registry.clone(),
            keypair.clone(),
            stats.clone(),
        );
        let gossip = GossipEngine::new(
            config.clone(),
            client.clone(),
            registry.clone(),
            handles.clone(),
            signing.clone(),
            discovery.clone(),
            keypair.clone(),
        );
        let interactions =
            InteractionDelivery::new(config.clone(), client, registry.clone(), handles.clone());
        let healing = SelfHealing::new(gossip.clone(), handles.clone(), storage.clone());

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Arc::new(Self {
            config,
            storage,
            keypair,
            registry,
            handles,
            signing,
            discovery,
            gossip,
            interactions,
            healing,
            stats,
            event_tx,
            round_task: Mutex::new(None),
        }))
    }

    /// Announce to seeds, run one immediate gossip round, then keep
    /// gossiping on the configured interval until [`shutdown`](Self::shutdown).
    pub async fn start(self: &Arc<Self>) {
        match self.discovery.announce_to_seeds().await {
            Ok(report) if !report.succeeded.is_empty() => {}
            Ok(_) => warn!("No seed accepted our announcement"),
            Err(e) => error!(error = %e, "Seed announcement errored"),
        }

        self.run_round_once().await;

        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(engine.config.gossip_interval);
            // the first tick completes immediately; the startup round above
            // already covered it
            interval.tick().await;
            loop {
                interval.tick().await;
                engine.run_round_once().await;
            }
        });
        *self.round_task.lock() = Some(handle);
        info!(
            interval_secs = self.config.gossip_interval.as_secs(),
            fanout = self.config.gossip_fanout,
            "Gossip scheduler running"
        );
    }

    async fn run_round_once(&self) {
        match self.gossip.run_round().await {
            Ok(report) => {
                let _ = self.event_tx.send(SwarmEvent::GossipRoundCompleted(report));
            }
            Err(e) => error!(error = %e, "Gossip round failed"),
        }
    }

    /// Stop the periodic gossip task
    pub fn shutdown(&self) {
        if let Some(task) = self.round_task.lock().take() {
            task.abort();
            info!("Gossip scheduler stopped");
        }
    }

    /// Subscribe to swarm events
    pub fn subscribe(&self) -> broadcast::Receiver<SwarmEvent> {
        self.event_tx.subscribe()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Inbound operations (called by the HTTP layer)
    // ═══════════════════════════════════════════════════════════════════

    /// This node's public info for the node-info endpoint
    pub fn self_info(&self) -> SwarmNodeInfo {
        self.discovery.self_info()
    }

    /// Accept a peer's announcement and answer with our own info
    pub fn handle_announce(&self, announcement: &SwarmAnnouncement) -> SwarmResult<SwarmNodeInfo> {
        if !self.config.is_self(&announcement.info.domain) {
            let outcome = self.registry.upsert_node(&announcement.info, None)?;
            if outcome.is_new {
                let _ = self.event_tx.send(SwarmEvent::NodeDiscovered {
                    domain: announcement.info.domain.clone(),
                    via: None,
                });
            }
        }
        Ok(self.self_info())
    }

    /// Authenticate and process an inbound gossip payload.
    ///
    /// `Ok(None)` means the signature did not verify against the sender's
    /// key; the payload was rejected and nothing was merged.
    pub async fn handle_gossip(
        &self,
        envelope: SignedEnvelope<GossipPayload>,
    ) -> SwarmResult<Option<SignedEnvelope<GossipResponse>>> {
        let sender = envelope.payload.sender.clone();
        if !self
            .signing
            .verify_remote(&envelope.payload, &envelope.signature, &sender)
            .await
        {
            warn!(%sender, "Rejected unauthenticated gossip payload");
            let _ = self.event_tx.send(SwarmEvent::GossipExchanged {
                domain: sender,
                success: false,
            });
            return Ok(None);
        }

        let response = self.gossip.process_inbound(&envelope.payload)?;
        let signature = SignatureEngine::sign(&response, &self.keypair)?;
        let _ = self.event_tx.send(SwarmEvent::GossipExchanged {
            domain: sender,
            success: true,
        });
        Ok(Some(SignedEnvelope::new(response, signature)))
    }

    /// Record an inbound interaction, deduplicating on its id
    pub fn record_interaction(&self, interaction: &Interaction) -> SwarmResult<DeliveryAck> {
        let is_new = self
            .storage
            .record_interaction_id(interaction.interaction_id())?;
        let _ = self.event_tx.send(SwarmEvent::InteractionReceived {
            kind: interaction.kind(),
            interaction_id: interaction.interaction_id().to_string(),
            duplicate: !is_new,
        });
        Ok(DeliveryAck {
            accepted: true,
            duplicate: !is_new,
        })
    }

    /// Serve a user profile from the handle directory and key cache
    pub fn lookup_profile(&self, handle: &str) -> SwarmResult<Option<RemoteProfile>> {
        let Some(entry) = self.handles.get(handle)? else {
            return Ok(None);
        };
        let public_key = self.storage.load_user_key(handle, &entry.domain)?;
        Ok(Some(RemoteProfile {
            handle: entry.handle,
            did: entry.did,
            domain: entry.domain,
            public_key,
            display_name: None,
        }))
    }

    /// Nudge a stale connection back to life via an out-of-band exchange
    pub async fn heal_connection(&self, did: &str, known_domain: Option<&str>) -> SwarmResult<bool> {
        let healed = self.healing.heal_connection(did, known_domain).await?;
        if healed {
            let _ = self.event_tx.send(SwarmEvent::ConnectionHealed {
                did: did.to_string(),
            });
        }
        Ok(healed)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Component access
    // ═══════════════════════════════════════════════════════════════════

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn handles(&self) -> &HandleDirectory {
        &self.handles
    }

    pub fn signing(&self) -> &SignatureEngine {
        &self.signing
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn gossip(&self) -> &GossipEngine {
        &self.gossip
    }

    pub fn interactions(&self) -> &InteractionDelivery {
        &self.interactions
    }

    pub fn healing(&self) -> &SelfHealing {
        &self.healing
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }
}

impl Drop for SwarmEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActorRef;
    use tempfile::tempdir;

    fn engine_for(domain: &str) -> (Arc<SwarmEngine>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let mut config = SwarmConfig::new(domain);
        config.shared_secret = Some("test-secret".to_string());
        let engine = SwarmEngine::open(config, dir.path()).unwrap();
        (engine, dir)
    }

    #[test]
    fn test_open_generates_identity_once() {
        let dir = tempdir().unwrap();
        let mut config = SwarmConfig::new("self.example");
        config.shared_secret = Some("test-secret".to_string());

        let first = SwarmEngine::open(config.clone(), dir.path())
            .unwrap()
            .self_info()
            .public_key;
        let second = SwarmEngine::open(config, dir.path())
            .unwrap()
            .self_info()
            .public_key;
        assert_eq!(first, second);
    }

    #[test]
    fn test_open_seeds_table_from_config() {
        let dir = tempdir().unwrap();
        let mut config = SwarmConfig::new("self.example");
        config.shared_secret = Some("test-secret".to_string());
        config.seeds = vec!["seed-a.example".to_string(), "seed-b.example".to_string()];

        let engine = SwarmEngine::open(config, dir.path()).unwrap();
        let seeds = engine.registry().get_seeds().unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].domain, "seed-a.example");
    }

    #[test]
    fn test_handle_announce_registers_sender() {
        let (engine, _dir) = engine_for("self.example");

        let announcement = SwarmAnnouncement {
            info: SwarmNodeInfo::for_domain("peer.example"),
            sent_at: crate::types::now_millis(),
        };
        let reply = engine.handle_announce(&announcement).unwrap();
        assert_eq!(reply.domain, "self.example");
        assert!(engine.registry().get_node("peer.example").unwrap().is_some());
    }

    #[test]
    fn test_handle_announce_ignores_own_domain() {
        let (engine, _dir) = engine_for("self.example");

        let announcement = SwarmAnnouncement {
            info: SwarmNodeInfo::for_domain("self.example"),
            sent_at: crate::types::now_millis(),
        };
        engine.handle_announce(&announcement).unwrap();
        assert!(engine.registry().get_node("self.example").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_handle_gossip_rejects_unverifiable_sender() {
        let (engine, _dir) = engine_for("self.example");

        let payload = GossipPayload {
            sender: "127.0.0.1:1".to_string(),
            announcement: SwarmNodeInfo::for_domain("127.0.0.1:1"),
            nodes: vec![SwarmNodeInfo::for_domain("smuggled.example")],
            handles: vec![],
            since: None,
            sent_at: crate::types::now_millis(),
        };
        let envelope = SignedEnvelope::new(payload, "00".repeat(64));

        let result = engine.handle_gossip(envelope).await.unwrap();
        assert!(result.is_none());
        // nothing merged from the rejected payload
        assert!(engine.registry().get_node("smuggled.example").unwrap().is_none());
    }

    #[test]
    fn test_record_interaction_dedups() {
        let (engine, _dir) = engine_for("self.example");
        let mut events = engine.subscribe();

        let interaction = Interaction::like(
            ActorRef {
                handle: "ada".to_string(),
                did: "did:swarm:a1".to_string(),
                domain: "peer.example".to_string(),
            },
            "https://self.example/posts/1",
        );

        let first = engine.record_interaction(&interaction).unwrap();
        assert!(first.accepted);
        assert!(!first.duplicate);

        let second = engine.record_interaction(&interaction).unwrap();
        assert!(second.duplicate);

        match events.try_recv().unwrap() {
            SwarmEvent::InteractionReceived { duplicate, .. } => assert!(!duplicate),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_lookup_profile_from_directory() {
        let (engine, _dir) = engine_for("self.example");

        assert!(engine.lookup_profile("ada").unwrap().is_none());

        engine
            .handles()
            .upsert_entries(&[crate::types::HandleEntry::new(
                "ada",
                "did:swarm:a1",
                "peer.example",
                100,
            )])
            .unwrap();

        let profile = engine.lookup_profile("ada").unwrap().unwrap();
        assert_eq!(profile.domain, "peer.example");
        assert_eq!(profile.did, "did:swarm:a1");
    }
}
