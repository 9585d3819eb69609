//! Gossip engine
//!
//! Epidemic propagation of the node registry and handle directory. Every
//! exchange is full-duplex: one HTTP round trip updates both sides. An
//! attempt moves `Idle → Sending → {Merged, Failed}`; the failed path
//! always runs `mark_failure` + `log_sync`, the merged path `mark_success`
//! + `log_sync`, and no attempt blocks the progress of another.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::SwarmConfig;
use crate::discovery::Discovery;
use crate::error::SwarmResult;
use crate::handles::HandleDirectory;
use crate::identity::NodeKeypair;
use crate::registry::NodeRegistry;
use crate::signing::SignatureEngine;
use crate::types::wire::GOSSIP_PATH;
use crate::types::{
    now_millis, GossipPayload, GossipResponse, HandleEntry, SignedEnvelope, SwarmNodeInfo,
    SyncDirection, SyncLogEntry,
};

/// Outcome of one gossip exchange with a peer
#[derive(Debug, Clone)]
pub struct GossipOutcome {
    pub domain: String,
    pub success: bool,
    pub error: Option<String>,
    pub nodes_received: usize,
    pub handles_received: usize,
    pub duration_ms: u64,
}

/// Aggregate totals of one scheduled round
#[derive(Debug, Clone, Copy, Default)]
pub struct GossipRoundReport {
    pub peers_contacted: usize,
    pub peers_succeeded: usize,
    pub nodes_received: usize,
    pub handles_received: usize,
}

#[derive(Clone)]
pub struct GossipEngine {
    config: Arc<SwarmConfig>,
    client: reqwest::Client,
    registry: NodeRegistry,
    handles: HandleDirectory,
    signing: SignatureEngine,
    discovery: Discovery,
    keypair: NodeKeypair,
}

impl GossipEngine {
    pub fn new(
        config: Arc<SwarmConfig>,
        client: reqwest::Client,
        registry: NodeRegistry,
        handles: HandleDirectory,
        signing: SignatureEngine,
        discovery: Discovery,
        keypair: NodeKeypair,
    ) -> Self {
        Self {
            config,
            client,
            registry,
            handles,
            signing,
            discovery,
            keypair,
        }
    }

    /// Build an outbound payload: our own entry plus a bounded slice of the
    /// registry and handle directory, optionally restricted to state
    /// updated after `since`.
    pub fn build_payload(&self, since: Option<i64>) -> SwarmResult<GossipPayload> {
        let nodes = match since {
            Some(ts) => self.registry.list_since(ts, self.config.max_nodes_per_gossip)?,
            None => self.registry.list_active(self.config.max_nodes_per_gossip)?,
        };
        let handles = self
            .handles
            .list_since(since.unwrap_or(0), self.config.max_handles_per_gossip)?;

        Ok(GossipPayload {
            sender: self.config.domain.clone(),
            announcement: self.discovery.self_info(),
            nodes: nodes.iter().map(|n| n.to_info()).collect(),
            handles,
            since,
            sent_at: now_millis(),
        })
    }

    /// Merge an inbound payload and build the reply half of the exchange.
    ///
    /// The caller (HTTP layer) has already authenticated the payload.
    pub fn process_inbound(&self, payload: &GossipPayload) -> SwarmResult<GossipResponse> {
        let started = Instant::now();
        let (nodes_received, handles_received) = self.merge_remote_state(payload.sender.as_str(), &payload.announcement, &payload.nodes, &payload.handles)?;

        let reply = self.build_payload(payload.since)?;
        let response = GossipResponse {
            sender: self.config.domain.clone(),
            announcement: reply.announcement,
            nodes: reply.nodes,
            handles: reply.handles,
            nodes_received: nodes_received as u32,
            handles_received: handles_received as u32,
            sent_at: now_millis(),
        };

        self.registry.log_sync(&SyncLogEntry {
            remote_domain: payload.sender.clone(),
            direction: SyncDirection::Pull,
            nodes_sent: response.nodes.len() as u32,
            nodes_received: nodes_received as u32,
            handles_sent: response.handles.len() as u32,
            handles_received: handles_received as u32,
            success: true,
            error: None,
            duration_ms: started.elapsed().as_millis() as u64,
            created_at: now_millis(),
        })?;

        debug!(
            from = %payload.sender,
            nodes_received,
            handles_received,
            "Processed inbound gossip"
        );
        Ok(response)
    }

    /// Exchange state with one peer: send our payload, authenticate the
    /// response, merge it, and record the outcome either way.
    pub async fn gossip_to_node(
        &self,
        domain: &str,
        since: Option<i64>,
    ) -> SwarmResult<GossipOutcome> {
        let started = Instant::now();
        let payload = self.build_payload(since)?;
        let nodes_sent = payload.nodes.len() as u32;
        let handles_sent = payload.handles.len() as u32;

        let signature = SignatureEngine::sign(&payload, &self.keypair)?;
        let envelope = SignedEnvelope::new(payload, signature);

        let exchanged = self.exchange(domain, &envelope).await;
        let verified = match exchanged {
            Ok(response) => {
                if self
                    .signing
                    .verify_remote(&response.payload, &response.signature, domain)
                    .await
                {
                    Ok(response.payload)
                } else {
                    Err("response signature verification failed".to_string())
                }
            }
            Err(error) => Err(error),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        match verified {
            Ok(response) => {
                let (nodes_received, handles_received) = self.merge_remote_state(
                    domain,
                    &response.announcement,
                    &response.nodes,
                    &response.handles,
                )?;
                self.registry.mark_success(domain)?;
                self.registry.log_sync(&SyncLogEntry {
                    remote_domain: domain.to_string(),
                    direction: SyncDirection::Push,
                    nodes_sent,
                    nodes_received: nodes_received as u32,
                    handles_sent,
                    handles_received: handles_received as u32,
                    success: true,
                    error: None,
                    duration_ms,
                    created_at: now_millis(),
                })?;
                debug!(domain, nodes_received, handles_received, "Gossip exchange merged");
                Ok(GossipOutcome {
                    domain: domain.to_string(),
                    success: true,
                    error: None,
                    nodes_received,
                    handles_received,
                    duration_ms,
                })
            }
            Err(error) => {
                self.registry.mark_failure(domain)?;
                self.registry.log_sync(&SyncLogEntry {
                    remote_domain: domain.to_string(),
                    direction: SyncDirection::Push,
                    nodes_sent,
                    nodes_received: 0,
                    handles_sent,
                    handles_received: 0,
                    success: false,
                    error: Some(error.clone()),
                    duration_ms,
                    created_at: now_millis(),
                })?;
                debug!(domain, %error, "Gossip exchange failed");
                Ok(GossipOutcome {
                    domain: domain.to_string(),
                    success: false,
                    error: Some(error),
                    nodes_received: 0,
                    handles_received: 0,
                    duration_ms,
                })
            }
        }
    }

    /// Run one gossip round: pick a trust-weighted random subset of peers
    /// and exchange with each sequentially. Per-peer outcomes are
    /// independent; one failure never stops the rest of the round.
    pub async fn run_round(&self) -> SwarmResult<GossipRoundReport> {
        let peers = self.registry.list_for_gossip(self.config.gossip_fanout)?;
        let mut report = GossipRoundReport::default();

        for peer in peers {
            report.peers_contacted += 1;
            match self.gossip_to_node(&peer.domain, peer.last_sync_at).await {
                Ok(outcome) if outcome.success => {
                    report.peers_succeeded += 1;
                    report.nodes_received += outcome.nodes_received;
                    report.handles_received += outcome.handles_received;
                }
                Ok(_) => {}
                Err(e) => {
                    // persistence trouble mid-round: the failure is already
                    // logged; keep attempting the remaining peers
                    warn!(domain = %peer.domain, error = %e, "Gossip attempt errored");
                }
            }
        }

        info!(
            contacted = report.peers_contacted,
            succeeded = report.peers_succeeded,
            nodes = report.nodes_received,
            handles = report.handles_received,
            "Gossip round completed"
        );
        Ok(report)
    }

    /// Merge a peer's announcement, node list, and handle deltas. The
    /// peer's own entry is merged like any other; our own domain is
    /// excluded by the batch upsert. Returns wire counts.
    fn merge_remote_state(
        &self,
        from: &str,
        announcement: &SwarmNodeInfo,
        nodes: &[SwarmNodeInfo],
        handles: &[HandleEntry],
    ) -> SwarmResult<(usize, usize)> {
        let mut incoming = Vec::with_capacity(nodes.len() + 1);
        incoming.push(announcement.clone());
        incoming.extend_from_slice(nodes);
        self.registry.upsert_batch(&incoming, Some(from))?;
        self.handles.upsert_entries(handles)?;
        Ok((nodes.len(), handles.len()))
    }

    async fn exchange(
        &self,
        domain: &str,
        envelope: &SignedEnvelope<GossipPayload>,
    ) -> Result<SignedEnvelope<GossipResponse>, String> {
        let url = self.config.endpoint_url(domain, GOSSIP_PATH);
        let response = self
            .client
            .post(&url)
            .timeout(self.config.gossip_timeout)
            .json(envelope)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        response
            .json::<SignedEnvelope<GossipResponse>>()
            .await
            .map_err(|e| e.to_string())
    }
}
