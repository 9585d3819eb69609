//! Discovery
//!
//! Builds this node's self-announcement, pushes it to seed nodes on
//! startup, and probes arbitrary domains to pull them into the registry.
//! Peer unavailability is routine here: network failures become structured
//! outcomes, never errors.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{NodeStats, SwarmConfig};
use crate::error::SwarmResult;
use crate::identity::NodeKeypair;
use crate::registry::NodeRegistry;
use crate::types::wire::{ANNOUNCE_PATH, NODE_INFO_PATH};
use crate::types::{now_millis, SwarmAnnouncement, SwarmNodeInfo};

/// Outcome of announcing to a single node
#[derive(Debug, Clone)]
pub struct AnnounceOutcome {
    pub domain: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Aggregate outcome of the seed fan-out
#[derive(Debug, Clone, Default)]
pub struct SeedAnnounceReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

/// Outcome of probing a domain
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    pub domain: String,
    pub success: bool,
    /// True when the probe added a previously unknown node
    pub is_new: bool,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct Discovery {
    config: Arc<SwarmConfig>,
    client: reqwest::Client,
    registry: NodeRegistry,
    keypair: NodeKeypair,
    stats: NodeStats,
}

impl Discovery {
    pub fn new(
        config: Arc<SwarmConfig>,
        client: reqwest::Client,
        registry: NodeRegistry,
        keypair: NodeKeypair,
        stats: NodeStats,
    ) -> Self {
        Self {
            config,
            client,
            registry,
            keypair,
            stats,
        }
    }

    /// This node's public info, as served by the node-info endpoint and
    /// carried in every gossip payload.
    pub fn self_info(&self) -> SwarmNodeInfo {
        SwarmNodeInfo {
            domain: self.config.domain.clone(),
            name: Some(self.config.node_name.clone()),
            description: self.config.description.clone(),
            logo_url: self.config.logo_url.clone(),
            public_key: Some(self.keypair.public_key_hex()),
            software_version: Some(self.config.software_version.clone()),
            user_count: Some(self.stats.user_count()),
            post_count: Some(self.stats.post_count()),
            nsfw: Some(self.config.nsfw),
            capabilities: Some(self.config.capabilities.clone()),
        }
    }

    /// Assemble the unsigned self-announcement
    pub fn build_announcement(&self) -> SwarmAnnouncement {
        SwarmAnnouncement {
            info: self.self_info(),
            sent_at: now_millis(),
        }
    }

    /// POST our announcement to one peer.
    ///
    /// A 2xx response body is the peer's own info and is merged into the
    /// registry; any failure marks the peer and is reported as a value.
    pub async fn announce_to_node(&self, domain: &str) -> SwarmResult<AnnounceOutcome> {
        let url = self.config.endpoint_url(domain, ANNOUNCE_PATH);
        let announcement = self.build_announcement();

        let result = async {
            let response = self
                .client
                .post(&url)
                .timeout(self.config.fetch_timeout)
                .json(&announcement)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| e.to_string())?;
            response
                .json::<SwarmNodeInfo>()
                .await
                .map_err(|e| e.to_string())
        }
        .await;

        match result {
            Ok(mut info) => {
                // key the record by the domain we actually contacted
                info.domain = domain.to_string();
                self.registry.upsert_node(&info, None)?;
                self.registry.mark_success(domain)?;
                info!(domain, "Announced to swarm node");
                Ok(AnnounceOutcome {
                    domain: domain.to_string(),
                    success: true,
                    error: None,
                })
            }
            Err(error) => {
                self.registry.mark_failure(domain)?;
                debug!(domain, %error, "Announce failed");
                Ok(AnnounceOutcome {
                    domain: domain.to_string(),
                    success: false,
                    error: Some(error),
                })
            }
        }
    }

    /// Fan our announcement out to every enabled seed except ourselves.
    ///
    /// One seed being down never blocks bootstrapping through another:
    /// every seed is attempted and the outcomes are collected.
    pub async fn announce_to_seeds(&self) -> SwarmResult<SeedAnnounceReport> {
        let mut report = SeedAnnounceReport::default();
        for seed in self.registry.get_seeds()? {
            if self.config.is_self(&seed.domain) {
                continue;
            }
            let outcome = self.announce_to_node(&seed.domain).await?;
            self.registry.record_seed_contact(&seed.domain, outcome.success)?;
            if outcome.success {
                report.succeeded.push(outcome.domain);
            } else {
                report.failed.push(outcome.domain);
            }
        }
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Seed announcement finished"
        );
        Ok(report)
    }

    /// Probe a domain's public node-info endpoint
    pub async fn fetch_node_info(&self, domain: &str) -> Option<SwarmNodeInfo> {
        match self.fetch_info(domain).await {
            Ok(info) => Some(info),
            Err(error) => {
                debug!(domain, %error, "Node info probe failed");
                None
            }
        }
    }

    /// Probe a domain and, if reachable, upsert it into the registry.
    ///
    /// Refuses to discover the local domain.
    pub async fn discover_node(&self, domain: &str, via: Option<&str>) -> SwarmResult<DiscoveryOutcome> {
        if self.config.is_self(domain) {
            return Ok(DiscoveryOutcome {
                domain: domain.to_string(),
                success: false,
                is_new: false,
                error: Some("refusing to discover the local domain".to_string()),
            });
        }

        match self.fetch_info(domain).await {
            Ok(info) => {
                let outcome = self.registry.upsert_node(&info, via)?;
                info!(domain, is_new = outcome.is_new, "Discovered swarm node");
                Ok(DiscoveryOutcome {
                    domain: domain.to_string(),
                    success: true,
                    is_new: outcome.is_new,
                    error: None,
                })
            }
            Err(error) => {
                warn!(domain, %error, "Discovery probe failed");
                Ok(DiscoveryOutcome {
                    domain: domain.to_string(),
                    success: false,
                    is_new: false,
                    error: Some(error),
                })
            }
        }
    }

    async fn fetch_info(&self, domain: &str) -> Result<SwarmNodeInfo, String> {
        let url = self.config.endpoint_url(domain, NODE_INFO_PATH);
        let response = self
            .client
            .get(&url)
            .timeout(self.config.fetch_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        let mut info = response
            .json::<SwarmNodeInfo>()
            .await
            .map_err(|e| e.to_string())?;
        info.domain = domain.to_string();
        Ok(info)
    }
}
