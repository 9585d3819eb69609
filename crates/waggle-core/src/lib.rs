//! Waggle Core Library
//!
//! The swarm membership and gossip subsystem of a federated
//! social-networking node: peers discover each other, exchange knowledge
//! of the network's membership and the global handle → identity mapping,
//! authenticate every gossip exchange, and track peer health without a
//! central coordinator.
//!
//! ## Overview
//!
//! - **Eventually consistent**: state converges through periodic
//!   trust-weighted gossip rounds, not transactions
//! - **Fail closed on auth**: unauthenticated payloads are always rejected
//! - **Self-healing**: stale peer state recovers through retries and
//!   out-of-band exchanges, never manual repair
//!
//! ## Quick Start
//!
//! ```ignore
//! use waggle_core::{SwarmConfig, SwarmEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = SwarmConfig::new("social.example.org");
//!     config.shared_secret = Some(std::env::var("WAGGLE_SECRET")?);
//!
//!     let engine = SwarmEngine::open(config, "~/.waggle/data")?;
//!     engine.start().await;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, waggle_core::http::router(engine)).await?;
//!     Ok(())
//! }
//! ```

pub mod canonical;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod events;
pub mod gossip;
pub mod handles;
pub mod healing;
pub mod http;
pub mod identity;
pub mod interaction;
pub mod registry;
pub mod signing;
pub mod storage;
pub mod types;

// Re-exports
pub use config::{NodeStats, SwarmConfig};
pub use discovery::{AnnounceOutcome, Discovery, DiscoveryOutcome, SeedAnnounceReport};
pub use engine::SwarmEngine;
pub use error::{SwarmError, SwarmResult};
pub use events::SwarmEvent;
pub use gossip::{GossipEngine, GossipOutcome, GossipRoundReport};
pub use handles::HandleDirectory;
pub use healing::SelfHealing;
pub use identity::{KeypairStore, NodeKeypair};
pub use interaction::{DeliveryOutcome, InteractionDelivery};
pub use registry::{NodeRegistry, UpsertOutcome};
pub use signing::SignatureEngine;
pub use storage::Storage;
pub use types::*;
