//! End-to-end exchanges between real nodes
//!
//! Each test node is a full SwarmEngine serving its inbound endpoints on
//! an ephemeral loopback port; its "domain" is the socket address.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::task::JoinHandle;

use waggle_core::http;
use waggle_core::types::{ActorRef, HandleEntry, Interaction, SwarmNodeInfo};
use waggle_core::{SwarmConfig, SwarmEngine, SwarmEvent};

struct TestNode {
    engine: Arc<SwarmEngine>,
    domain: String,
    server: JoinHandle<()>,
    _dir: TempDir,
}

impl Drop for TestNode {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn spawn_node(name: &str) -> TestNode {
    let dir = TempDir::new().unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let domain = listener.local_addr().unwrap().to_string();

    let mut config = SwarmConfig::new(&domain);
    config.scheme = "http".to_string();
    config.node_name = name.to_string();
    config.shared_secret = Some("integration-secret".to_string());
    config.gossip_timeout = Duration::from_secs(2);
    config.fetch_timeout = Duration::from_secs(2);
    config.interaction_timeout = Duration::from_secs(2);

    let engine = SwarmEngine::open(config, dir.path()).unwrap();
    let app = http::router(engine.clone());
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestNode {
        engine,
        domain,
        server,
        _dir: dir,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn announce_exchanges_node_info_both_ways() {
    let a = spawn_node("node-a").await;
    let b = spawn_node("node-b").await;

    let outcome = a.engine.discovery().announce_to_node(&b.domain).await.unwrap();
    assert!(outcome.success, "announce failed: {:?}", outcome.error);

    // A merged B's reply and marked the contact successful
    let b_seen_by_a = a.engine.registry().get_node(&b.domain).unwrap().unwrap();
    assert_eq!(b_seen_by_a.name, Some("node-b".to_string()));
    assert!(b_seen_by_a.public_key.is_some());
    assert_eq!(b_seen_by_a.trust_score, 51);
    assert!(b_seen_by_a.last_sync_at.is_some());

    // B registered the announcing node
    let a_seen_by_b = b.engine.registry().get_node(&a.domain).unwrap().unwrap();
    assert_eq!(a_seen_by_b.name, Some("node-a".to_string()));
    assert_eq!(a_seen_by_b.trust_score, 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gossip_exchange_converges_both_sides() {
    let a = spawn_node("node-a").await;
    let b = spawn_node("node-b").await;

    // B knows a handle and a third node that A has never heard of
    b.engine
        .handles()
        .upsert_entries(&[HandleEntry::new("ada", "did:swarm:a1", &b.domain, 100)])
        .unwrap();
    b.engine
        .registry()
        .upsert_node(&SwarmNodeInfo::for_domain("third.example"), None)
        .unwrap();

    let outcome = a.engine.gossip().gossip_to_node(&b.domain, None).await.unwrap();
    assert!(outcome.success, "gossip failed: {:?}", outcome.error);
    assert!(outcome.handles_received >= 1);

    // A learned B, the third node, and the handle
    assert!(a.engine.registry().get_node(&b.domain).unwrap().is_some());
    assert!(a.engine.registry().get_node("third.example").unwrap().is_some());
    assert_eq!(a.engine.handles().get("ada").unwrap().unwrap().did, "did:swarm:a1");

    // B learned A from the same round trip
    assert!(b.engine.registry().get_node(&a.domain).unwrap().is_some());

    // both sides wrote their sync log halves
    let a_log = a.engine.registry().recent_sync_log(5).unwrap();
    assert!(a_log.iter().any(|e| e.success && e.remote_domain == b.domain));
    let b_log = b.engine.registry().recent_sync_log(5).unwrap();
    assert!(b_log.iter().any(|e| e.success && e.remote_domain == a.domain));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gossip_with_tampered_signature_is_rejected() {
    let a = spawn_node("node-a").await;
    let b = spawn_node("node-b").await;

    let payload = {
        let mut p = a.engine.gossip().build_payload(None).unwrap();
        p.nodes.push(SwarmNodeInfo::for_domain("smuggled.example"));
        p
    };
    let envelope = waggle_core::SignedEnvelope::new(payload, "00".repeat(64));

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/api/swarm/gossip", b.domain))
        .json(&envelope)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // the rejected payload merged nothing
    assert!(b.engine.registry().get_node("smuggled.example").unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn interaction_delivery_and_receiver_side_dedup() {
    let a = spawn_node("node-a").await;
    let b = spawn_node("node-b").await;

    // gate: unknown domains are not swarm targets
    assert!(!a.engine.interactions().is_swarm_node(&b.domain).unwrap());
    a.engine.discovery().announce_to_node(&b.domain).await.unwrap();
    assert!(a.engine.interactions().is_swarm_node(&b.domain).unwrap());

    let mut b_events = b.engine.subscribe();
    let like = Interaction::like(
        ActorRef {
            handle: "ada".to_string(),
            did: "did:swarm:a1".to_string(),
            domain: a.domain.clone(),
        },
        format!("http://{}/posts/42", b.domain),
    );

    let outcome = a.engine.interactions().deliver(&b.domain, &like).await.unwrap();
    assert!(outcome.success);

    match b_events.recv().await.unwrap() {
        SwarmEvent::InteractionReceived { duplicate, interaction_id, .. } => {
            assert!(!duplicate);
            assert_eq!(interaction_id, like.interaction_id());
        }
        other => panic!("unexpected event {other:?}"),
    }

    // at-least-once redelivery: accepted again, flagged as duplicate
    let outcome = a.engine.interactions().deliver(&b.domain, &like).await.unwrap();
    assert!(outcome.success);
    match b_events.recv().await.unwrap() {
        SwarmEvent::InteractionReceived { duplicate, .. } => assert!(duplicate),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn self_healing_refreshes_handles() {
    let a = spawn_node("node-a").await;
    let b = spawn_node("node-b").await;

    b.engine
        .handles()
        .upsert_entries(&[HandleEntry::new("ada", "did:swarm:a1", &b.domain, 100)])
        .unwrap();

    let healed = a
        .engine
        .heal_connection("did:swarm:a1", Some(&b.domain))
        .await
        .unwrap();
    assert!(healed);
    assert_eq!(a.engine.handles().get("ada").unwrap().unwrap().domain, b.domain);

    // a second heal can now resolve the domain from the directory alone
    let healed_again = a.engine.heal_connection("did:swarm:a1", None).await.unwrap();
    assert!(healed_again);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn discover_node_pulls_remote_info() {
    let a = spawn_node("node-a").await;
    let b = spawn_node("node-b").await;

    let outcome = a.engine.discovery().discover_node(&b.domain, None).await.unwrap();
    assert!(outcome.success);
    assert!(outcome.is_new);

    let node = a.engine.registry().get_node(&b.domain).unwrap().unwrap();
    assert_eq!(node.name, Some("node-b".to_string()));
    assert!(node.public_key.is_some());

    // probing again is an update, not an insert
    let outcome = a.engine.discovery().discover_node(&b.domain, None).await.unwrap();
    assert!(outcome.success);
    assert!(!outcome.is_new);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn seed_fanout_survives_a_dead_seed() {
    let b = spawn_node("node-b").await;

    let dir = TempDir::new().unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let domain = listener.local_addr().unwrap().to_string();

    let mut config = SwarmConfig::new(&domain);
    config.scheme = "http".to_string();
    config.shared_secret = Some("integration-secret".to_string());
    config.fetch_timeout = Duration::from_secs(2);
    // one live seed, one that refuses connections
    config.seeds = vec![b.domain.clone(), "127.0.0.1:1".to_string()];

    let engine = SwarmEngine::open(config, dir.path()).unwrap();
    let app = http::router(engine.clone());
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let report = engine.discovery().announce_to_seeds().await.unwrap();
    assert_eq!(report.succeeded, vec![b.domain.clone()]);
    assert_eq!(report.failed, vec!["127.0.0.1:1".to_string()]);

    // seed bookkeeping recorded both outcomes
    let seeds = engine.registry().get_seeds().unwrap();
    let live = seeds.iter().find(|s| s.domain == b.domain).unwrap();
    assert_eq!(live.consecutive_failures, 0);
    assert!(live.last_contact_at.is_some());
    let dead = seeds.iter().find(|s| s.domain == "127.0.0.1:1").unwrap();
    assert_eq!(dead.consecutive_failures, 1);

    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gossip_round_attempts_every_selected_peer() {
    let a = spawn_node("node-a").await;
    let b = spawn_node("node-b").await;
    let c = spawn_node("node-c").await;

    // two live peers plus one that refuses connections, all eligible
    a.engine.discovery().announce_to_node(&b.domain).await.unwrap();
    a.engine.discovery().announce_to_node(&c.domain).await.unwrap();
    a.engine
        .registry()
        .upsert_node(&SwarmNodeInfo::for_domain("127.0.0.1:1"), None)
        .unwrap();

    let report = a.engine.gossip().run_round().await.unwrap();
    assert_eq!(report.peers_contacted, 3);
    assert_eq!(report.peers_succeeded, 2);

    // the dead peer's failure was recorded without stopping the round
    let dead = a.engine.registry().get_node("127.0.0.1:1").unwrap().unwrap();
    assert_eq!(dead.consecutive_failures, 1);
    assert_eq!(dead.trust_score, 45);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn user_scoped_verification_fetches_and_caches_key() {
    let a = spawn_node("node-a").await;
    let b = spawn_node("node-b").await;

    // "ada" lives on B with a published key; B serves her profile
    let user_key = waggle_core::NodeKeypair::generate();
    b.engine
        .handles()
        .upsert_entries(&[HandleEntry::new("ada", "did:swarm:a1", &b.domain, 100)])
        .unwrap();
    b.engine
        .healing()
        .update_from_profile(&waggle_core::types::RemoteProfile {
            handle: "ada".to_string(),
            did: "did:swarm:a1".to_string(),
            domain: b.domain.clone(),
            public_key: Some(user_key.public_key_hex()),
            display_name: None,
        })
        .unwrap();

    let payload = serde_json::json!({"text": "hello swarm"});
    let signature = waggle_core::SignatureEngine::sign(&payload, &user_key).unwrap();

    // A has no cached key: it must fetch the profile from B
    assert!(
        a.engine
            .signing()
            .verify_user_scoped(&payload, &signature, "ada", &b.domain)
            .await
    );

    // tampered payload still fails
    assert!(
        !a.engine
            .signing()
            .verify_user_scoped(&serde_json::json!({"text": "bye"}), &signature, "ada", &b.domain)
            .await
    );
}
