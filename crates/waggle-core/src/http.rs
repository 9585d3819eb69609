//! Inbound HTTP surface
//!
//! The endpoints peers talk to: announce, gossip, node-info, per-kind
//! interaction delivery, and public user profiles. Handlers validate at
//! the boundary and delegate to [`SwarmEngine`]; authentication failures
//! answer 401 and merge nothing.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::engine::SwarmEngine;
use crate::error::SwarmError;
use crate::types::wire::{ANNOUNCE_PATH, GOSSIP_PATH, NODE_INFO_PATH};
use crate::types::{GossipPayload, Interaction, InteractionKind, SignedEnvelope, SwarmAnnouncement};

/// Build the inbound swarm router
pub fn router(engine: Arc<SwarmEngine>) -> Router {
    Router::new()
        .route(NODE_INFO_PATH, get(node_info))
        .route(ANNOUNCE_PATH, post(announce))
        .route(GOSSIP_PATH, post(gossip))
        .route("/api/swarm/interactions/{kind}", post(interaction))
        .route("/api/swarm/users/{handle}", get(user_profile))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

fn internal_error(err: SwarmError) -> Response {
    error!(error = %err, "Swarm endpoint failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "internal error"})),
    )
        .into_response()
}

async fn node_info(State(engine): State<Arc<SwarmEngine>>) -> Response {
    Json(engine.self_info()).into_response()
}

async fn announce(
    State(engine): State<Arc<SwarmEngine>>,
    Json(announcement): Json<SwarmAnnouncement>,
) -> Response {
    match engine.handle_announce(&announcement) {
        Ok(info) => Json(info).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn gossip(
    State(engine): State<Arc<SwarmEngine>>,
    Json(envelope): Json<SignedEnvelope<GossipPayload>>,
) -> Response {
    match engine.handle_gossip(envelope).await {
        Ok(Some(response)) => Json(response).into_response(),
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "signature verification failed"})),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

async fn interaction(
    State(engine): State<Arc<SwarmEngine>>,
    Path(kind): Path<String>,
    Json(interaction): Json<Interaction>,
) -> Response {
    let Some(kind) = InteractionKind::parse(&kind) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "unknown interaction kind"})),
        )
            .into_response();
    };
    if interaction.kind() != kind {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "payload kind does not match endpoint"})),
        )
            .into_response();
    }

    match engine.record_interaction(&interaction) {
        Ok(ack) => Json(ack).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn user_profile(
    State(engine): State<Arc<SwarmEngine>>,
    Path(handle): Path<String>,
) -> Response {
    match engine.lookup_profile(&handle) {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "unknown handle"})),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}
