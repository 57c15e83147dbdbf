use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::debug;

use benor_common::{ConsensusError, NodeState};
use benor_consensus::{ConsensusNode, IngestOutcome, NodeStatus};
use benor_p2p::MessageRequest;

const REFUSED: &str = "Node is killed or has decided";

#[derive(Clone)]
pub struct AppState {
    pub node: Arc<ConsensusNode>,
}

impl AppState {
    pub fn new(node: Arc<ConsensusNode>) -> Self {
        Self { node }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status_api))
        .route("/getState", get(get_state_api))
        .route("/message", post(message_api))
        .route("/start", get(start_api))
        .route("/stop", get(stop_api))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
}

async fn status_api(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.node.status() {
        NodeStatus::Live => (StatusCode::OK, NodeStatus::Live.as_str()),
        NodeStatus::Faulty => (StatusCode::INTERNAL_SERVER_ERROR, NodeStatus::Faulty.as_str()),
    }
}

async fn get_state_api(State(state): State<AppState>) -> Json<NodeState> {
    Json(state.node.get_state().await)
}

async fn message_api(State(state): State<AppState>, body: Bytes) -> (StatusCode, &'static str) {
    let n = state.node.config().n;
    let parsed = serde_json::from_slice::<serde_json::Value>(&body)
        .map_err(|e| ConsensusError::InvalidMessage(e.to_string()))
        .and_then(|json| MessageRequest::parse(json, n));

    let msg = match parsed {
        Ok(msg) => msg,
        Err(e) => {
            // Malformed payloads get the same answer a valid one would, minus the ingestion.
            if state.node.get_state().await.is_terminal() {
                return (StatusCode::INTERNAL_SERVER_ERROR, REFUSED);
            }
            if state.node.is_faulty() {
                return (StatusCode::OK, "Message received by faulty node");
            }
            debug!("{} dropped payload: {}", state.node.id(), e);
            return (StatusCode::OK, "Message dropped");
        }
    };

    match state.node.receive(msg).await {
        Ok(IngestOutcome::FaultySink) => (StatusCode::OK, "Message received by faulty node"),
        Ok(_) => (StatusCode::OK, "Message received"),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, REFUSED),
    }
}

async fn start_api(State(state): State<AppState>) -> (StatusCode, String) {
    match state.node.start().await {
        Ok(outcome) => (StatusCode::OK, format!("Consensus finished: {outcome}")),
        Err(e) => {
            debug!("{} refused to start: {}", state.node.id(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Node is faulty or killed".to_string())
        }
    }
}

async fn stop_api(State(state): State<AppState>) -> (StatusCode, &'static str) {
    state.node.stop().await;
    (StatusCode::OK, "Consensus stopped")
}
