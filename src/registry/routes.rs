use axum::{
    Json, Router,
    extract::{Path, State},
    response::Html,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use super::{AgentRecord, RegisterRequest, RegistryState, dashboard, relay_message};
use crate::error::RegistryError;

type ApiResult = Result<Json<Value>, RegistryError>;

/// Build the registry's HTTP API.
pub fn router(state: RegistryState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/agents", get(list_agents))
        .route("/agents/{*agent_url}", get(agent_card).delete(unregister))
        .route("/history", get(history))
        .route("/send-message", post(send_message))
        .route("/.well-known/agents/index.json", get(agents_index))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// POST /register - Fetch an agent's card and add or refresh its record.
async fn register(
    State(state): State<RegistryState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult {
    let card_url = req
        .resolved_card_url()
        .ok_or(RegistryError::MissingTarget)?;

    let card = state.fetch_card(&card_url).await.map_err(|e| {
        warn!(
            name: "registry.register.card_failed",
            card_url = %card_url,
            error = %e,
            "Agent card fetch failed"
        );
        RegistryError::CardFetch(e.to_string())
    })?;

    let record = AgentRecord::from_card(card, &card_url, &req, Utc::now());
    let (name, url) = (record.name.clone(), record.url.clone());
    let is_new = state.directory.upsert(record);

    info!(
        name: "registry.agent.registered",
        agent = %name,
        agent_url = %url,
        is_new,
        "Agent registered"
    );

    Ok(Json(json!({ "status": "registered", "name": name, "url": url })))
}

/// DELETE /agents/{agent_url} - Remove an agent.
async fn unregister(
    State(state): State<RegistryState>,
    Path(agent_url): Path<String>,
) -> ApiResult {
    let record = state
        .directory
        .remove(&agent_url)
        .ok_or(RegistryError::AgentNotFound)?;

    info!(
        name: "registry.agent.unregistered",
        agent = %record.name,
        agent_url = %agent_url,
        "Agent unregistered"
    );
    Ok(Json(json!({ "status": "unregistered" })))
}

/// GET /agents - All registered agents.
async fn list_agents(State(state): State<RegistryState>) -> Json<Value> {
    Json(json!({ "agents": state.directory.list() }))
}

/// GET /agents/{agent_url}/card - Stored card of an agent.
async fn agent_card(
    State(state): State<RegistryState>,
    Path(rest): Path<String>,
) -> ApiResult {
    let agent_url = rest
        .strip_suffix("/card")
        .ok_or(RegistryError::AgentNotFound)?;
    state
        .directory
        .get(agent_url)
        .map(|record| Json(record.card))
        .ok_or(RegistryError::AgentNotFound)
}

/// GET /history - Relayed messages, newest first.
async fn history(State(state): State<RegistryState>) -> Json<Value> {
    Json(json!({ "history": state.history.snapshot() }))
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    agent_url: String,
    message: String,
}

/// POST /send-message - Relay a message to a registered agent.
async fn send_message(
    State(state): State<RegistryState>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult {
    let response = relay_message(&state, &req.agent_url, &req.message).await?;
    Ok(Json(json!({ "response": response })))
}

/// GET /.well-known/agents/index.json - Discovery index.
async fn agents_index(State(state): State<RegistryState>) -> Json<Value> {
    let agents: Vec<Value> = state
        .directory
        .list()
        .into_iter()
        .map(|a| json!({ "name": a.name, "url": a.url, "card_url": a.card_url }))
        .collect();
    Json(json!({ "agents": agents }))
}

/// GET /health - Liveness probe.
async fn health(State(state): State<RegistryState>) -> Json<Value> {
    Json(json!({ "status": "ok", "agents": state.directory.len() }))
}

/// GET / - HTML dashboard.
async fn dashboard_handler(State(state): State<RegistryState>) -> Html<String> {
    Html(dashboard::render(
        &state.directory.list(),
        &state.history.snapshot(),
        state.history.capacity(),
    ))
}
