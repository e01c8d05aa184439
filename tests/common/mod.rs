#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use agent_lab::a2a::PollPolicy;
use agent_lab::a2a::types::AGENT_CARD_PATH;
use agent_lab::agent::{AgentState, KeywordResponder, Responder, build_card, router};
use agent_lab::registry::RegistryState;
use agent_lab::tools::{ToolRegistry, builtin};
use async_trait::async_trait;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Bind a loopback port, returning the listener and its base URL.
pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    (listener, base_url)
}

pub fn serve(listener: TcpListener, app: Router) {
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
}

/// Serve a tool agent on a loopback port and return its base URL.
pub async fn spawn_agent(responder: Arc<dyn Responder>) -> String {
    let (listener, base_url) = bind().await;

    let tools = ToolRegistry::with_native_tools(builtin::agent_tools());
    let card = build_card("Tool Agent", &base_url, &tools);
    serve(listener, router(AgentState::new(card, responder)));
    base_url
}

/// Agent whose `message/send` answers with `result` directly instead of a
/// task.
pub async fn spawn_message_agent(result: Value) -> String {
    let (listener, base_url) = bind().await;

    let card = json!({ "name": "Direct Agent", "url": base_url });
    let app = Router::new()
        .route(AGENT_CARD_PATH, get(move || async move { Json(card) }))
        .route(
            "/",
            post(move |Json(request): Json<Value>| async move {
                Json(json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }))
            }),
        );
    serve(listener, app);
    base_url
}

/// Server that answers its card path with a plain-text 200.
pub async fn spawn_plain_card_server() -> String {
    let (listener, base_url) = bind().await;
    serve(
        listener,
        Router::new().route(AGENT_CARD_PATH, get(|| async { "alive, not json" })),
    );
    base_url
}

pub async fn spawn_keyword_agent() -> String {
    spawn_agent(Arc::new(KeywordResponder)).await
}

/// Registry state with fast polling.
pub fn registry_state(poll_attempts: u32) -> RegistryState {
    RegistryState::new(
        20,
        Duration::from_secs(2),
        Duration::from_secs(5),
        PollPolicy {
            max_attempts: poll_attempts,
            interval: Duration::from_millis(20),
        },
    )
    .unwrap()
}

/// Never answers within a test's patience.
#[derive(Debug)]
pub struct Sleepy;

#[async_trait]
impl Responder for Sleepy {
    async fn respond(&self, _text: &str) -> anyhow::Result<String> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("too late".into())
    }
}

/// Always fails.
#[derive(Debug)]
pub struct Broken;

#[async_trait]
impl Responder for Broken {
    async fn respond(&self, _text: &str) -> anyhow::Result<String> {
        anyhow::bail!("model unreachable")
    }
}

pub fn encode(agent_url: &str) -> String {
    url::form_urlencoded::byte_serialize(agent_url.as_bytes()).collect()
}
