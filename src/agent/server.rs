use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use super::responder::Responder;
use super::tasks::{CancelError, TaskStore};
use crate::a2a::types::{AGENT_CARD_PATH, AgentCard, MessageSendParams, Task, TaskIdParams};
use crate::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

/// Shared state of the agent's HTTP handlers.
#[derive(Clone)]
pub struct AgentState {
    pub card: Arc<AgentCard>,
    pub tasks: TaskStore,
    pub responder: Arc<dyn Responder>,
}

impl std::fmt::Debug for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentState")
            .field("agent", &self.card.name)
            .field("tasks", &self.tasks.len())
            .field("responder", &self.responder)
            .finish()
    }
}

impl AgentState {
    pub fn new(card: AgentCard, responder: Arc<dyn Responder>) -> Self {
        Self {
            card: Arc::new(card),
            tasks: TaskStore::new(),
            responder,
        }
    }
}

/// Build the agent's HTTP API: the card and the JSON-RPC endpoint.
pub fn router(state: AgentState) -> Router {
    Router::new()
        .route(AGENT_CARD_PATH, get(agent_card))
        .route("/", post(rpc))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn agent_card(State(state): State<AgentState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

/// POST / - JSON-RPC dispatch. Protocol errors travel in the envelope, so
/// the HTTP status is always 200.
async fn rpc(State(state): State<AgentState>, body: Bytes) -> Json<JsonRpcResponse> {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(name: "agent.rpc.parse_error", error = %e, "Unparseable JSON-RPC body");
            return Json(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::parse_error(),
            ));
        }
    };

    let id = request.response_id();
    let outcome = match request.method.as_str() {
        "message/send" => send_message(&state, request.params),
        "tasks/get" => get_task(&state, request.params),
        "tasks/cancel" => cancel_task(&state, request.params),
        other => Err(JsonRpcError::method_not_found(other)),
    };

    Json(match outcome.and_then(|task| to_value(&task)) {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(error) => JsonRpcResponse::failure(id, error),
    })
}

fn send_message(state: &AgentState, params: Option<Value>) -> Result<Task, JsonRpcError> {
    let MessageSendParams { message } = parse_params(params)?;
    let text = message
        .first_text()
        .ok_or_else(|| JsonRpcError::invalid_params("Message has no text part"))?
        .to_string();

    let task = state.tasks.create(&message);
    info!(
        name: "agent.task.submitted",
        task_id = %task.id,
        "Task submitted"
    );

    let (tasks, responder, task_id) = (
        state.tasks.clone(),
        Arc::clone(&state.responder),
        task.id.clone(),
    );
    tokio::spawn(async move {
        tasks.set_working(&task_id);
        match responder.respond(&text).await {
            Ok(answer) => {
                tasks.complete(&task_id, &answer);
                info!(name: "agent.task.completed", task_id = %task_id, "Task completed");
            }
            Err(e) => {
                tasks.fail(&task_id, &e.to_string());
                warn!(name: "agent.task.failed", task_id = %task_id, error = %e, "Task failed");
            }
        }
    });

    Ok(task)
}

fn get_task(state: &AgentState, params: Option<Value>) -> Result<Task, JsonRpcError> {
    let TaskIdParams { id } = parse_params(params)?;
    state
        .tasks
        .get(&id)
        .ok_or_else(|| JsonRpcError::task_not_found(&id))
}

fn cancel_task(state: &AgentState, params: Option<Value>) -> Result<Task, JsonRpcError> {
    let TaskIdParams { id } = parse_params(params)?;
    state.tasks.cancel(&id).map_err(|e| match e {
        CancelError::NotFound => JsonRpcError::task_not_found(&id),
        CancelError::NotCancelable(_) => JsonRpcError::task_not_cancelable(&id),
    })
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {e}")))
}

fn to_value(task: &Task) -> Result<Value, JsonRpcError> {
    serde_json::to_value(task).map_err(|e| JsonRpcError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{KeywordResponder, build_card};
    use crate::tools::{ToolRegistry, builtin};
    use axum_test::TestServer;
    use serde_json::json;

    fn server() -> TestServer {
        let tools = ToolRegistry::with_native_tools(builtin::agent_tools());
        let card = build_card("Tool Agent", "http://localhost:9999", &tools);
        TestServer::new(router(AgentState::new(card, Arc::new(KeywordResponder)))).unwrap()
    }

    fn rpc_body(method: &str, params: Value) -> Value {
        json!({ "jsonrpc": "2.0", "id": "r1", "method": method, "params": params })
    }

    #[tokio::test]
    async fn test_serves_card() {
        let card: Value = server().get(AGENT_CARD_PATH).await.json();
        assert_eq!(card["name"], "Tool Agent");
        assert_eq!(card["capabilities"]["streaming"], false);
    }

    #[tokio::test]
    async fn test_send_then_poll_until_completed() {
        let server = server();
        let sent: Value = server
            .post("/")
            .json(&rpc_body(
                "message/send",
                json!({ "message": {
                    "role": "user",
                    "parts": [{ "kind": "text", "text": "Calculate 2 + 2" }],
                    "messageId": "m1",
                    "kind": "message"
                }}),
            ))
            .await
            .json();
        assert_eq!(sent["id"], "r1");
        assert_eq!(sent["result"]["kind"], "task");
        assert_eq!(sent["result"]["status"]["state"], "submitted");
        let task_id = sent["result"]["id"].as_str().unwrap().to_string();

        let mut state = String::new();
        for _ in 0..50 {
            let polled: Value = server
                .post("/")
                .json(&rpc_body("tasks/get", json!({ "id": task_id })))
                .await
                .json();
            state = polled["result"]["status"]["state"].as_str().unwrap().to_string();
            if state == "completed" {
                assert_eq!(
                    polled["result"]["artifacts"][0]["parts"][0]["text"],
                    "2 + 2 = 4"
                );
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(state, "completed");
    }

    #[tokio::test]
    async fn test_rpc_errors() {
        let server = server();

        let unknown: Value = server
            .post("/")
            .json(&rpc_body("tasks/get", json!({ "id": "nope" })))
            .await
            .json();
        assert_eq!(unknown["error"]["code"], -32001);

        let method: Value = server
            .post("/")
            .json(&rpc_body("tasks/resubscribe", json!({})))
            .await
            .json();
        assert_eq!(method["error"]["code"], -32601);

        let params: Value = server
            .post("/")
            .json(&rpc_body("message/send", json!({ "text": "hi" })))
            .await
            .json();
        assert_eq!(params["error"]["code"], -32602);

        let parse: Value = server.post("/").text("{oops").await.json();
        assert_eq!(parse["error"]["code"], -32700);
        assert_eq!(parse["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_cancel_unknown_task() {
        let server = server();
        let missing: Value = server
            .post("/")
            .json(&rpc_body("tasks/cancel", json!({ "id": "nope" })))
            .await
            .json();
        assert_eq!(missing["error"]["code"], -32001);
    }
}
