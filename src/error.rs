//! Errors returned by the registry HTTP API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Provide card_url or agent_url")]
    MissingTarget,

    #[error("Failed to fetch agent card: {0}")]
    CardFetch(String),

    #[error("Agent not found")]
    AgentNotFound,

    #[error("Agent not registered")]
    AgentNotRegistered,

    #[error("Failed to send message: {0}")]
    Relay(String),
}

impl RegistryError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingTarget | Self::CardFetch(_) => StatusCode::BAD_REQUEST,
            Self::AgentNotFound | Self::AgentNotRegistered => StatusCode::NOT_FOUND,
            Self::Relay(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
