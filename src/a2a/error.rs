use thiserror::Error;

/// Errors raised while talking to an A2A agent.
#[derive(Error, Debug)]
pub enum A2aError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("agent returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON-RPC response carried neither result nor error")]
    MissingResult,
}

pub type Result<T> = std::result::Result<T, A2aError>;
