use thiserror::Error;

/// Crate-level error for backend calls, config loading, and the web UI
/// server. Network failures are logged and surfaced; nothing retries.
#[derive(Debug, Error)]
pub enum WorkbenchError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed chat reply: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
