use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlocksiftError>;

/// Closed error-kind set for the pipeline. Callers match on kind, never on
/// message text. Benign timeouts are swallowed at the call site that
/// tolerates them; everything that reaches the orchestrator is fatal.
#[derive(Error, Debug)]
pub enum FlocksiftError {
    #[error("timed out waiting for {what}")]
    Timeout { what: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl FlocksiftError {
    pub fn timeout(what: impl Into<String>) -> Self {
        Self::Timeout { what: what.into() }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
