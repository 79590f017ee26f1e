use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the ClickUp data-access layer.
#[derive(Debug, Error)]
pub enum ClickupError {
  /// The request never produced a response (DNS, TLS, connection reset...).
  #[error("network error: {0}")]
  Network(String),

  /// The server answered with a non-2xx status.
  #[error("failed to {operation}: {status}")]
  Protocol { operation: String, status: u16 },

  #[error("failed to decode {operation} response: {source}")]
  Decode {
    operation: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("not found: {0}")]
  NotFound(String),

  #[error("cache file {}: {source}", path.display())]
  Persistence {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid input: {0}")]
  InvalidInput(String),
}

impl ClickupError {
  pub fn protocol(operation: impl Into<String>, status: u16) -> Self {
    Self::Protocol {
      operation: operation.into(),
      status,
    }
  }

  pub fn decode(operation: impl Into<String>, source: serde_json::Error) -> Self {
    Self::Decode {
      operation: operation.into(),
      source,
    }
  }

  pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Persistence {
      path: path.into(),
      source,
    }
  }
}

impl From<reqwest::Error> for ClickupError {
  fn from(e: reqwest::Error) -> Self {
    Self::Network(e.to_string())
  }
}

pub type Result<T, E = ClickupError> = std::result::Result<T, E>;
