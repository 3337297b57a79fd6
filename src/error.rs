//! Error taxonomy for backend calls and local state.

use thiserror::Error;

/// Everything that can go wrong while talking to the dashboard API or
/// touching local state on its behalf.
///
/// Cloneable so a single coalesced fetch can hand the same failure to
/// every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
  /// The request could not complete (DNS, TLS, timeout, connection reset).
  #[error("network error: {0}")]
  Network(String),

  /// The token was missing, expired or rejected (401/403).
  #[error("not authorized (HTTP {status})")]
  Authorization {
    status: u16,
    message: Option<String>,
  },

  /// The backend rejected the payload or a business rule (other 4xx).
  #[error("request rejected (HTTP {status})")]
  Validation {
    status: u16,
    message: Option<String>,
  },

  /// The backend failed (5xx).
  #[error("server error (HTTP {status})")]
  Server {
    status: u16,
    message: Option<String>,
  },

  /// A successful response whose body did not have the expected shape.
  #[error("unexpected response body: {0}")]
  Decode(String),

  /// Local failures: corrupted storage, bad key derivation input.
  #[error("local error: {0}")]
  Local(String),
}

impl ApiError {
  /// Build an error from a non-success HTTP status and its raw body.
  pub fn from_status(status: u16, body: &[u8]) -> Self {
    let message = backend_message(body);
    match status {
      401 | 403 => Self::Authorization { status, message },
      400..=499 => Self::Validation { status, message },
      _ => Self::Server { status, message },
    }
  }

  /// Message the backend supplied, if any.
  pub fn backend_message(&self) -> Option<&str> {
    match self {
      Self::Authorization { message, .. }
      | Self::Validation { message, .. }
      | Self::Server { message, .. } => message.as_deref(),
      _ => None,
    }
  }

  /// Text to show the user: the backend's own message when it sent one,
  /// otherwise the operation's fallback.
  pub fn user_message(&self, fallback: &str) -> String {
    self
      .backend_message()
      .map(String::from)
      .unwrap_or_else(|| fallback.to_string())
  }

  /// Only server failures may be retried, and only by the transport.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Server { .. })
  }

  pub fn is_authorization(&self) -> bool {
    matches!(self, Self::Authorization { .. })
  }

  /// Short label used in structured logs.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Network(_) => "network",
      Self::Authorization { .. } => "authorization",
      Self::Validation { .. } => "validation",
      Self::Server { .. } => "server",
      Self::Decode(_) => "decode",
      Self::Local(_) => "local",
    }
  }
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{"message": "..."}` or `{"error": "..."}`; anything else
/// (including non-JSON bodies) yields `None`.
fn backend_message(body: &[u8]) -> Option<String> {
  let value: serde_json::Value = serde_json::from_slice(body).ok()?;
  ["message", "error"]
    .iter()
    .filter_map(|field| value.get(*field).and_then(|v| v.as_str()))
    .map(str::trim)
    .find(|m| !m.is_empty())
    .map(String::from)
}
