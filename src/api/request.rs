use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::cache::canonical_params;
use crate::error::ApiError;

/// Header carrying the idempotency key for money movements.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Post,
  Patch,
  Delete,
}

/// Token attached to a money-movement request so that repeating the same
/// logical action does not repeat its effect.
///
/// Create one per user action and reuse it for every retry of that action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
  pub fn new() -> Self {
    Self(Uuid::new_v4().to_string())
  }

  /// Reuse a key from an earlier attempt of the same action.
  pub fn parse(raw: &str) -> Result<Self, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
      return Err(ApiError::Local("idempotency key must not be empty".into()));
    }
    Ok(Self(raw.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl Default for IdempotencyKey {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Display for IdempotencyKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// One backend call, described independently of the HTTP client.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  /// Path relative to the configured base URL, e.g. `/payroll/batches`.
  pub path: String,
  pub query: Vec<(String, String)>,
  pub body: Option<Value>,
  pub bearer: Option<String>,
  pub idempotency_key: Option<IdempotencyKey>,
}

impl ApiRequest {
  fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      query: Vec::new(),
      body: None,
      bearer: None,
      idempotency_key: None,
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::Get, path)
  }

  pub fn post(path: impl Into<String>) -> Self {
    Self::new(Method::Post, path)
  }

  pub fn patch(path: impl Into<String>) -> Self {
    Self::new(Method::Patch, path)
  }

  pub fn delete(path: impl Into<String>) -> Self {
    Self::new(Method::Delete, path)
  }

  /// Encode a filter object as query parameters (same canonical form as
  /// cache keys, so the wire request and the key always agree).
  pub fn with_query<T: Serialize>(mut self, filter: &T) -> Result<Self, ApiError> {
    self.query = canonical_params(filter)?.into_iter().collect();
    Ok(self)
  }

  pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
    let body = serde_json::to_value(body)
      .map_err(|e| ApiError::Local(format!("failed to encode request body: {}", e)))?;
    self.body = Some(body);
    Ok(self)
  }

  pub fn with_idempotency_key(mut self, key: &IdempotencyKey) -> Self {
    self.idempotency_key = Some(key.clone());
    self
  }

  pub fn with_bearer(mut self, token: Option<String>) -> Self {
    self.bearer = token;
    self
  }

  /// Whether sending this request twice is harmless.
  pub fn is_replay_safe(&self) -> bool {
    self.method == Method::Get || self.idempotency_key.is_some()
  }
}

/// The seam between domain operations and the network.
///
/// Returns the decoded JSON body of a 2xx response (`null` when empty)
/// or a classified [`ApiError`].
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Serialize;

  #[derive(Serialize)]
  struct Filter {
    status: Option<&'static str>,
    search: Option<&'static str>,
    page: u32,
  }

  #[test]
  fn test_query_is_sorted_and_skips_empty() {
    let request = ApiRequest::get("/agents")
      .with_query(&Filter {
        status: Some("active"),
        search: None,
        page: 2,
      })
      .unwrap();

    assert_eq!(
      request.query,
      vec![
        ("page".to_string(), "2".to_string()),
        ("status".to_string(), "active".to_string()),
      ]
    );
  }

  #[test]
  fn test_replay_safety() {
    assert!(ApiRequest::get("/treasury/portfolio").is_replay_safe());
    assert!(!ApiRequest::post("/payroll/batches").is_replay_safe());

    let key = IdempotencyKey::new();
    assert!(ApiRequest::post("/payroll/batches/b1/execute")
      .with_idempotency_key(&key)
      .is_replay_safe());
  }

  #[test]
  fn test_idempotency_keys_are_unique_per_action() {
    assert_ne!(IdempotencyKey::new(), IdempotencyKey::new());
    assert!(IdempotencyKey::parse("  ").is_err());
    assert_eq!(IdempotencyKey::parse(" abc ").unwrap().as_str(), "abc");
  }
}
