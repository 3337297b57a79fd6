//! Hierarchical cache keys.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::ApiError;

/// One level of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum KeySegment {
  Name(String),
  /// Filter parameters, already canonicalised (sorted, stringified).
  Params(BTreeMap<String, String>),
}

/// Structured identifier for a cached resource: a domain, optional
/// sub-scopes, and optional filter parameters.
///
/// `["payroll", "batches", {status: "pending"}]` is nested under
/// `["payroll", "batches"]`, which is nested under `["payroll"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
  /// Start a key for the given domain.
  pub fn new(domain: impl Into<String>) -> Self {
    Self(vec![KeySegment::Name(domain.into())])
  }

  /// Build a prefix from plain names, e.g. `&["payroll", "batches"]`.
  pub fn from_path(path: &[&str]) -> Self {
    Self(
      path
        .iter()
        .map(|s| KeySegment::Name((*s).to_string()))
        .collect(),
    )
  }

  pub fn scope(mut self, name: impl Into<String>) -> Self {
    self.0.push(KeySegment::Name(name.into()));
    self
  }

  /// Append the filter object as a parameter segment.
  ///
  /// An empty filter appends nothing, so "no filter" and "empty filter"
  /// resolve to the same key.
  pub fn params<T: Serialize>(mut self, filter: &T) -> Result<Self, ApiError> {
    let params = canonical_params(filter)?;
    if !params.is_empty() {
      self.0.push(KeySegment::Params(params));
    }
    Ok(self)
  }

  pub fn segments(&self) -> &[KeySegment] {
    &self.0
  }

  /// True when `prefix` equals this key or is one of its ancestors.
  /// Segments compare whole, so `["pay"]` is not a prefix of `["payroll"]`.
  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.0.len() >= prefix.0.len() && self.0.iter().zip(&prefix.0).all(|(a, b)| a == b)
  }

  /// Stable, fixed-length identifier for logs.
  pub fn fingerprint(&self) -> String {
    let canonical = serde_json::to_string(&self.0).unwrap_or_else(|_| self.to_string());
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, segment) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("/")?;
      }
      match segment {
        KeySegment::Name(name) => f.write_str(name)?,
        KeySegment::Params(params) => {
          f.write_str("{")?;
          for (j, (k, v)) in params.iter().enumerate() {
            if j > 0 {
              f.write_str(",")?;
            }
            write!(f, "{}={}", k, v)?;
          }
          f.write_str("}")?;
        }
      }
    }
    Ok(())
  }
}

/// Flatten a filter object into sorted string parameters.
///
/// `null` and empty-string fields are dropped. Nested arrays and objects
/// are kept as compact JSON. The filter must serialize to an object (or
/// to `null`/unit, meaning no filter).
pub fn canonical_params<T: Serialize>(filter: &T) -> Result<BTreeMap<String, String>, ApiError> {
  let value = serde_json::to_value(filter)
    .map_err(|e| ApiError::Local(format!("failed to encode filter: {}", e)))?;

  let object = match value {
    Value::Null => return Ok(BTreeMap::new()),
    Value::Object(object) => object,
    other => {
      return Err(ApiError::Local(format!(
        "filter must be an object, got {}",
        other
      )))
    }
  };

  let params = object
    .into_iter()
    .filter_map(|(k, v)| {
      let v = match v {
        Value::Null => return None,
        Value::String(s) if s.is_empty() => return None,
        Value::String(s) => s,
        other => other.to_string(),
      };
      Some((k, v))
    })
    .collect();

  Ok(params)
}
