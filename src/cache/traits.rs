//! Result types shared by the cache layer.

use chrono::{DateTime, Utc};

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was fetched (if served from cache)
  pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Data from a network call this caller started.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      fetched_at: None,
    }
  }

  /// Data from a network call another caller had already started.
  pub fn coalesced(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Coalesced,
      fetched_at: None,
    }
  }

  /// Fresh data served straight from the cache.
  pub fn from_cache(data: T, fetched_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      fetched_at: Some(fetched_at),
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched by this call
  Network,
  /// Joined an identical fetch already in flight
  Coalesced,
  /// Served from cache without a network call
  Cache,
}
