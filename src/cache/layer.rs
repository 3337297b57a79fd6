//! In-memory resource cache that orchestrates freshness, invalidation and
//! fetch coalescing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::ApiError;

use super::key::QueryKey;
use super::policy::StalePolicy;
use super::traits::CacheResult;

type SharedFetch = Shared<BoxFuture<'static, Result<Value, ApiError>>>;

/// A cached value and its freshness stamp.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
  pub value: Value,
  pub fetched_at: DateTime<Utc>,
  /// Set by [`QueryCache::invalidate`]; an invalidated entry is never served.
  pub invalidated: bool,
}

struct InFlight {
  id: u64,
  fetch: SharedFetch,
}

#[derive(Default)]
struct CacheState {
  entries: HashMap<QueryKey, CacheEntry>,
  in_flight: HashMap<QueryKey, InFlight>,
  next_fetch_id: u64,
}

/// Keyed store of previously fetched domain data.
///
/// - at most one network fetch per key is in flight; later callers join it
/// - `invalidate` works on whole key prefixes and also orphans in-flight
///   fetches under the prefix, so their results are discarded on arrival
/// - fetches keep running even if every caller stops waiting
///
/// Clones share the same underlying store.
#[derive(Clone)]
pub struct QueryCache {
  state: Arc<Mutex<CacheState>>,
  policy: Arc<StalePolicy>,
}

impl QueryCache {
  pub fn new(policy: StalePolicy) -> Self {
    Self {
      state: Arc::new(Mutex::new(CacheState::default())),
      policy: Arc::new(policy),
    }
  }

  fn lock(&self) -> MutexGuard<'_, CacheState> {
    // The state is plain data with no cross-field invariant a panic could break.
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn is_fresh(&self, key: &QueryKey, entry: &CacheEntry) -> bool {
    if entry.invalidated {
      return false;
    }
    match self.policy.ttl_for(key) {
      Some(ttl) => {
        let age = (Utc::now() - entry.fetched_at).to_std().unwrap_or_default();
        age < ttl
      }
      None => true,
    }
  }

  /// Return the cached value if present and fresh.
  pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
    let state = self.lock();
    let entry = state.entries.get(key).filter(|e| self.is_fresh(key, e))?;
    decode_entry(key, &entry.value)
  }

  /// Store or replace the value for exactly `key`, stamping it fresh.
  pub fn set<T: Serialize>(&self, key: &QueryKey, value: &T) -> Result<(), ApiError> {
    let value = serde_json::to_value(value)
      .map_err(|e| ApiError::Local(format!("failed to encode cache value: {}", e)))?;
    self.lock().entries.insert(
      key.clone(),
      CacheEntry {
        value,
        fetched_at: Utc::now(),
        invalidated: false,
      },
    );
    Ok(())
  }

  /// Mark every entry equal to or nested under `prefix` as stale.
  ///
  /// Returns how many fresh entries were invalidated.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let mut state = self.lock();

    let mut invalidated = 0;
    for (key, entry) in state.entries.iter_mut() {
      if key.starts_with(prefix) && !entry.invalidated {
        entry.invalidated = true;
        invalidated += 1;
      }
    }

    let before = state.in_flight.len();
    state.in_flight.retain(|key, _| !key.starts_with(prefix));
    let orphaned = before - state.in_flight.len();

    tracing::debug!(prefix = %prefix, invalidated, orphaned, "cache invalidated");
    invalidated
  }

  /// Drop everything, including interest in in-flight fetches.
  pub fn clear(&self) {
    let mut state = self.lock();
    state.entries.clear();
    state.in_flight.clear();
    tracing::debug!("cache cleared");
  }

  /// Serve `key` from cache, or fetch it with cache-first semantics.
  ///
  /// 1. Fresh entry: return it without calling `fetcher`
  /// 2. Fetch already in flight for `key`: wait for that one
  /// 3. Otherwise call `fetcher`, and store its success unless `key` was
  ///    invalidated meanwhile
  ///
  /// Failures are returned to every waiter and never cached.
  pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<CacheResult<T>, ApiError>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let (fetch, joined) = {
      let mut state = self.lock();

      if let Some(entry) = state.entries.get(key) {
        if self.is_fresh(key, entry) {
          if let Some(data) = decode_entry(key, &entry.value) {
            tracing::debug!(key = %key, "cache hit");
            return Ok(CacheResult::from_cache(data, entry.fetched_at));
          }
        }
      }

      if let Some(in_flight) = state.in_flight.get(key) {
        tracing::debug!(key = %key, "joining in-flight fetch");
        (in_flight.fetch.clone(), true)
      } else {
        state.next_fetch_id += 1;
        let id = state.next_fetch_id;
        let request = fetcher();
        let cache = self.clone();
        let owned_key = key.clone();

        let fetch = async move {
          let result = request.await.and_then(|data| {
            serde_json::to_value(data)
              .map_err(|e| ApiError::Local(format!("failed to encode cache value: {}", e)))
          });
          cache.complete(&owned_key, id, &result);
          result
        }
        .boxed()
        .shared();

        state.in_flight.insert(
          key.clone(),
          InFlight {
            id,
            fetch: fetch.clone(),
          },
        );
        // Drive the fetch to completion even if every waiter goes away.
        tokio::spawn(fetch.clone());

        tracing::debug!(
          key = %key,
          fingerprint = %key.fingerprint(),
          fetch_id = id,
          "cache miss, fetching"
        );
        (fetch, false)
      }
    };

    let value = fetch.await?;
    let data = serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?;

    Ok(if joined {
      CacheResult::coalesced(data)
    } else {
      CacheResult::from_network(data)
    })
  }

  /// Record the outcome of fetch `id` if it is still the current one for `key`.
  fn complete(&self, key: &QueryKey, id: u64, result: &Result<Value, ApiError>) {
    let mut state = self.lock();

    let current = state.in_flight.get(key).map(|f| f.id) == Some(id);
    if !current {
      tracing::debug!(key = %key, fetch_id = id, "discarding result of invalidated fetch");
      return;
    }
    state.in_flight.remove(key);

    if let Ok(value) = result {
      state.entries.insert(
        key.clone(),
        CacheEntry {
          value: value.clone(),
          fetched_at: Utc::now(),
          invalidated: false,
        },
      );
    }
  }

  pub fn is_in_flight(&self, key: &QueryKey) -> bool {
    self.lock().in_flight.contains_key(key)
  }

  /// Copy of every entry, ordered by key.
  pub fn snapshot(&self) -> Vec<(QueryKey, CacheEntry)> {
    let state = self.lock();
    let mut entries: Vec<_> = state
      .entries
      .iter()
      .map(|(k, e)| (k.clone(), e.clone()))
      .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
  }
}

fn decode_entry<T: DeserializeOwned>(key: &QueryKey, value: &Value) -> Option<T> {
  match serde_json::from_value(value.clone()) {
    Ok(data) => Some(data),
    Err(e) => {
      tracing::warn!(key = %key, error = %e, "cached value has unexpected shape, treating as absent");
      None
    }
  }
}
