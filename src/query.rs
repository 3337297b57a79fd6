//! Consumer-facing handles over domain operations.
//!
//! A view that shows domain data holds a [`Query<T>`]; a view that triggers
//! a write holds a [`Mutation<T>`]. Both run the operation on a tokio task
//! and are polled from the consumer's own loop, so the consumer never
//! blocks and never sees cache keys.
//!
//! ```ignore
//! let client = client.clone();
//! let mut batches = Query::new(move || {
//!   let client = client.clone();
//!   async move { client.payroll().list_batches(&BatchFilter::default()).await }
//! });
//! batches.fetch();
//!
//! // every tick
//! if batches.poll() {
//!   redraw(batches.state());
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use crate::error::ApiError;

type Outcome<T> = Result<T, ApiError>;

/// Result of an operation running on its own task.
///
/// Dropping it stops listening; the task itself keeps going.
struct Pending<T> {
  rx: oneshot::Receiver<Outcome<T>>,
}

impl<T: Send + 'static> Pending<T> {
  fn spawn<Fut>(operation: Fut) -> Self
  where
    Fut: Future<Output = Outcome<T>> + Send + 'static,
  {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      // The listener may be gone after cancel/refetch/reset.
      let _ = tx.send(operation.await);
    });
    Self { rx }
  }

  /// `None` while still running.
  fn try_take(&mut self) -> Option<Outcome<T>> {
    match self.rx.try_recv() {
      Ok(outcome) => Some(outcome),
      Err(oneshot::error::TryRecvError::Empty) => None,
      Err(oneshot::error::TryRecvError::Closed) => Some(Err(ApiError::Local(
        "operation task ended without a result".into(),
      ))),
    }
  }
}

#[derive(Debug, Clone)]
pub enum QueryState<T> {
  Idle,
  Loading,
  Success(T),
  /// The operation already reported this failure to the notification sink.
  Failed(ApiError),
}

impl<T> QueryState<T> {
  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      QueryState::Failed(e) => Some(e),
      _ => None,
    }
  }
}

type Fetcher<T> = Box<dyn Fn() -> Pin<Box<dyn Future<Output = Outcome<T>> + Send>> + Send + Sync>;

/// A read operation bound to a view.
///
/// The resource cache decides whether a fetch reaches the network;
/// `stale_time` only tells the view when it is worth asking again.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: Fetcher<T>,
  pending: Option<Pending<T>>,
  loaded_at: Option<Instant>,
  stale_time: Duration,
}

impl<T: Send + 'static> Query<T> {
  /// `fetcher` starts the read; it runs again on every `fetch`/`refetch`.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome<T>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || Box::pin(fetcher())),
      pending: None,
      loaded_at: None,
      stale_time: Duration::from_secs(60),
    }
  }

  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.state.error()
  }

  pub fn is_loading(&self) -> bool {
    matches!(self.state, QueryState::Loading)
  }

  /// Loaded longer ago than `stale_time`. Never true before the first
  /// successful load.
  pub fn is_stale(&self) -> bool {
    self.state.data().is_some()
      && self
        .loaded_at
        .map_or(true, |at| at.elapsed() > self.stale_time)
  }

  /// Start loading. No-op while a load is running.
  pub fn fetch(&mut self) {
    if !self.is_loading() {
      self.start();
    }
  }

  /// Start a new load, ignoring any running one.
  pub fn refetch(&mut self) {
    self.start();
  }

  /// Stop waiting for the running load.
  ///
  /// The request itself still completes and may fill the cache; only this
  /// view ignores the answer.
  pub fn cancel(&mut self) {
    if self.pending.take().is_some() {
      self.state = QueryState::Idle;
    }
  }

  /// Pick up the result of a running load. Returns `true` if the state
  /// changed.
  pub fn poll(&mut self) -> bool {
    let Some(outcome) = self.pending.as_mut().and_then(Pending::try_take) else {
      return false;
    };
    self.pending = None;
    self.state = match outcome {
      Ok(data) => {
        self.loaded_at = Some(Instant::now());
        QueryState::Success(data)
      }
      Err(e) => QueryState::Failed(e),
    };
    true
  }

  fn start(&mut self) {
    self.pending = Some(Pending::spawn((self.fetcher)()));
    self.state = QueryState::Loading;
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("loaded_at", &self.loaded_at)
      .finish_non_exhaustive()
  }
}

/// A write operation bound to a view: a callback plus its pending/error
/// state.
pub struct Mutation<T> {
  pending: Option<Pending<T>>,
  last: Option<Outcome<T>>,
}

impl<T> Default for Mutation<T> {
  fn default() -> Self {
    Self {
      pending: None,
      last: None,
    }
  }
}

impl<T: Send + 'static> Mutation<T> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Run `operation` unless a previous submission is still pending, so a
  /// double click cannot send a write twice. Returns whether it started.
  pub fn submit<Fut>(&mut self, operation: Fut) -> bool
  where
    Fut: Future<Output = Outcome<T>> + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }
    self.last = None;
    self.pending = Some(Pending::spawn(operation));
    true
  }

  /// Returns `true` once, when the pending submission finishes.
  pub fn poll(&mut self) -> bool {
    let Some(outcome) = self.pending.as_mut().and_then(Pending::try_take) else {
      return false;
    };
    self.pending = None;
    self.last = Some(outcome);
    true
  }

  pub fn is_pending(&self) -> bool {
    self.pending.is_some()
  }

  pub fn data(&self) -> Option<&T> {
    self.last.as_ref()?.as_ref().ok()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.last.as_ref()?.as_ref().err()
  }

  /// Forget the last outcome, e.g. when the form closes.
  pub fn reset(&mut self) {
    self.pending = None;
    self.last = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{IdempotencyKey, Method};
  use crate::ops::{BatchFilter, Lifecycle, PayrollBatch};
  use crate::testing::{fixture, TestHarness};
  use serde_json::json;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
  }

  fn batches_query(h: &TestHarness) -> Query<Vec<PayrollBatch>> {
    let client = h.client.clone();
    Query::new(move || {
      let client = client.clone();
      async move { client.payroll().list_batches(&BatchFilter::default()).await }
    })
  }

  #[tokio::test]
  async fn test_query_loads_through_client() {
    let h = TestHarness::signed_in();
    h.transport.respond(
      Method::Get,
      "/payroll/batches",
      Ok(json!([fixture::batch("b1", "draft")])),
    );

    let mut query = batches_query(&h);
    assert!(matches!(query.state(), QueryState::Idle));
    assert!(!query.poll());

    query.fetch();
    assert!(query.is_loading());
    settle().await;

    assert!(query.poll());
    assert_eq!(query.data().map(|b| b[0].status), Some(Lifecycle::Draft));
    assert!(!query.is_stale());
  }

  #[tokio::test]
  async fn test_query_failure_state() {
    let h = TestHarness::signed_in();
    h.transport.respond(
      Method::Get,
      "/payroll/batches",
      Err(ApiError::from_status(500, b"")),
    );

    let mut query = batches_query(&h);
    query.fetch();
    settle().await;

    assert!(query.poll());
    assert!(matches!(query.error(), Some(ApiError::Server { status: 500, .. })));
    assert!(query.data().is_none());
    assert_eq!(h.notifier.errors().len(), 1);
  }

  #[tokio::test]
  async fn test_zero_stale_time() {
    let mut query = Query::new(|| async { Ok::<_, ApiError>(42) }).with_stale_time(Duration::ZERO);
    assert!(!query.is_stale());

    query.fetch();
    settle().await;
    query.poll();

    assert!(query.is_stale());
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let started = Arc::new(AtomicU32::new(0));
    let counter = started.clone();
    let mut query = Query::new(move || {
      counter.fetch_add(1, Ordering::SeqCst);
      async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok::<_, ApiError>(())
      }
    });

    query.fetch();
    query.fetch();
    assert_eq!(started.load(Ordering::SeqCst), 1);

    query.refetch();
    assert_eq!(started.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_cancelled_load_still_fills_cache() {
    let h = TestHarness::signed_in();
    h.transport.set_latency(Duration::from_millis(10));
    h.transport
      .respond(Method::Get, "/payroll/batches", Ok(json!([])));

    let mut query = batches_query(&h);
    query.fetch();
    query.cancel();
    assert!(matches!(query.state(), QueryState::Idle));

    settle().await;
    assert!(!query.poll());
    assert_eq!(h.client.cache().snapshot().len(), 1);

    // A later view is served from the cache.
    query.fetch();
    settle().await;
    assert!(query.poll());
    assert_eq!(h.transport.call_count(Method::Get, "/payroll/batches"), 1);
  }

  #[tokio::test]
  async fn test_mutation_blocks_double_submit() {
    let h = TestHarness::signed_in();
    h.transport.set_latency(Duration::from_millis(10));
    h.transport.respond(
      Method::Post,
      "/payroll/batches/b1/execute",
      Ok(fixture::batch("b1", "executing")),
    );

    let key = IdempotencyKey::new();
    let mut execute = Mutation::new();
    for _ in 0..2 {
      let client = h.client.clone();
      let key = key.clone();
      execute.submit(async move { client.payroll().execute_batch("b1", &key).await });
    }
    assert!(execute.is_pending());

    settle().await;
    assert!(execute.poll());
    assert!(!execute.poll());
    assert!(!execute.is_pending());
    assert_eq!(execute.data().map(|b| b.status), Some(Lifecycle::Executing));
    assert_eq!(
      h.transport
        .call_count(Method::Post, "/payroll/batches/b1/execute"),
      1
    );
  }

  #[tokio::test]
  async fn test_mutation_error_and_reset() {
    let mut mutation: Mutation<()> = Mutation::new();
    mutation.submit(async { Err(ApiError::Network("offline".into())) });
    settle().await;
    mutation.poll();

    assert!(matches!(mutation.error(), Some(ApiError::Network(_))));
    assert!(mutation.data().is_none());

    mutation.reset();
    assert!(mutation.error().is_none());
    assert!(!mutation.is_pending());
  }
}
