//! Notification sinks: where operation outcomes are surfaced to the user.
//!
//! Sinks only observe. Nothing they do can change the outcome of the
//! operation that reported to them.

use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Success,
  Error,
}

/// Outcome of one domain operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub level: Level,
  /// Operation name from the operation table, e.g. `payroll.execute_batch`.
  pub operation: &'static str,
  pub message: String,
}

impl Notification {
  pub fn success(operation: &'static str, message: impl Into<String>) -> Self {
    Self {
      level: Level::Success,
      operation,
      message: message.into(),
    }
  }

  pub fn error(operation: &'static str, message: impl Into<String>) -> Self {
    Self {
      level: Level::Error,
      operation,
      message: message.into(),
    }
  }
}

pub trait Notifier: Send + Sync {
  fn notify(&self, notification: Notification);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
  fn notify(&self, notification: Notification) {
    (**self).notify(notification)
  }
}

/// Forwards notifications to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  fn notify(&self, n: Notification) {
    match n.level {
      Level::Success => tracing::info!(operation = n.operation, "{}", n.message),
      Level::Error => tracing::warn!(operation = n.operation, "{}", n.message),
    }
  }
}

/// Prints notifications to stderr, for the command-line front end.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
  fn notify(&self, n: Notification) {
    match n.level {
      Level::Success => eprintln!("ok: {}", n.message),
      Level::Error => eprintln!("error: {}", n.message),
    }
    TracingNotifier.notify(n);
  }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
  received: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn notifications(&self) -> Vec<Notification> {
    self
      .received
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  pub fn errors(&self) -> Vec<Notification> {
    self
      .notifications()
      .into_iter()
      .filter(|n| n.level == Level::Error)
      .collect()
  }
}

impl Notifier for RecordingNotifier {
  fn notify(&self, notification: Notification) {
    self
      .received
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(notification);
  }
}
