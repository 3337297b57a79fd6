//! Types shared across domains.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Amount in minor units (cents) of `currency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
  pub amount: i64,
  pub currency: String,
}

/// Lifecycle of long-lived entities (payroll batches, escrow contracts).
///
/// `draft -> pending_approval -> approved -> executing -> settled`, with
/// `disputed` and `cancelled` reachable from any non-terminal state. The
/// client never moves an entity itself; it only reflects what the backend
/// returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
  Draft,
  PendingApproval,
  Approved,
  Executing,
  Settled,
  Disputed,
  Cancelled,
}

impl Lifecycle {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Settled | Self::Disputed | Self::Cancelled)
  }
}

/// Inclusive date range filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
  pub from: NaiveDate,
  pub to: NaiveDate,
}

/// Parse a snake_case enum value the way the backend spells it.
pub fn parse_variant<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, String> {
  serde_json::from_value(serde_json::Value::String(raw.to_string()))
    .map_err(|_| format!("unknown value '{}'", raw))
}
