use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::ApiRequest;
use crate::cache::QueryKey;
use crate::error::ApiError;

use super::common::{DateRange, Money};
use super::{table, Client};

/// Headline numbers for the dashboard landing view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
  pub total_balance: Money,
  pub pending_payroll_batches: u32,
  pub active_escrows: u32,
  #[serde(rename = "remittanceVolume30d")]
  pub remittance_volume_30d: Money,
  pub active_agents: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyVolume {
  pub date: NaiveDate,
  pub volume: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorridorVolume {
  /// Currency pair, e.g. `USD-MXN`.
  pub corridor: String,
  pub volume: Money,
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsOverview {
  pub range: DateRange,
  pub daily: Vec<DailyVolume>,
  pub corridors: Vec<CorridorVolume>,
}

pub struct Analytics<'a> {
  client: &'a Client,
}

impl<'a> Analytics<'a> {
  pub(super) fn new(client: &'a Client) -> Self {
    Self { client }
  }

  /// Cached under `dashboard`, which settlement writes invalidate.
  pub async fn dashboard(&self) -> Result<DashboardSummary, ApiError> {
    self
      .client
      .read(&table::DASHBOARD_SUMMARY, || {
        Ok((
          QueryKey::new("dashboard").scope("summary"),
          ApiRequest::get("/dashboard/summary"),
        ))
      })
      .await
  }

  pub async fn overview(&self, range: &DateRange) -> Result<AnalyticsOverview, ApiError> {
    self
      .client
      .read(&table::ANALYTICS_OVERVIEW, || {
        Ok((
          QueryKey::new("analytics").scope("overview").params(range)?,
          ApiRequest::get("/analytics/overview").with_query(range)?,
        ))
      })
      .await
  }
}
