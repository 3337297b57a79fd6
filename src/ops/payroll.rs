use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ApiRequest, IdempotencyKey};
use crate::cache::QueryKey;
use crate::error::ApiError;

use super::common::{Lifecycle, Money};
use super::{table, Client};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollItem {
  pub agent_id: String,
  pub amount: Money,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollBatch {
  pub id: String,
  pub name: String,
  pub status: Lifecycle,
  pub total: Money,
  #[serde(default)]
  pub items: Vec<PayrollItem>,
  #[serde(default)]
  pub scheduled_for: Option<NaiveDate>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayrollBatch {
  pub name: String,
  pub currency: String,
  #[serde(default)]
  pub scheduled_for: Option<NaiveDate>,
  pub items: Vec<PayrollItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFilter {
  pub status: Option<Lifecycle>,
  pub search: Option<String>,
}

pub struct Payroll<'a> {
  client: &'a Client,
}

impl<'a> Payroll<'a> {
  pub(super) fn new(client: &'a Client) -> Self {
    Self { client }
  }

  pub async fn list_batches(&self, filter: &BatchFilter) -> Result<Vec<PayrollBatch>, ApiError> {
    self
      .client
      .read(&table::LIST_BATCHES, || {
        Ok((
          QueryKey::new("payroll").scope("batches").params(filter)?,
          ApiRequest::get("/payroll/batches").with_query(filter)?,
        ))
      })
      .await
  }

  pub async fn get_batch(&self, id: &str) -> Result<PayrollBatch, ApiError> {
    self
      .client
      .read(&table::GET_BATCH, || {
        Ok((
          QueryKey::new("payroll").scope("batches").scope(id),
          ApiRequest::get(format!("/payroll/batches/{}", id)),
        ))
      })
      .await
  }

  pub async fn create_batch(&self, batch: &NewPayrollBatch) -> Result<PayrollBatch, ApiError> {
    self
      .client
      .write(&table::CREATE_BATCH, || {
        ApiRequest::post("/payroll/batches").with_json(batch)
      })
      .await
  }

  pub async fn submit_batch(&self, id: &str) -> Result<PayrollBatch, ApiError> {
    self.transition(&table::SUBMIT_BATCH, id, "submit").await
  }

  pub async fn approve_batch(&self, id: &str) -> Result<PayrollBatch, ApiError> {
    self.transition(&table::APPROVE_BATCH, id, "approve").await
  }

  /// Start paying out an approved batch.
  ///
  /// Reuse `key` when retrying the same execution so the backend pays out
  /// at most once.
  pub async fn execute_batch(
    &self,
    id: &str,
    key: &IdempotencyKey,
  ) -> Result<PayrollBatch, ApiError> {
    self
      .client
      .write(&table::EXECUTE_BATCH, || {
        Ok(ApiRequest::post(format!("/payroll/batches/{}/execute", id)).with_idempotency_key(key))
      })
      .await
  }

  pub async fn cancel_batch(&self, id: &str) -> Result<PayrollBatch, ApiError> {
    self.transition(&table::CANCEL_BATCH, id, "cancel").await
  }

  async fn transition(
    &self,
    op: &table::WriteOp,
    id: &str,
    action: &str,
  ) -> Result<PayrollBatch, ApiError> {
    self
      .client
      .write(op, || {
        Ok(ApiRequest::post(format!("/payroll/batches/{}/{}", id, action)))
      })
      .await
  }
}
