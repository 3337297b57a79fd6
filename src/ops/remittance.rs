use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ApiRequest, IdempotencyKey};
use crate::cache::QueryKey;
use crate::error::ApiError;

use super::common::Money;
use super::{table, Client};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemittanceStatus {
  Pending,
  Processing,
  Completed,
  Failed,
  Cancelled,
}

/// Payee of a cross-border transfer. One of `bank_account` or
/// `mobile_wallet` is expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
  pub name: String,
  pub country: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bank_account: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mobile_wallet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remittance {
  pub id: String,
  pub recipient: Recipient,
  pub send_amount: Money,
  pub receive_amount: Money,
  pub fx_rate: f64,
  pub fee: Money,
  pub status: RemittanceStatus,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemittanceFilter {
  pub status: Option<RemittanceStatus>,
  pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
  pub from_currency: String,
  pub to_currency: String,
  /// Send amount in minor units of `from_currency`.
  pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
  pub send_amount: Money,
  pub receive_amount: Money,
  pub fx_rate: f64,
  pub fee: Money,
  pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRemittance {
  pub recipient: Recipient,
  pub send_amount: Money,
  pub to_currency: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub purpose: Option<String>,
}

pub struct Remittances<'a> {
  client: &'a Client,
}

impl<'a> Remittances<'a> {
  pub(super) fn new(client: &'a Client) -> Self {
    Self { client }
  }

  pub async fn list(&self, filter: &RemittanceFilter) -> Result<Vec<Remittance>, ApiError> {
    self
      .client
      .read(&table::LIST_REMITTANCES, || {
        Ok((
          QueryKey::new("remittances").scope("list").params(filter)?,
          ApiRequest::get("/remittances").with_query(filter)?,
        ))
      })
      .await
  }

  /// Current rate and fee for a transfer. Quotes go stale quickly, see the
  /// `remittances/quote` entry of the cache staleness config.
  pub async fn quote(&self, request: &QuoteRequest) -> Result<Quote, ApiError> {
    self
      .client
      .read(&table::QUOTE_REMITTANCE, || {
        Ok((
          QueryKey::new("remittances").scope("quote").params(request)?,
          ApiRequest::get("/remittances/quote").with_query(request)?,
        ))
      })
      .await
  }

  pub async fn create(
    &self,
    remittance: &NewRemittance,
    key: &IdempotencyKey,
  ) -> Result<Remittance, ApiError> {
    self
      .client
      .write(&table::CREATE_REMITTANCE, || {
        Ok(
          ApiRequest::post("/remittances")
            .with_json(remittance)?
            .with_idempotency_key(key),
        )
      })
      .await
  }

  pub async fn cancel(&self, id: &str) -> Result<Remittance, ApiError> {
    self
      .client
      .write(&table::CANCEL_REMITTANCE, || {
        Ok(ApiRequest::post(format!("/remittances/{}/cancel", id)))
      })
      .await
  }
}
