use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ApiRequest, IdempotencyKey};
use crate::cache::QueryKey;
use crate::error::ApiError;

use super::common::Money;
use super::{table, Client};

/// One asset position. `quantity` is a decimal string so crypto amounts
/// keep their precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
  pub asset: String,
  pub quantity: String,
  pub value: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
  pub total_value: Money,
  pub holdings: Vec<Holding>,
  pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
  Deposit,
  Withdrawal,
  Swap,
  Payroll,
  Remittance,
  EscrowRelease,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
  pub id: String,
  pub kind: TransactionKind,
  pub amount: Money,
  #[serde(default)]
  pub description: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
  pub kind: Option<TransactionKind>,
  pub from: Option<NaiveDate>,
  pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
  pub from_asset: String,
  pub to_asset: String,
  /// Decimal quantity of `from_asset`.
  pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
  pub asset: String,
  pub amount: String,
  pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
  pub asset: String,
  pub amount: String,
  pub destination: String,
}

pub struct Treasury<'a> {
  client: &'a Client,
}

impl<'a> Treasury<'a> {
  pub(super) fn new(client: &'a Client) -> Self {
    Self { client }
  }

  pub async fn portfolio(&self) -> Result<Portfolio, ApiError> {
    self
      .client
      .read(&table::GET_PORTFOLIO, || {
        Ok((
          QueryKey::new("treasury").scope("portfolio"),
          ApiRequest::get("/treasury/portfolio"),
        ))
      })
      .await
  }

  pub async fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, ApiError> {
    self
      .client
      .read(&table::LIST_TRANSACTIONS, || {
        Ok((
          QueryKey::new("treasury").scope("transactions").params(filter)?,
          ApiRequest::get("/treasury/transactions").with_query(filter)?,
        ))
      })
      .await
  }

  pub async fn swap(&self, swap: &SwapRequest, key: &IdempotencyKey) -> Result<Transaction, ApiError> {
    self.move_funds(&table::SWAP, "/treasury/swap", swap, key).await
  }

  pub async fn deposit(
    &self,
    deposit: &DepositRequest,
    key: &IdempotencyKey,
  ) -> Result<Transaction, ApiError> {
    self
      .move_funds(&table::DEPOSIT, "/treasury/deposit", deposit, key)
      .await
  }

  pub async fn withdraw(
    &self,
    withdrawal: &WithdrawRequest,
    key: &IdempotencyKey,
  ) -> Result<Transaction, ApiError> {
    self
      .move_funds(&table::WITHDRAW, "/treasury/withdraw", withdrawal, key)
      .await
  }

  async fn move_funds<B: Serialize>(
    &self,
    op: &table::WriteOp,
    path: &str,
    body: &B,
    key: &IdempotencyKey,
  ) -> Result<Transaction, ApiError> {
    self
      .client
      .write(op, || {
        Ok(ApiRequest::post(path).with_json(body)?.with_idempotency_key(key))
      })
      .await
  }
}
