use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ApiRequest, IdempotencyKey};
use crate::cache::QueryKey;
use crate::error::ApiError;

use super::common::{Lifecycle, Money};
use super::{table, Client};

/// Funds held on behalf of two parties until release conditions are met.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowContract {
  pub id: String,
  pub title: String,
  pub counterparty: String,
  pub amount: Money,
  pub status: Lifecycle,
  #[serde(default)]
  pub release_conditions: Vec<String>,
  #[serde(default)]
  pub dispute_reason: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEscrow {
  pub title: String,
  pub counterparty: String,
  pub amount: Money,
  #[serde(default)]
  pub release_conditions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowFilter {
  pub status: Option<Lifecycle>,
  pub counterparty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeRequest {
  pub reason: String,
}

pub struct Escrow<'a> {
  client: &'a Client,
}

impl<'a> Escrow<'a> {
  pub(super) fn new(client: &'a Client) -> Self {
    Self { client }
  }

  pub async fn list(&self, filter: &EscrowFilter) -> Result<Vec<EscrowContract>, ApiError> {
    self
      .client
      .read(&table::LIST_ESCROWS, || {
        Ok((
          QueryKey::new("escrow").scope("contracts").params(filter)?,
          ApiRequest::get("/escrow").with_query(filter)?,
        ))
      })
      .await
  }

  pub async fn get(&self, id: &str) -> Result<EscrowContract, ApiError> {
    self
      .client
      .read(&table::GET_ESCROW, || {
        Ok((
          QueryKey::new("escrow").scope("contracts").scope(id),
          ApiRequest::get(format!("/escrow/{}", id)),
        ))
      })
      .await
  }

  pub async fn create(&self, contract: &NewEscrow) -> Result<EscrowContract, ApiError> {
    self
      .client
      .write(&table::CREATE_ESCROW, || {
        ApiRequest::post("/escrow").with_json(contract)
      })
      .await
  }

  pub async fn approve(&self, id: &str) -> Result<EscrowContract, ApiError> {
    self
      .client
      .write(&table::APPROVE_ESCROW, || {
        Ok(ApiRequest::post(format!("/escrow/{}/approve", id)))
      })
      .await
  }

  /// Pay the held funds out to the counterparty.
  pub async fn release(&self, id: &str, key: &IdempotencyKey) -> Result<EscrowContract, ApiError> {
    self
      .client
      .write(&table::RELEASE_ESCROW, || {
        Ok(ApiRequest::post(format!("/escrow/{}/release", id)).with_idempotency_key(key))
      })
      .await
  }

  pub async fn dispute(
    &self,
    id: &str,
    dispute: &DisputeRequest,
  ) -> Result<EscrowContract, ApiError> {
    self
      .client
      .write(&table::DISPUTE_ESCROW, || {
        ApiRequest::post(format!("/escrow/{}/dispute", id)).with_json(dispute)
      })
      .await
  }

  pub async fn cancel(&self, id: &str) -> Result<EscrowContract, ApiError> {
    self
      .client
      .write(&table::CANCEL_ESCROW, || {
        Ok(ApiRequest::post(format!("/escrow/{}/cancel", id)))
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::Method;
  use crate::testing::{fixture, TestHarness};
  use serde_json::json;

  #[tokio::test]
  async fn test_release_refreshes_contracts_and_dashboard() {
    let h = TestHarness::signed_in();
    h.transport.respond(
      Method::Get,
      "/escrow",
      Ok(json!([fixture::escrow("e1", "approved")])),
    );
    h.transport
      .respond(Method::Get, "/dashboard/summary", Ok(fixture::dashboard()));
    h.transport
      .respond(Method::Get, "/treasury/portfolio", Ok(fixture::portfolio()));
    h.transport.respond(
      Method::Post,
      "/escrow/e1/release",
      Ok(fixture::escrow("e1", "settled")),
    );

    h.client.escrow().list(&EscrowFilter::default()).await.unwrap();
    h.client.analytics().dashboard().await.unwrap();
    h.client.treasury().portfolio().await.unwrap();

    let released = h
      .client
      .escrow()
      .release("e1", &IdempotencyKey::new())
      .await
      .unwrap();
    assert!(released.status.is_terminal());

    h.client.escrow().list(&EscrowFilter::default()).await.unwrap();
    h.client.analytics().dashboard().await.unwrap();
    h.client.treasury().portfolio().await.unwrap();

    assert_eq!(h.transport.call_count(Method::Get, "/escrow"), 2);
    assert_eq!(h.transport.call_count(Method::Get, "/dashboard/summary"), 2);
    assert_eq!(h.transport.call_count(Method::Get, "/treasury/portfolio"), 1);
  }

  #[tokio::test]
  async fn test_dispute_carries_reason() {
    let h = TestHarness::signed_in();
    let mut disputed = fixture::escrow("e1", "disputed");
    disputed["disputeReason"] = json!("Work not delivered");
    h.transport
      .respond(Method::Post, "/escrow/e1/dispute", Ok(disputed));

    let contract = h
      .client
      .escrow()
      .dispute(
        "e1",
        &DisputeRequest {
          reason: "Work not delivered".into(),
        },
      )
      .await
      .unwrap();

    assert_eq!(contract.status, Lifecycle::Disputed);
    assert_eq!(contract.dispute_reason.as_deref(), Some("Work not delivered"));
    assert_eq!(
      h.transport.calls()[0].body,
      Some(json!({"reason": "Work not delivered"}))
    );
  }

  #[tokio::test]
  async fn test_failed_release_keeps_cached_contracts() {
    let h = TestHarness::signed_in();
    h.transport
      .respond(Method::Get, "/escrow/e1", Ok(fixture::escrow("e1", "approved")));
    h.transport.respond(
      Method::Post,
      "/escrow/e1/release",
      Err(ApiError::from_status(422, br#"{"error": "Release conditions not met"}"#)),
    );

    h.client.escrow().get("e1").await.unwrap();
    let err = h
      .client
      .escrow()
      .release("e1", &IdempotencyKey::new())
      .await
      .unwrap_err();
    assert_eq!(err.backend_message(), Some("Release conditions not met"));

    h.client.escrow().get("e1").await.unwrap();
    assert_eq!(h.transport.call_count(Method::Get, "/escrow/e1"), 1);
  }
}
