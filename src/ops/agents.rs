use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::api::ApiRequest;
use crate::cache::QueryKey;
use crate::error::ApiError;

use super::compliance::KycStatus;
use super::{table, Client};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
  Active,
  Invited,
  Suspended,
}

/// A field agent or worker paid through the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
  pub id: String,
  pub name: String,
  pub email: String,
  #[serde(default)]
  pub phone: Option<String>,
  pub country: String,
  pub status: AgentStatus,
  pub kyc_status: KycStatus,
  #[serde(default)]
  pub wallet_address: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentFilter {
  pub status: Option<AgentStatus>,
  pub kyc_status: Option<KycStatus>,
  pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAgent {
  pub name: String,
  pub email: String,
  #[serde(default)]
  pub phone: Option<String>,
  pub country: String,
  #[serde(default)]
  pub wallet_address: Option<String>,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentUpdate {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<AgentStatus>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub wallet_address: Option<String>,
}

pub struct Agents<'a> {
  client: &'a Client,
}

impl<'a> Agents<'a> {
  pub(super) fn new(client: &'a Client) -> Self {
    Self { client }
  }

  pub async fn list(&self, filter: &AgentFilter) -> Result<Vec<Agent>, ApiError> {
    self
      .client
      .read(&table::LIST_AGENTS, || {
        Ok((
          QueryKey::new("agents").scope("list").params(filter)?,
          ApiRequest::get("/agents").with_query(filter)?,
        ))
      })
      .await
  }

  pub async fn get(&self, id: &str) -> Result<Agent, ApiError> {
    self
      .client
      .read(&table::GET_AGENT, || {
        Ok((
          QueryKey::new("agents").scope("detail").scope(id),
          ApiRequest::get(format!("/agents/{}", id)),
        ))
      })
      .await
  }

  pub async fn create(&self, agent: &NewAgent) -> Result<Agent, ApiError> {
    self
      .client
      .write(&table::CREATE_AGENT, || {
        ApiRequest::post("/agents").with_json(agent)
      })
      .await
  }

  pub async fn update(&self, id: &str, update: &AgentUpdate) -> Result<Agent, ApiError> {
    self
      .client
      .write(&table::UPDATE_AGENT, || {
        ApiRequest::patch(format!("/agents/{}", id)).with_json(update)
      })
      .await
  }

  pub async fn remove(&self, id: &str) -> Result<(), ApiError> {
    // Deletes answer with anything from an empty body to a status object.
    let _: IgnoredAny = self
      .client
      .write(&table::REMOVE_AGENT, || {
        Ok(ApiRequest::delete(format!("/agents/{}", id)))
      })
      .await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::Method;
  use crate::testing::{fixture, TestHarness};
  use serde_json::json;

  #[tokio::test]
  async fn test_equal_filters_share_one_fetch() {
    let h = TestHarness::signed_in();
    h.transport
      .respond(Method::Get, "/agents", Ok(json!([fixture::agent("a1")])));

    let filter = AgentFilter {
      status: Some(AgentStatus::Active),
      search: Some("wan".into()),
      ..Default::default()
    };
    let first = h.client.agents().list(&filter).await.unwrap();
    let second = h.client.agents().list(&filter.clone()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first[0].kyc_status, KycStatus::Verified);
    assert_eq!(h.transport.call_count(Method::Get, "/agents"), 1);

    let suspended = AgentFilter {
      status: Some(AgentStatus::Suspended),
      ..Default::default()
    };
    h.client.agents().list(&suspended).await.unwrap();
    assert_eq!(h.transport.call_count(Method::Get, "/agents"), 2);

    let calls = h.transport.calls();
    assert_eq!(
      calls[1].query,
      vec![("status".to_string(), "suspended".to_string())]
    );
  }

  #[tokio::test]
  async fn test_writes_invalidate_lists_and_details() {
    let h = TestHarness::signed_in();
    h.transport
      .respond(Method::Get, "/agents", Ok(json!([fixture::agent("a1")])));
    h.transport
      .respond(Method::Get, "/agents/a1", Ok(fixture::agent("a1")));
    h.transport
      .respond(Method::Patch, "/agents/a1", Ok(fixture::agent("a1")));

    h.client.agents().list(&AgentFilter::default()).await.unwrap();
    h.client.agents().get("a1").await.unwrap();

    let update = AgentUpdate {
      status: Some(AgentStatus::Suspended),
      ..Default::default()
    };
    h.client.agents().update("a1", &update).await.unwrap();

    let patch = h
      .transport
      .calls()
      .into_iter()
      .find(|c| c.method == Method::Patch)
      .unwrap();
    assert_eq!(patch.body, Some(json!({"status": "suspended"})));

    h.client.agents().list(&AgentFilter::default()).await.unwrap();
    h.client.agents().get("a1").await.unwrap();
    assert_eq!(h.transport.call_count(Method::Get, "/agents"), 2);
    assert_eq!(h.transport.call_count(Method::Get, "/agents/a1"), 2);
  }

  #[tokio::test]
  async fn test_remove_accepts_any_success_body() {
    let h = TestHarness::signed_in();
    h.transport
      .respond_once(Method::Delete, "/agents/a1", Ok(serde_json::Value::Null));
    h.transport.respond(
      Method::Delete,
      "/agents/a2",
      Ok(serde_json::json!({"success": true})),
    );

    h.client.agents().remove("a1").await.unwrap();
    h.client.agents().remove("a2").await.unwrap();

    assert_eq!(h.notifier.notifications().len(), 2);
    assert!(h.notifier.errors().is_empty());
  }
}
