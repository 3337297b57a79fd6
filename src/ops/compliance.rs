use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ApiRequest;
use crate::cache::QueryKey;
use crate::error::ApiError;

use super::common::DateRange;
use super::{table, Client};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
  NotStarted,
  Pending,
  Verified,
  Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycRecord {
  pub agent_id: String,
  pub agent_name: String,
  pub status: KycStatus,
  #[serde(default)]
  pub submitted_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub reviewed_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycFilter {
  pub status: Option<KycStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycSubmission {
  pub agent_id: String,
  pub document_type: String,
  pub document_number: String,
  /// Where the scanned document was uploaded.
  pub document_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
  Transactions,
  Kyc,
  Aml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
  Generating,
  Ready,
  Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
  pub id: String,
  pub kind: ReportKind,
  pub period: DateRange,
  pub status: ReportStatus,
  /// Set once the report is ready.
  #[serde(default)]
  pub download_url: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
  pub kind: ReportKind,
  pub period: DateRange,
}

pub struct Compliance<'a> {
  client: &'a Client,
}

impl<'a> Compliance<'a> {
  pub(super) fn new(client: &'a Client) -> Self {
    Self { client }
  }

  pub async fn kyc_records(&self, filter: &KycFilter) -> Result<Vec<KycRecord>, ApiError> {
    self
      .client
      .read(&table::LIST_KYC, || {
        Ok((
          QueryKey::new("compliance").scope("kyc").params(filter)?,
          ApiRequest::get("/compliance/kyc").with_query(filter)?,
        ))
      })
      .await
  }

  pub async fn reports(&self) -> Result<Vec<ComplianceReport>, ApiError> {
    self
      .client
      .read(&table::LIST_REPORTS, || {
        Ok((
          QueryKey::new("compliance").scope("reports"),
          ApiRequest::get("/compliance/reports"),
        ))
      })
      .await
  }

  pub async fn submit_kyc(&self, submission: &KycSubmission) -> Result<KycRecord, ApiError> {
    self
      .client
      .write(&table::SUBMIT_KYC, || {
        ApiRequest::post("/compliance/kyc").with_json(submission)
      })
      .await
  }

  /// Ask the backend to build a report. It starts out `generating`; poll
  /// [`Compliance::reports`] for the download link.
  pub async fn generate_report(&self, request: &ReportRequest) -> Result<ComplianceReport, ApiError> {
    self
      .client
      .write(&table::GENERATE_REPORT, || {
        ApiRequest::post("/compliance/reports").with_json(request)
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::Method;
  use crate::ops::AgentFilter;
  use crate::testing::{fixture, TestHarness};
  use chrono::NaiveDate;
  use serde_json::json;

  #[tokio::test]
  async fn test_kyc_submission_refreshes_agents() {
    let h = TestHarness::signed_in();
    h.transport.respond(
      Method::Get,
      "/compliance/kyc",
      Ok(json!([fixture::kyc_record("a1", "not_started")])),
    );
    h.transport
      .respond(Method::Get, "/agents", Ok(json!([fixture::agent("a1")])));
    h.transport.respond(
      Method::Post,
      "/compliance/kyc",
      Ok(fixture::kyc_record("a1", "pending")),
    );

    let records = h.client.compliance().kyc_records(&KycFilter::default()).await.unwrap();
    assert_eq!(records[0].status, KycStatus::NotStarted);
    h.client.agents().list(&AgentFilter::default()).await.unwrap();

    let record = h
      .client
      .compliance()
      .submit_kyc(&KycSubmission {
        agent_id: "a1".into(),
        document_type: "passport".into(),
        document_number: "K1234567".into(),
        document_url: "https://files.example.com/k1.pdf".into(),
      })
      .await
      .unwrap();
    assert_eq!(record.status, KycStatus::Pending);

    h.client.compliance().kyc_records(&KycFilter::default()).await.unwrap();
    h.client.agents().list(&AgentFilter::default()).await.unwrap();
    assert_eq!(h.transport.call_count(Method::Get, "/compliance/kyc"), 2);
    assert_eq!(h.transport.call_count(Method::Get, "/agents"), 2);
  }

  #[tokio::test]
  async fn test_generate_report() {
    let h = TestHarness::signed_in();
    h.transport
      .respond(Method::Get, "/compliance/reports", Ok(json!([])));
    h.transport
      .respond(Method::Post, "/compliance/reports", Ok(fixture::report("rep1")));

    assert!(h.client.compliance().reports().await.unwrap().is_empty());

    let period = DateRange {
      from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
      to: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    };
    let report = h
      .client
      .compliance()
      .generate_report(&ReportRequest {
        kind: ReportKind::Aml,
        period: period.clone(),
      })
      .await
      .unwrap();

    assert_eq!(report.status, ReportStatus::Generating);
    assert_eq!(report.period, period);
    assert!(report.download_url.is_none());
    assert_eq!(
      h.transport.calls()[1].body,
      Some(json!({"kind": "aml", "period": {"from": "2024-01-01", "to": "2024-03-31"}}))
    );

    h.client.compliance().reports().await.unwrap();
    assert_eq!(h.transport.call_count(Method::Get, "/compliance/reports"), 2);
  }
}
