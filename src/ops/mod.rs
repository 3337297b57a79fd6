//! Domain operations: reads served through the resource cache, writes
//! sent straight to the backend and followed by their declared
//! invalidations.
//!
//! Every operation is described in [`table`]. Writes never touch the cache
//! or the session unless the backend call succeeded; every failure is
//! reported to the notification sink.

mod agents;
mod analytics;
mod auth;
mod common;
mod compliance;
mod escrow;
mod payroll;
mod remittance;
mod settings;
pub mod table;
mod treasury;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::api::{ApiRequest, Transport};
use crate::cache::{QueryCache, QueryKey};
use crate::error::ApiError;
use crate::notify::{Notification, Notifier};
use crate::session::{Organization, Session, SessionStore};

pub use agents::{Agent, AgentFilter, AgentStatus, AgentUpdate, Agents, NewAgent};
pub use analytics::{Analytics, AnalyticsOverview, CorridorVolume, DailyVolume, DashboardSummary};
pub use auth::{Auth, LoginRequest, OnboardingRequest, SignupRequest};
pub use common::{parse_variant, DateRange, Lifecycle, Money};
pub use compliance::{
  Compliance, ComplianceReport, KycFilter, KycRecord, KycStatus, KycSubmission, ReportKind,
  ReportRequest, ReportStatus,
};
pub use escrow::{DisputeRequest, Escrow, EscrowContract, EscrowFilter, NewEscrow};
pub use payroll::{BatchFilter, NewPayrollBatch, Payroll, PayrollBatch, PayrollItem};
pub use remittance::{
  NewRemittance, Quote, QuoteRequest, Recipient, Remittance, RemittanceFilter, RemittanceStatus,
  Remittances,
};
pub use settings::{
  ApiKey, CreatedApiKey, NewApiKey, NotificationPreferences, OrganizationUpdate, Settings,
  SettingsUpdate, UserSettings,
};
pub use table::{IdentityEffect, ReadOp, WriteOp};
pub use treasury::{
  DepositRequest, Holding, Portfolio, SwapRequest, Transaction, TransactionFilter,
  TransactionKind, Treasury, WithdrawRequest,
};

/// Entry point to every domain operation.
///
/// Holds the process-wide session store, resource cache, transport and
/// notification sink. Clones share all four.
#[derive(Clone)]
pub struct Client {
  transport: Arc<dyn Transport>,
  session: Arc<SessionStore>,
  cache: QueryCache,
  notifier: Arc<dyn Notifier>,
}

impl Client {
  pub fn new(
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    cache: QueryCache,
    notifier: Arc<dyn Notifier>,
  ) -> Self {
    Self {
      transport,
      session,
      cache,
      notifier,
    }
  }

  pub fn session(&self) -> &SessionStore {
    &self.session
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  pub fn auth(&self) -> Auth<'_> {
    Auth::new(self)
  }

  pub fn agents(&self) -> Agents<'_> {
    Agents::new(self)
  }

  pub fn payroll(&self) -> Payroll<'_> {
    Payroll::new(self)
  }

  pub fn remittances(&self) -> Remittances<'_> {
    Remittances::new(self)
  }

  pub fn escrow(&self) -> Escrow<'_> {
    Escrow::new(self)
  }

  pub fn treasury(&self) -> Treasury<'_> {
    Treasury::new(self)
  }

  pub fn settings(&self) -> Settings<'_> {
    Settings::new(self)
  }

  pub fn compliance(&self) -> Compliance<'_> {
    Compliance::new(self)
  }

  pub fn analytics(&self) -> Analytics<'_> {
    Analytics::new(self)
  }

  /// Token to send with a request for `identity`. Login and signup are
  /// never sent with the current session's token.
  fn bearer_for(&self, identity: IdentityEffect) -> Option<String> {
    match identity {
      IdentityEffect::Establish => None,
      IdentityEffect::None | IdentityEffect::UpdateOrganization => self.session.token(),
    }
  }

  /// Run a cached read. `build` derives the cache key and the request.
  ///
  /// A failure is reported by the fetch that hit the network, so callers
  /// that joined it do not report it again.
  async fn read<T, F>(&self, op: &ReadOp, build: F) -> Result<T, ApiError>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Result<(QueryKey, ApiRequest), ApiError>,
  {
    let op = *op;
    let (key, request) = build().map_err(|err| self.report_failure(op.name, op.fallback, err, None))?;
    let bearer = self.bearer_for(IdentityEffect::None);
    let request = request.with_bearer(bearer.clone());
    let client = self.clone();

    self
      .cache
      .fetch(&key, move || async move {
        let outcome = match client.transport.send(request).await {
          Ok(value) => decode::<T>(value),
          Err(err) => Err(err),
        };
        outcome.map_err(|err| client.report_failure(op.name, op.fallback, err, bearer.as_deref()))
      })
      .await
      .map(|result| result.data)
  }

  /// Run a write: one network call, then the declared invalidations and
  /// identity effect.
  async fn write<T, F>(&self, op: &WriteOp, build: F) -> Result<T, ApiError>
  where
    T: DeserializeOwned,
    F: FnOnce() -> Result<ApiRequest, ApiError>,
  {
    let bearer = self.bearer_for(op.identity);
    match self.send_write(op, bearer.clone(), build).await {
      Ok(data) => {
        self.notifier.notify(Notification::success(op.name, op.success));
        Ok(data)
      }
      Err(err) => Err(self.report_failure(op.name, op.fallback, err, bearer.as_deref())),
    }
  }

  async fn send_write<T, F>(&self, op: &WriteOp, bearer: Option<String>, build: F) -> Result<T, ApiError>
  where
    T: DeserializeOwned,
    F: FnOnce() -> Result<ApiRequest, ApiError>,
  {
    let request = build()?;
    if op.money_movement && request.idempotency_key.is_none() {
      return Err(ApiError::Local(format!(
        "{} requires an idempotency key",
        op.name
      )));
    }

    let value = self.transport.send(request.with_bearer(bearer)).await?;

    // The backend has applied the write; its effects stand even if the
    // response body turns out to be unreadable.
    for prefix in op.invalidates {
      self.cache.invalidate(&QueryKey::from_path(prefix));
    }

    match op.identity {
      IdentityEffect::None => {}
      IdentityEffect::Establish => self.establish(decode(value.clone())?),
      IdentityEffect::UpdateOrganization => self.update_organization(decode(value.clone())?),
    }

    decode(value)
  }

  /// Install a new identity. Cached data belonged to the old one.
  fn establish(&self, session: Session) {
    self.session.establish(session);
    self.cache.clear();
  }

  fn update_organization(&self, organization: Organization) {
    if !self.session.update_organization(organization) {
      tracing::warn!("organization changed but no session is active");
    }
  }

  fn sign_out(&self) {
    self.session.clear();
    self.cache.clear();
  }

  /// Log and notify a failure. A rejected token signs its session out,
  /// unless another identity has been established since it was sent.
  fn report_failure(
    &self,
    operation: &'static str,
    fallback: &str,
    err: ApiError,
    sent_with: Option<&str>,
  ) -> ApiError {
    if err.is_authorization() {
      if let Some(token) = sent_with {
        if self.session.revoke(token) {
          tracing::warn!(operation, "credentials rejected, signed out");
          self.cache.clear();
        }
      }
    }
    tracing::warn!(operation, kind = err.kind(), error = %err, "operation failed");
    self
      .notifier
      .notify(Notification::error(operation, err.user_message(fallback)));
    err
  }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
  serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}
