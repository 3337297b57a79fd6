//! Test doubles: a scripted transport and a wired-up client.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::{ApiRequest, Method, Transport};
use crate::cache::{QueryCache, StalePolicy};
use crate::error::ApiError;
use crate::notify::RecordingNotifier;
use crate::ops::Client;
use crate::session::{MemoryStorage, Session, SessionStore};

type Outcome = Result<Value, ApiError>;

#[derive(Default)]
struct Route {
  queued: VecDeque<Outcome>,
  standing: Option<Outcome>,
}

/// Transport that answers from a script keyed by method and path
/// (query strings are ignored) and records every request.
#[derive(Default)]
pub struct FakeTransport {
  routes: Mutex<HashMap<(Method, String), Route>>,
  calls: Mutex<Vec<ApiRequest>>,
  latency: Mutex<Duration>,
}

impl FakeTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Answer every call to this route with `outcome`.
  pub fn respond(&self, method: Method, path: &str, outcome: Outcome) {
    let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
    routes.entry((method, path.to_string())).or_default().standing = Some(outcome);
  }

  /// Answer the next call to this route with `outcome`, ahead of the
  /// standing answer.
  pub fn respond_once(&self, method: Method, path: &str, outcome: Outcome) {
    let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
    routes
      .entry((method, path.to_string()))
      .or_default()
      .queued
      .push_back(outcome);
  }

  pub fn set_latency(&self, latency: Duration) {
    *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
  }

  pub fn calls(&self) -> Vec<ApiRequest> {
    self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  pub fn call_count(&self, method: Method, path: &str) -> usize {
    self
      .calls()
      .iter()
      .filter(|c| c.method == method && c.path == path)
      .count()
  }

  fn next_outcome(&self, method: Method, path: &str) -> Outcome {
    let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
    let route = routes.get_mut(&(method, path.to_string()));
    match route {
      Some(route) => match route.queued.pop_front() {
        Some(outcome) => outcome,
        None => route.standing.clone().unwrap_or_else(|| no_route(path)),
      },
      None => no_route(path),
    }
  }
}

fn no_route(path: &str) -> Outcome {
  Err(ApiError::Validation {
    status: 404,
    message: Some(format!("no scripted response for {}", path)),
  })
}

#[async_trait]
impl Transport for FakeTransport {
  async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
    let outcome = self.next_outcome(request.method, &request.path);
    self
      .calls
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(request);

    let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
    if !latency.is_zero() {
      tokio::time::sleep(latency).await;
    }
    outcome
  }
}

/// A client wired to a fake transport, in-memory storage and a recording
/// notifier.
pub struct TestHarness {
  pub client: Client,
  pub transport: Arc<FakeTransport>,
  pub notifier: Arc<RecordingNotifier>,
  pub storage: MemoryStorage,
}

impl TestHarness {
  pub fn new() -> Self {
    Self::with_policy(StalePolicy::new())
  }

  pub fn with_policy(policy: StalePolicy) -> Self {
    let transport = Arc::new(FakeTransport::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let storage = MemoryStorage::new();
    let session = Arc::new(SessionStore::new(Box::new(storage.clone())));
    session.restore();

    let client = Client::new(
      transport.clone(),
      session,
      QueryCache::new(policy),
      notifier.clone(),
    );

    Self {
      client,
      transport,
      notifier,
      storage,
    }
  }

  /// Harness with an active session holding token `tok_abc`.
  pub fn signed_in() -> Self {
    let harness = Self::new();
    let session: Session = serde_json::from_value(session_json("tok_abc")).unwrap();
    harness.client.session().establish(session);
    harness
  }
}

/// Login/signup response body.
pub fn session_json(token: &str) -> Value {
  json!({
    "token": token,
    "user": {"id": "u1", "email": "ada@example.com", "name": "Ada", "role": "owner"},
    "organization": {"id": "o1", "name": "Acme", "country": "KE", "onboardingCompleted": false},
  })
}

/// Canned response bodies for each domain.
pub mod fixture {
  use serde_json::{json, Value};

  pub fn money(amount: i64) -> Value {
    json!({"amount": amount, "currency": "USD"})
  }

  pub fn agent(id: &str) -> Value {
    json!({
      "id": id,
      "name": "Wanjiru Kamau",
      "email": "wanjiru@example.com",
      "country": "KE",
      "status": "active",
      "kycStatus": "verified",
      "createdAt": "2024-03-01T09:00:00Z",
    })
  }

  pub fn batch(id: &str, status: &str) -> Value {
    json!({
      "id": id,
      "name": "March payroll",
      "status": status,
      "total": money(1_250_000),
      "items": [{"agentId": "a1", "amount": money(1_250_000)}],
      "createdAt": "2024-03-25T09:00:00Z",
    })
  }

  pub fn remittance(id: &str) -> Value {
    json!({
      "id": id,
      "recipient": {"name": "Juan Perez", "country": "MX", "mobileWallet": "+5215550000"},
      "sendAmount": money(50_000),
      "receiveAmount": {"amount": 855_000, "currency": "MXN"},
      "fxRate": 17.1,
      "fee": money(299),
      "status": "pending",
      "createdAt": "2024-03-25T09:00:00Z",
    })
  }

  pub fn quote() -> Value {
    json!({
      "sendAmount": money(50_000),
      "receiveAmount": {"amount": 855_000, "currency": "MXN"},
      "fxRate": 17.1,
      "fee": money(299),
      "expiresAt": "2024-03-25T09:15:00Z",
    })
  }

  pub fn escrow(id: &str, status: &str) -> Value {
    json!({
      "id": id,
      "title": "Website build",
      "counterparty": "Studio Nine",
      "amount": money(400_000),
      "status": status,
      "createdAt": "2024-03-01T09:00:00Z",
    })
  }

  pub fn portfolio() -> Value {
    json!({
      "totalValue": money(9_800_000),
      "holdings": [
        {"asset": "USDC", "quantity": "58000.00", "value": money(5_800_000)},
        {"asset": "BTC", "quantity": "0.61", "value": money(4_000_000)},
      ],
      "asOf": "2024-03-25T09:00:00Z",
    })
  }

  pub fn transaction(id: &str, kind: &str) -> Value {
    json!({
      "id": id,
      "kind": kind,
      "amount": money(100_000),
      "createdAt": "2024-03-25T09:00:00Z",
    })
  }

  pub fn settings() -> Value {
    json!({
      "defaultCurrency": "USD",
      "timezone": "Africa/Nairobi",
      "twoFactorEnabled": true,
      "notifications": {"email": true, "sms": false, "push": true},
    })
  }

  pub fn api_key(id: &str) -> Value {
    json!({
      "id": id,
      "name": "Payroll export",
      "prefix": "pk_live_4f2",
      "createdAt": "2024-03-01T09:00:00Z",
    })
  }

  pub fn organization(name: &str, onboarded: bool) -> Value {
    json!({
      "id": "o1",
      "name": name,
      "country": "KE",
      "businessType": "fintech",
      "onboardingCompleted": onboarded,
    })
  }

  pub fn kyc_record(agent_id: &str, status: &str) -> Value {
    json!({
      "agentId": agent_id,
      "agentName": "Wanjiru Kamau",
      "status": status,
      "submittedAt": "2024-03-02T09:00:00Z",
    })
  }

  pub fn report(id: &str) -> Value {
    json!({
      "id": id,
      "kind": "aml",
      "period": {"from": "2024-01-01", "to": "2024-03-31"},
      "status": "generating",
      "createdAt": "2024-04-01T09:00:00Z",
    })
  }

  pub fn dashboard() -> Value {
    json!({
      "totalBalance": money(9_800_000),
      "pendingPayrollBatches": 2,
      "activeEscrows": 1,
      "remittanceVolume30d": money(2_300_000),
      "activeAgents": 14,
    })
  }

  pub fn overview() -> Value {
    json!({
      "range": {"from": "2024-03-01", "to": "2024-03-31"},
      "daily": [{"date": "2024-03-01", "volume": money(120_000)}],
      "corridors": [{"corridor": "USD-MXN", "volume": money(900_000), "count": 31}],
    })
  }
}
