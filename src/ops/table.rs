//! The operation table: every domain read and write, with the cache
//! prefixes each write invalidates on success.
//!
//! Cross-domain fan-out lives here and nowhere else. Keep entries in the
//! same order as the domain modules.

/// How a successful write changes the session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityEffect {
  None,
  /// Replace the whole identity (login, signup).
  Establish,
  /// Replace only the organization.
  UpdateOrganization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOp {
  pub name: &'static str,
  /// Shown when the backend gives no message of its own.
  pub fallback: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOp {
  pub name: &'static str,
  /// Key prefixes invalidated when the call succeeds.
  pub invalidates: &'static [&'static [&'static str]],
  pub identity: IdentityEffect,
  /// Money movements must carry an idempotency key.
  pub money_movement: bool,
  pub success: &'static str,
  pub fallback: &'static str,
}

const fn write(
  name: &'static str,
  invalidates: &'static [&'static [&'static str]],
  success: &'static str,
  fallback: &'static str,
) -> WriteOp {
  WriteOp {
    name,
    invalidates,
    identity: IdentityEffect::None,
    money_movement: false,
    success,
    fallback,
  }
}

const fn money(
  name: &'static str,
  invalidates: &'static [&'static [&'static str]],
  success: &'static str,
  fallback: &'static str,
) -> WriteOp {
  WriteOp {
    money_movement: true,
    ..write(name, invalidates, success, fallback)
  }
}

const fn read(name: &'static str, fallback: &'static str) -> ReadOp {
  ReadOp { name, fallback }
}

const AGENTS: &[&str] = &["agents"];
const PAYROLL: &[&str] = &["payroll"];
const PAYROLL_BATCHES: &[&str] = &["payroll", "batches"];
const REMITTANCES: &[&str] = &["remittances"];
const ESCROW: &[&str] = &["escrow"];
const ESCROW_CONTRACTS: &[&str] = &["escrow", "contracts"];
const TREASURY: &[&str] = &["treasury"];
const SETTINGS: &[&str] = &["settings"];
const SETTINGS_PREFERENCES: &[&str] = &["settings", "preferences"];
const SETTINGS_API_KEYS: &[&str] = &["settings", "api-keys"];
const COMPLIANCE_KYC: &[&str] = &["compliance", "kyc"];
const COMPLIANCE_REPORTS: &[&str] = &["compliance", "reports"];
const DASHBOARD: &[&str] = &["dashboard"];

// Auth. The cache is cleared wholesale whenever the identity changes, so
// login and signup declare no prefixes of their own.

pub const LOGIN: WriteOp = WriteOp {
  identity: IdentityEffect::Establish,
  ..write("auth.login", &[], "Signed in", "Sign in failed")
};
pub const SIGNUP: WriteOp = WriteOp {
  identity: IdentityEffect::Establish,
  ..write("auth.signup", &[], "Account created", "Sign up failed")
};
pub const COMPLETE_ONBOARDING: WriteOp = WriteOp {
  identity: IdentityEffect::UpdateOrganization,
  ..write(
    "auth.complete_onboarding",
    &[SETTINGS, DASHBOARD],
    "Onboarding complete",
    "Could not complete onboarding",
  )
};

// Agents

pub const LIST_AGENTS: ReadOp = read("agents.list", "Could not load agents");
pub const GET_AGENT: ReadOp = read("agents.get", "Could not load agent");
pub const CREATE_AGENT: WriteOp = write("agents.create", &[AGENTS], "Agent added", "Could not add agent");
pub const UPDATE_AGENT: WriteOp = write("agents.update", &[AGENTS], "Agent updated", "Could not update agent");
pub const REMOVE_AGENT: WriteOp = write("agents.remove", &[AGENTS], "Agent removed", "Could not remove agent");

// Payroll

pub const LIST_BATCHES: ReadOp = read("payroll.list_batches", "Could not load payroll batches");
pub const GET_BATCH: ReadOp = read("payroll.get_batch", "Could not load payroll batch");
pub const CREATE_BATCH: WriteOp = write(
  "payroll.create_batch",
  &[PAYROLL],
  "Payroll batch created",
  "Could not create payroll batch",
);
pub const SUBMIT_BATCH: WriteOp = write(
  "payroll.submit_batch",
  &[PAYROLL_BATCHES],
  "Batch submitted for approval",
  "Could not submit batch",
);
pub const APPROVE_BATCH: WriteOp = write(
  "payroll.approve_batch",
  &[PAYROLL_BATCHES],
  "Batch approved",
  "Could not approve batch",
);
pub const EXECUTE_BATCH: WriteOp = money(
  "payroll.execute_batch",
  &[PAYROLL_BATCHES, DASHBOARD],
  "Payroll batch executing",
  "Could not execute payroll batch",
);
pub const CANCEL_BATCH: WriteOp = write(
  "payroll.cancel_batch",
  &[PAYROLL_BATCHES],
  "Batch cancelled",
  "Could not cancel batch",
);

// Remittances

pub const LIST_REMITTANCES: ReadOp = read("remittances.list", "Could not load remittances");
pub const QUOTE_REMITTANCE: ReadOp = read("remittances.quote", "Could not fetch a quote");
pub const CREATE_REMITTANCE: WriteOp = money(
  "remittances.create",
  &[REMITTANCES],
  "Remittance sent",
  "Could not send remittance",
);
pub const CANCEL_REMITTANCE: WriteOp = write(
  "remittances.cancel",
  &[REMITTANCES],
  "Remittance cancelled",
  "Could not cancel remittance",
);

// Escrow

pub const LIST_ESCROWS: ReadOp = read("escrow.list", "Could not load escrow contracts");
pub const GET_ESCROW: ReadOp = read("escrow.get", "Could not load escrow contract");
pub const CREATE_ESCROW: WriteOp = write(
  "escrow.create",
  &[ESCROW],
  "Escrow contract created",
  "Could not create escrow contract",
);
pub const APPROVE_ESCROW: WriteOp = write(
  "escrow.approve",
  &[ESCROW_CONTRACTS],
  "Escrow approved",
  "Could not approve escrow",
);
pub const RELEASE_ESCROW: WriteOp = money(
  "escrow.release",
  &[ESCROW_CONTRACTS, DASHBOARD],
  "Escrow funds released",
  "Could not release escrow funds",
);
pub const DISPUTE_ESCROW: WriteOp = write(
  "escrow.dispute",
  &[ESCROW_CONTRACTS],
  "Dispute opened",
  "Could not open dispute",
);
pub const CANCEL_ESCROW: WriteOp = write(
  "escrow.cancel",
  &[ESCROW_CONTRACTS],
  "Escrow cancelled",
  "Could not cancel escrow",
);

// Treasury

pub const GET_PORTFOLIO: ReadOp = read("treasury.portfolio", "Could not load portfolio");
pub const LIST_TRANSACTIONS: ReadOp = read("treasury.transactions", "Could not load transactions");
pub const SWAP: WriteOp = money("treasury.swap", &[TREASURY], "Swap submitted", "Swap failed");
pub const DEPOSIT: WriteOp = money("treasury.deposit", &[TREASURY], "Deposit submitted", "Deposit failed");
pub const WITHDRAW: WriteOp = money(
  "treasury.withdraw",
  &[TREASURY],
  "Withdrawal submitted",
  "Withdrawal failed",
);

// Settings

pub const GET_SETTINGS: ReadOp = read("settings.get", "Could not load settings");
pub const LIST_API_KEYS: ReadOp = read("settings.api_keys", "Could not load API keys");
pub const UPDATE_SETTINGS: WriteOp = write(
  "settings.update",
  &[SETTINGS_PREFERENCES],
  "Settings saved",
  "Could not save settings",
);
pub const UPDATE_ORGANIZATION: WriteOp = WriteOp {
  identity: IdentityEffect::UpdateOrganization,
  ..write(
    "settings.update_organization",
    &[SETTINGS],
    "Organization updated",
    "Could not update organization",
  )
};
pub const CREATE_API_KEY: WriteOp = write(
  "settings.create_api_key",
  &[SETTINGS_API_KEYS],
  "API key created",
  "Could not create API key",
);
pub const REVOKE_API_KEY: WriteOp = write(
  "settings.revoke_api_key",
  &[SETTINGS_API_KEYS],
  "API key revoked",
  "Could not revoke API key",
);

// Compliance. A KYC submission changes the agent's KYC status too.

pub const LIST_KYC: ReadOp = read("compliance.kyc", "Could not load KYC records");
pub const LIST_REPORTS: ReadOp = read("compliance.reports", "Could not load compliance reports");
pub const SUBMIT_KYC: WriteOp = write(
  "compliance.submit_kyc",
  &[COMPLIANCE_KYC, AGENTS],
  "KYC documents submitted",
  "Could not submit KYC documents",
);
pub const GENERATE_REPORT: WriteOp = write(
  "compliance.generate_report",
  &[COMPLIANCE_REPORTS],
  "Report requested",
  "Could not generate report",
);

// Analytics

pub const DASHBOARD_SUMMARY: ReadOp = read("analytics.dashboard", "Could not load dashboard");
pub const ANALYTICS_OVERVIEW: ReadOp = read("analytics.overview", "Could not load analytics");

/// Every write, for review and for table-wide checks.
pub const WRITE_OPERATIONS: &[WriteOp] = &[
  LOGIN,
  SIGNUP,
  COMPLETE_ONBOARDING,
  CREATE_AGENT,
  UPDATE_AGENT,
  REMOVE_AGENT,
  CREATE_BATCH,
  SUBMIT_BATCH,
  APPROVE_BATCH,
  EXECUTE_BATCH,
  CANCEL_BATCH,
  CREATE_REMITTANCE,
  CANCEL_REMITTANCE,
  CREATE_ESCROW,
  APPROVE_ESCROW,
  RELEASE_ESCROW,
  DISPUTE_ESCROW,
  CANCEL_ESCROW,
  SWAP,
  DEPOSIT,
  WITHDRAW,
  UPDATE_SETTINGS,
  UPDATE_ORGANIZATION,
  CREATE_API_KEY,
  REVOKE_API_KEY,
  SUBMIT_KYC,
  GENERATE_REPORT,
];
