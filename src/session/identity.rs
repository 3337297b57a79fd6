use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Bearer credential. Never empty, never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AuthToken(String);

impl AuthToken {
  pub fn new(raw: impl Into<String>) -> Result<Self, ApiError> {
    let raw = raw.into();
    if raw.trim().is_empty() {
      return Err(ApiError::Local("auth token must not be empty".into()));
    }
    Ok(Self(raw))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl TryFrom<String> for AuthToken {
  type Error = ApiError;

  fn try_from(raw: String) -> Result<Self, Self::Error> {
    Self::new(raw)
  }
}

impl From<AuthToken> for String {
  fn from(token: AuthToken) -> Self {
    token.0
  }
}

impl std::fmt::Debug for AuthToken {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("AuthToken(<redacted>)")
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
  Owner,
  Admin,
  Member,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: String,
  pub email: String,
  pub name: String,
  pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub country: Option<String>,
  #[serde(default)]
  pub business_type: Option<String>,
  #[serde(default)]
  pub onboarding_completed: bool,
}

/// The authenticated identity. Holding a `Session` means holding a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  pub token: AuthToken,
  pub user: User,
  /// Absent until the account has an organization attached.
  #[serde(default)]
  pub organization: Option<Organization>,
}
