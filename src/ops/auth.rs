use serde::{Deserialize, Serialize};

use crate::api::ApiRequest;
use crate::error::ApiError;
use crate::notify::Notification;
use crate::session::{Organization, Session, User};

use super::{table, Client};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
  pub email: String,
  pub password: String,
}

impl std::fmt::Debug for LoginRequest {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LoginRequest")
      .field("email", &self.email)
      .finish_non_exhaustive()
  }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
  pub name: String,
  pub email: String,
  pub password: String,
  pub company_name: String,
}

impl std::fmt::Debug for SignupRequest {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SignupRequest")
      .field("name", &self.name)
      .field("email", &self.email)
      .field("company_name", &self.company_name)
      .finish_non_exhaustive()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
  pub country: String,
  pub business_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub monthly_volume: Option<String>,
  #[serde(default)]
  pub use_cases: Vec<String>,
}

pub struct Auth<'a> {
  client: &'a Client,
}

impl<'a> Auth<'a> {
  pub(super) fn new(client: &'a Client) -> Self {
    Self { client }
  }

  /// Exchange credentials for a session. Cached data from any previous
  /// identity is dropped.
  pub async fn login(&self, credentials: &LoginRequest) -> Result<User, ApiError> {
    let session: Session = self
      .client
      .write(&table::LOGIN, || {
        ApiRequest::post("/auth/login").with_json(credentials)
      })
      .await?;
    Ok(session.user)
  }

  pub async fn signup(&self, account: &SignupRequest) -> Result<User, ApiError> {
    let session: Session = self
      .client
      .write(&table::SIGNUP, || {
        ApiRequest::post("/auth/signup").with_json(account)
      })
      .await?;
    Ok(session.user)
  }

  pub async fn complete_onboarding(
    &self,
    onboarding: &OnboardingRequest,
  ) -> Result<Organization, ApiError> {
    self
      .client
      .write(&table::COMPLETE_ONBOARDING, || {
        ApiRequest::post("/onboarding/complete").with_json(onboarding)
      })
      .await
  }

  /// End the session locally. The backend keeps no session state to tear
  /// down, so this never fails.
  pub fn logout(&self) {
    self.client.sign_out();
    self
      .client
      .notifier
      .notify(Notification::success("auth.logout", "Signed out"));
  }
}
