use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::api::ApiRequest;
use crate::cache::QueryKey;
use crate::error::ApiError;
use crate::session::Organization;

use super::{table, Client};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
  pub email: bool,
  pub sms: bool,
  pub push: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
  pub default_currency: String,
  pub timezone: String,
  pub two_factor_enabled: bool,
  pub notifications: NotificationPreferences,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default_currency: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timezone: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub two_factor_enabled: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notifications: Option<NotificationPreferences>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUpdate {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub country: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub business_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
  pub id: String,
  pub name: String,
  /// First characters of the key, for recognising it in lists.
  pub prefix: String,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApiKey {
  pub name: String,
}

/// A freshly created key. `secret` is only ever returned once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedApiKey {
  #[serde(flatten)]
  pub key: ApiKey,
  pub secret: String,
}

pub struct Settings<'a> {
  client: &'a Client,
}

impl<'a> Settings<'a> {
  pub(super) fn new(client: &'a Client) -> Self {
    Self { client }
  }

  pub async fn get(&self) -> Result<UserSettings, ApiError> {
    self
      .client
      .read(&table::GET_SETTINGS, || {
        Ok((
          QueryKey::new("settings").scope("preferences"),
          ApiRequest::get("/settings"),
        ))
      })
      .await
  }

  pub async fn api_keys(&self) -> Result<Vec<ApiKey>, ApiError> {
    self
      .client
      .read(&table::LIST_API_KEYS, || {
        Ok((
          QueryKey::new("settings").scope("api-keys"),
          ApiRequest::get("/settings/api-keys"),
        ))
      })
      .await
  }

  pub async fn update(&self, update: &SettingsUpdate) -> Result<UserSettings, ApiError> {
    self
      .client
      .write(&table::UPDATE_SETTINGS, || {
        ApiRequest::patch("/settings").with_json(update)
      })
      .await
  }

  /// Rename or re-register the organization. The session picks up the
  /// returned organization.
  pub async fn update_organization(
    &self,
    update: &OrganizationUpdate,
  ) -> Result<Organization, ApiError> {
    self
      .client
      .write(&table::UPDATE_ORGANIZATION, || {
        ApiRequest::patch("/organization").with_json(update)
      })
      .await
  }

  pub async fn create_api_key(&self, key: &NewApiKey) -> Result<CreatedApiKey, ApiError> {
    self
      .client
      .write(&table::CREATE_API_KEY, || {
        ApiRequest::post("/settings/api-keys").with_json(key)
      })
      .await
  }

  pub async fn revoke_api_key(&self, id: &str) -> Result<(), ApiError> {
    // Deletes answer with anything from an empty body to a status object.
    let _: IgnoredAny = self
      .client
      .write(&table::REVOKE_API_KEY, || {
        Ok(ApiRequest::delete(format!("/settings/api-keys/{}", id)))
      })
      .await?;
    Ok(())
  }
}
