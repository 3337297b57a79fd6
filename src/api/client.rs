use std::time::Duration;

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use url::Url;

use crate::config::ApiConfig;
use crate::error::ApiError;

use super::request::{ApiRequest, Method, Transport, IDEMPOTENCY_HEADER};

/// JSON-over-HTTPS transport built on reqwest.
#[derive(Clone)]
pub struct HttpTransport {
  http: reqwest::Client,
  base_url: Url,
  max_retries: u32,
  retry_backoff: Duration,
}

impl HttpTransport {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base_url = Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid API base URL {}: {}", config.base_url, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("API base URL {} cannot be used as a base", base_url));
    }

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!("paydash/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      max_retries: config.max_retries,
      retry_backoff: Duration::from_millis(config.retry_backoff_ms),
    })
  }

  /// Resolve a request path against the base URL, keeping any base path
  /// prefix such as `/v1`.
  fn url(&self, path: &str) -> Result<Url, ApiError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| ApiError::Local("API base URL cannot be a base".into()))?
      .pop_if_empty()
      .extend(path.trim_matches('/').split('/').filter(|s| !s.is_empty()));
    Ok(url)
  }

  async fn send_once(&self, request: &ApiRequest) -> Result<Value, ApiError> {
    let url = self.url(&request.path)?;
    let method = match request.method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Patch => reqwest::Method::PATCH,
      Method::Delete => reqwest::Method::DELETE,
    };

    let mut builder = self.http.request(method, url);
    if !request.query.is_empty() {
      builder = builder.query(&request.query);
    }
    if let Some(token) = &request.bearer {
      builder = builder.bearer_auth(token);
    }
    if let Some(key) = &request.idempotency_key {
      builder = builder.header(IDEMPOTENCY_HEADER, key.as_str());
    }
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder
      .send()
      .await
      .map_err(|e| ApiError::Network(e.to_string()))?;
    let status = response.status();
    let body = response
      .bytes()
      .await
      .map_err(|e| ApiError::Network(e.to_string()))?;

    if !status.is_success() {
      return Err(ApiError::from_status(status.as_u16(), &body));
    }
    if body.is_empty() {
      return Ok(Value::Null);
    }
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
  }

  fn backoff(&self, attempt: u32) -> Duration {
    self.retry_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
    let mut attempt = 0;
    loop {
      match self.send_once(&request).await {
        Err(err)
          if err.is_retryable() && request.is_replay_safe() && attempt < self.max_retries =>
        {
          attempt += 1;
          tracing::warn!(
            path = %request.path,
            attempt,
            error = %err,
            "retrying request after server error"
          );
          tokio::time::sleep(self.backoff(attempt)).await;
        }
        result => return result,
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn transport(base_url: &str) -> HttpTransport {
    HttpTransport::new(&ApiConfig {
      base_url: base_url.to_string(),
      timeout_secs: 5,
      max_retries: 2,
      retry_backoff_ms: 100,
    })
    .unwrap()
  }

  #[test]
  fn test_url_keeps_base_path() {
    let t = transport("https://api.example.com/v1");
    assert_eq!(
      t.url("/payroll/batches").unwrap().as_str(),
      "https://api.example.com/v1/payroll/batches"
    );

    let t = transport("https://api.example.com/v1/");
    assert_eq!(
      t.url("agents/a1").unwrap().as_str(),
      "https://api.example.com/v1/agents/a1"
    );
  }

  #[test]
  fn test_rejects_invalid_base_url() {
    let result = HttpTransport::new(&ApiConfig {
      base_url: "not a url".to_string(),
      timeout_secs: 5,
      max_retries: 0,
      retry_backoff_ms: 0,
    });
    assert!(result.is_err());
  }

  #[test]
  fn test_backoff_is_exponential() {
    let t = transport("https://api.example.com");
    assert_eq!(t.backoff(1), Duration::from_millis(100));
    assert_eq!(t.backoff(2), Duration::from_millis(200));
    assert_eq!(t.backoff(3), Duration::from_millis(400));
  }
}
