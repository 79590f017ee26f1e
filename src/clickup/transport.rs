//! HTTP transport seam.
//!
//! The fetcher speaks to ClickUp through `Transport` so the paging and
//! caching logic can run against a scripted server in tests.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use url::Url;

use super::error::{ClickupError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.clickup.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
  Delete,
}

/// A request relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  /// Path plus query string, e.g. `/api/v2/view/V1/task?page=0`.
  pub path: String,
  /// Sent verbatim in the `Authorization` header (no `Bearer` prefix).
  pub token: String,
  pub body: Option<Value>,
}

impl ApiRequest {
  pub fn get(path: impl Into<String>, token: &str) -> Self {
    Self {
      method: Method::Get,
      path: path.into(),
      token: token.to_string(),
      body: None,
    }
  }

  pub fn post(path: impl Into<String>, token: &str, body: Value) -> Self {
    Self {
      method: Method::Post,
      path: path.into(),
      token: token.to_string(),
      body: Some(body),
    }
  }

  pub fn delete(path: impl Into<String>, token: &str) -> Self {
    Self {
      method: Method::Delete,
      path: path.into(),
      token: token.to_string(),
      body: None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl ApiResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

#[async_trait]
pub trait Transport: Send + Sync {
  /// Send a request. Only transport failures are errors; any HTTP status
  /// comes back as a response.
  async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Production transport backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
  http: reqwest::Client,
  base_url: String,
}

impl ReqwestTransport {
  pub fn new(base_url: &str) -> Result<Self> {
    let parsed = Url::parse(base_url)
      .map_err(|e| ClickupError::InvalidInput(format!("bad API URL {}: {}", base_url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
      return Err(ClickupError::InvalidInput(format!(
        "bad API URL {}: unsupported scheme",
        base_url
      )));
    }

    let http = reqwest::Client::builder().build()?;

    Ok(Self {
      http,
      base_url: base_url.trim_end_matches('/').to_string(),
    })
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
    let url = format!("{}{}", self.base_url, request.path);
    let builder = match request.method {
      Method::Get => self.http.get(&url),
      Method::Post => self.http.post(&url),
      Method::Delete => self.http.delete(&url),
    };

    let mut builder = builder
      .header(AUTHORIZATION, &request.token)
      .header(CONTENT_TYPE, "application/json");
    if let Some(body) = &request.body {
      let bytes = serde_json::to_vec(body)
        .map_err(|e| ClickupError::InvalidInput(format!("request body: {}", e)))?;
      builder = builder.body(bytes);
    }

    let response = builder.send().await?;
    let status = response.status().as_u16();
    let body = response.bytes().await?.to_vec();

    Ok(ApiResponse { status, body })
  }
}
