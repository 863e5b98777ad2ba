//! NetBox API transport
//!
//! Read-only GET access to the NetBox REST API, authenticated with a
//! `Token` header.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::TransportError;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const ERROR_BODY_PREVIEW: usize = 200;

/// GET access to the NetBox API
#[async_trait]
pub trait NetboxTransport: Send + Sync {
    /// `path` is relative to the API root, e.g. `ipam/prefixes/`, or an
    /// absolute object URL
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, TransportError>;
}

pub type SharedTransport = Arc<dyn NetboxTransport>;

/// NetBox API client over a pooled reqwest client
pub struct HttpTransport {
    http: Client,
    api_root: String,
    token: Option<String>,
}

impl HttpTransport {
    /// `api_root` is the configured `netbox_url` without a trailing slash
    pub fn new(api_root: impl Into<String>, token: Option<String>) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            http,
            api_root: api_root.into(),
            token,
        })
    }
}

#[async_trait]
impl NetboxTransport for HttpTransport {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, TransportError> {
        // Object URLs on another host are requested as given
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.api_root, path.trim_start_matches('/'))
        };

        let mut request = self
            .http
            .get(&url)
            .query(query)
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Token {}", token));
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_PREVIEW).collect(),
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
