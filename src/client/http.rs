//! TSDS HTTP transport
//!
//! reqwest client for the TSDS web service.

use super::{DatasourceRequest, Method, Transport, TransportError, TransportResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// HTTP transport bound to one TSDS base URL
///
/// The client keeps no cookie store, so `with_credentials` has nothing to
/// forward here. Authentication travels in the `Authorization` header only.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for `base_url` (e.g. "http://tsds.example.net/tsds")
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: DatasourceRequest) -> Result<TransportResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.endpoint.path());
        let request_id = uuid::Uuid::new_v4();

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            request_id = %request_id,
            path = request.endpoint.path(),
            "Sending TSDS request"
        );

        let response = builder.send().await.map_err(TransportError::from_reqwest)?;
        let status = response.status();
        let text = response.text().await.map_err(TransportError::from_reqwest)?;

        if !status.is_success() {
            tracing::debug!(
                request_id = %request_id,
                status = status.as_u16(),
                "TSDS request failed"
            );
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: text,
            });
        }

        let data = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(TransportResponse {
            status: status.as_u16(),
            data,
        })
    }
}
