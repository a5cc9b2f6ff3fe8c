//! TSDS Transport
//!
//! Request construction and the transport seam between the datasource and
//! the TSDS web service.
//!
//! ## Architecture
//!
//! - **DatasourceRequest**: endpoint, method, JSON body and headers
//! - **AuthContext**: credentials, passed explicitly to every request builder
//! - **Transport**: anything that can deliver a request (HTTP, test doubles)
//! - **HttpTransport**: reqwest-backed transport
//!
//! Transports own connection handling and timeouts. The datasource never
//! retries; failures surface to the caller as `TransportError`.

mod error;
mod http;
#[cfg(test)]
pub(crate) mod testing;

pub use error::TransportError;
pub use http::HttpTransport;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// TSDS web service endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Query,
    Search,
    Test,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Query => "/query",
            Self::Search => "/search",
            Self::Test => "/test",
        }
    }
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Credentials attached to outbound requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    /// Pre-encoded `Authorization` header value (e.g. `Basic dXNlcjpwdw==`)
    pub authorization: Option<String>,
    /// Forward ambient credentials (cookies) with the request
    pub with_credentials: bool,
}

impl AuthContext {
    /// No credentials
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Basic authentication with a pre-encoded header value
    pub fn basic(header_value: impl Into<String>) -> Self {
        Self {
            authorization: Some(header_value.into()),
            with_credentials: true,
        }
    }
}

/// A request to one TSDS endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct DatasourceRequest {
    pub endpoint: Endpoint,
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    /// Ask the caller's environment to attach its ambient credentials.
    /// Transports without ambient credentials ignore it and send only
    /// the explicit `Authorization` header.
    pub with_credentials: bool,
}

impl DatasourceRequest {
    /// A JSON POST request
    pub fn post<T: Serialize>(
        endpoint: Endpoint,
        body: &T,
        auth: &AuthContext,
    ) -> Result<Self, TransportError> {
        let body = serde_json::to_value(body).map_err(|e| TransportError::Encode(e.to_string()))?;

        let mut request = Self {
            endpoint,
            method: Method::Post,
            body: Some(body),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            with_credentials: false,
        };
        request.apply_auth(auth);
        Ok(request)
    }

    /// A bodiless GET request
    pub fn get(endpoint: Endpoint, auth: &AuthContext) -> Self {
        let mut request = Self {
            endpoint,
            method: Method::Get,
            body: None,
            headers: Vec::new(),
            with_credentials: false,
        };
        request.apply_auth(auth);
        request
    }

    fn apply_auth(&mut self, auth: &AuthContext) {
        if auth.authorization.is_some() || auth.with_credentials {
            self.with_credentials = true;
        }
        if let Some(value) = &auth.authorization {
            self.headers.push(("Authorization".to_string(), value.clone()));
        }
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A successful response
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// Decoded JSON body; `Null` for empty bodies
    pub data: Value,
}

/// Delivers requests to the TSDS web service
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request; non-success statuses are errors
    async fn send(&self, request: DatasourceRequest) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_with_basic_auth() {
        let auth = AuthContext::basic("Basic dXNlcjpwdw==");
        let request =
            DatasourceRequest::post(Endpoint::Search, &json!({"type": "Column"}), &auth).unwrap();

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.endpoint.path(), "/search");
        assert_eq!(request.header("authorization"), Some("Basic dXNlcjpwdw=="));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert!(request.with_credentials);
    }

    #[test]
    fn test_get_anonymous() {
        let request = DatasourceRequest::get(Endpoint::Test, &AuthContext::anonymous());
        assert!(request.body.is_none());
        assert!(request.headers.is_empty());
        assert!(!request.with_credentials);
    }

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::Query.path(), "/query");
        assert_eq!(Endpoint::Search.path(), "/search");
        assert_eq!(Endpoint::Test.path(), "/test");
    }

    #[test]
    fn test_with_credentials_without_header() {
        let auth = AuthContext {
            authorization: None,
            with_credentials: true,
        };
        let request = DatasourceRequest::get(Endpoint::Query, &auth);
        assert!(request.with_credentials);
        assert_eq!(request.header("Authorization"), None);
    }
}
