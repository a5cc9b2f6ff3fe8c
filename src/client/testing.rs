//! Transport test double

use super::{DatasourceRequest, Endpoint, Transport, TransportError, TransportResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Records every request and answers with canned bodies per endpoint
#[derive(Default)]
pub struct RecordingTransport {
    responses: HashMap<Endpoint, (u16, Value)>,
    requests: Mutex<Vec<DatasourceRequest>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `endpoint` with status 200 and `body`
    pub fn respond(self, endpoint: Endpoint, body: Value) -> Self {
        self.respond_with(endpoint, 200, body)
    }

    pub fn respond_with(mut self, endpoint: Endpoint, status: u16, body: Value) -> Self {
        self.responses.insert(endpoint, (status, body));
        self
    }

    pub fn requests(&self) -> Vec<DatasourceRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Body of the most recent request
    pub fn last_body(&self) -> Value {
        self.requests
            .lock()
            .unwrap()
            .last()
            .and_then(|r| r.body.clone())
            .unwrap_or(Value::Null)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: DatasourceRequest) -> Result<TransportResponse, TransportError> {
        let endpoint = request.endpoint;
        self.requests.lock().unwrap().push(request);

        match self.responses.get(&endpoint) {
            Some((status, body)) if (200..300).contains(status) => Ok(TransportResponse {
                status: *status,
                data: body.clone(),
            }),
            Some((status, body)) => Err(TransportError::Status {
                status: *status,
                message: body.to_string(),
            }),
            None => Err(TransportError::Unavailable),
        }
    }
}
