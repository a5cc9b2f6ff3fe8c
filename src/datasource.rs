//! TSDS Datasource
//!
//! Facade over the compiler, the metadata resolver and a transport, exposing
//! the operations a dashboard calls: panel queries, the connectivity check,
//! and autocomplete lookups.

use crate::client::{
    AuthContext, DatasourceRequest, Endpoint, HttpTransport, Transport, TransportError,
};
use crate::config::DatasourceConfig;
use crate::query::{QueryCompiler, QueryError, QueryOptions};
use crate::search::MetadataResolver;
use crate::template::{Interpolator, TemplateEngine};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result of the `/test` connectivity check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TestOutcome {
    Success {
        status: String,
        message: String,
        title: String,
    },
    Failure {
        error: String,
    },
}

impl TestOutcome {
    fn success() -> Self {
        Self::Success {
            status: "success".to_string(),
            message: "Data source is working".to_string(),
            title: "Success".to_string(),
        }
    }

    fn failure() -> Self {
        Self::Failure {
            error: "Data source isn't working".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Errors surfaced by datasource operations
#[derive(Error, Debug)]
pub enum DatasourceError {
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// A configured TSDS datasource
pub struct TsdsDatasource {
    name: String,
    compiler: QueryCompiler,
    resolver: MetadataResolver,
    transport: Arc<dyn Transport>,
    auth: AuthContext,
}

impl TsdsDatasource {
    /// `name` is the datasource name adhoc filters are bound to
    pub fn new(
        name: impl Into<String>,
        engine: Arc<dyn TemplateEngine>,
        transport: Arc<dyn Transport>,
        auth: AuthContext,
    ) -> Self {
        let name = name.into();
        let interpolator = Interpolator::new(engine, name.clone());

        Self {
            compiler: QueryCompiler::new(interpolator.clone()),
            resolver: MetadataResolver::new(interpolator, Arc::clone(&transport), auth.clone()),
            name,
            transport,
            auth,
        }
    }

    /// Build an HTTP-backed datasource from configuration
    pub fn from_config(
        config: &DatasourceConfig,
        engine: Arc<dyn TemplateEngine>,
    ) -> Result<Self, DatasourceError> {
        let transport = HttpTransport::new(
            config.url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;

        Ok(Self::new(
            config.name.clone(),
            engine,
            Arc::new(transport),
            config.auth_context(),
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    pub fn resolver(&self) -> &MetadataResolver {
        &self.resolver
    }

    /// Compile and run a panel refresh
    ///
    /// Returns the backend response unchanged. When every target is hidden no
    /// request is made and an empty data list is returned.
    pub async fn query(&self, options: &QueryOptions) -> Result<Value, DatasourceError> {
        let body = self.compiler.build_request(options)?;

        if body.targets.is_empty() {
            tracing::debug!(datasource = %self.name, "No visible targets, skipping query");
            return Ok(json!({ "data": [] }));
        }

        tracing::debug!(
            datasource = %self.name,
            targets = body.targets.len(),
            "Running panel query"
        );

        let request = DatasourceRequest::post(Endpoint::Query, &body, &self.auth)?;
        let response = self.transport.send(request).await?;
        Ok(response.data)
    }

    /// Connectivity check against `/test`
    pub async fn test_datasource(&self) -> TestOutcome {
        let request = DatasourceRequest::get(Endpoint::Test, &self.auth);

        match self.transport.send(request).await {
            Ok(response) if response.status == 200 => TestOutcome::success(),
            Ok(response) => {
                tracing::warn!(status = response.status, "Datasource test returned unexpected status");
                TestOutcome::failure()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Datasource test failed");
                TestOutcome::failure()
            }
        }
    }
}

impl std::fmt::Debug for TsdsDatasource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsdsDatasource")
            .field("name", &self.name)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::RecordingTransport;
    use crate::client::Method;
    use crate::query::{CompareOp, Target, WhereCondition, WhereGroup};
    use crate::template::{AdhocFilter, StaticTemplateEngine};

    fn datasource(transport: Arc<RecordingTransport>, auth: AuthContext) -> TsdsDatasource {
        let engine = StaticTemplateEngine::new()
            .with_adhoc_filter(AdhocFilter::new("intf", "=", "xe-0/2/0.433"));
        TsdsDatasource::new("tsds", Arc::new(engine), transport, auth)
    }

    #[tokio::test]
    async fn test_query_posts_compiled_targets() {
        let transport = Arc::new(
            RecordingTransport::new().respond(Endpoint::Query, json!([{"target": "x", "datapoints": []}])),
        );
        let ds = datasource(Arc::clone(&transport), AuthContext::basic("Basic abc"));

        let options = QueryOptions {
            targets: vec![Target::new("interface").ref_id("A").metric("node").where_group(
                WhereGroup::new().condition(WhereCondition::new("node", CompareOp::Eq, "rtr.nyc")),
            )],
            ..QueryOptions::default()
        };
        let data = ds.query(&options).await.unwrap();
        assert_eq!(data, json!([{"target": "x", "datapoints": []}]));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].endpoint, Endpoint::Query);
        assert_eq!(requests[0].header("Authorization"), Some("Basic abc"));
        assert_eq!(
            transport.last_body()["targets"][0]["target"],
            json!("get node between ($START,$END) from interface where ( node = \"rtr.nyc\" and intf=\"xe-0/2/0.433\" )")
        );
    }

    #[tokio::test]
    async fn test_all_hidden_skips_request() {
        let transport = Arc::new(RecordingTransport::new());
        let ds = datasource(Arc::clone(&transport), AuthContext::anonymous());

        let options = QueryOptions {
            targets: vec![Target::new("interface").metric("node").hidden()],
            ..QueryOptions::default()
        };

        assert_eq!(ds.query(&options).await.unwrap(), json!({"data": []}));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_query_error_propagates() {
        let transport = Arc::new(RecordingTransport::new().respond_with(
            Endpoint::Query,
            500,
            json!("boom"),
        ));
        let ds = datasource(transport, AuthContext::anonymous());

        let options = QueryOptions {
            targets: vec![Target::new("interface").metric("node")],
            ..QueryOptions::default()
        };
        let err = ds.query(&options).await.unwrap_err();
        assert!(matches!(err, DatasourceError::Transport(TransportError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_datasource_success() {
        let transport = Arc::new(RecordingTransport::new().respond(Endpoint::Test, Value::Null));
        let ds = datasource(Arc::clone(&transport), AuthContext::anonymous());

        let outcome = ds.test_datasource().await;
        assert!(outcome.is_success());
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"status": "success", "message": "Data source is working", "title": "Success"})
        );
        assert_eq!(transport.requests()[0].method, Method::Get);
    }

    #[tokio::test]
    async fn test_datasource_other_status() {
        let transport =
            Arc::new(RecordingTransport::new().respond_with(Endpoint::Test, 204, Value::Null));
        let ds = datasource(transport, AuthContext::anonymous());

        assert_eq!(
            serde_json::to_value(ds.test_datasource().await).unwrap(),
            json!({"error": "Data source isn't working"})
        );
    }

    #[tokio::test]
    async fn test_datasource_unreachable() {
        let ds = datasource(Arc::new(RecordingTransport::new()), AuthContext::anonymous());
        assert!(!ds.test_datasource().await.is_success());
    }
}
