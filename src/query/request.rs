//! `/query` request construction
//!
//! Packages compiled targets with their passthrough metadata into the body
//! TSDS expects.

use super::compiler::{AliasMap, QueryCompiler};
use super::error::QueryResult;
use super::target::{Target, DEFAULT_TARGET_TYPE};
use crate::template::ScopedVars;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dashboard time range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// The range ending now and spanning `duration`, clamped to the earliest
    /// representable instant
    pub fn last(duration: Duration) -> Self {
        let to = Utc::now();
        Self {
            from: to
                .checked_sub_signed(duration)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            to,
        }
    }
}

/// A panel refresh: every target of the panel plus dashboard context
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub range: Option<TimeRange>,
    pub interval: Option<String>,
    pub max_data_points: Option<u32>,
    pub scoped_vars: ScopedVars,
    pub targets: Vec<Target>,
}

/// One compiled target as sent to TSDS
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetRequest {
    pub target: String,
    #[serde(rename = "targetAliases")]
    pub target_aliases: AliasMap,
    #[serde(rename = "targetBuckets")]
    pub target_buckets: Option<Value>,
    #[serde(rename = "refId")]
    pub ref_id: String,
    pub hide: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub alias: Option<String>,
}

/// Body of a `/query` request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<TimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(rename = "maxDataPoints", skip_serializing_if = "Option::is_none")]
    pub max_data_points: Option<u32>,
    pub targets: Vec<TargetRequest>,
}

impl QueryCompiler {
    /// Compile every visible target of a refresh into a `/query` body
    ///
    /// Hidden targets are dropped before compilation.
    pub fn build_request(&self, options: &QueryOptions) -> QueryResult<QueryRequest> {
        let targets = options
            .targets
            .iter()
            .filter(|t| !t.hide)
            .map(|t| -> QueryResult<TargetRequest> {
                let compiled = self.compile(t, &options.scoped_vars)?;
                Ok(TargetRequest {
                    target: compiled.text,
                    target_aliases: compiled.aliases,
                    target_buckets: t.bucket.clone(),
                    ref_id: t.ref_id.clone(),
                    hide: t.hide,
                    kind: t
                        .kind
                        .clone()
                        .unwrap_or_else(|| DEFAULT_TARGET_TYPE.to_string()),
                    alias: t.target_alias.clone(),
                })
            })
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(QueryRequest {
            range: options.range,
            interval: options.interval.clone(),
            max_data_points: options.max_data_points,
            targets,
        })
    }
}
