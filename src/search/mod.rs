//! Metadata Resolver
//!
//! Cascading autocomplete lookups against the TSDS `/search` endpoint:
//! column names, field values narrowed by everything bound to their left,
//! and where-field values narrowed by sibling conditions.
//!
//! ## Data Flow
//!
//! 1. Lookup text is resolved through the template engine (regex mode)
//! 2. A `/search` body is built with the lookup `type`
//! 3. The response data list is normalized by the result mapper
//!
//! Lookups never touch the target being edited and hold no state between
//! calls, so any number of them may be in flight at once.

mod error;
mod request;

pub use error::{SearchError, SearchResult};
pub use request::{ParentField, SearchKind, SearchRequest};

use crate::client::{AuthContext, DatasourceRequest, Endpoint, Transport};
use crate::mapper::{data_list, map_to_array, map_to_text_value, Suggestion};
use crate::query::{CompareOp, Target, TimeRange};
use crate::template::{Interpolator, VariableValue};
use serde_json::Value;
use std::sync::Arc;

/// Measurement type used when no adhoc variable is declared
pub const DEFAULT_MEASUREMENT_TYPE: &str = "interface";

/// Default target for measurement type lookups
pub const DEFAULT_TABLE_LOOKUP: &str = "Find tables";

/// Issues metadata lookups for one datasource
#[derive(Clone)]
pub struct MetadataResolver {
    interpolator: Interpolator,
    transport: Arc<dyn Transport>,
    auth: AuthContext,
}

impl MetadataResolver {
    pub fn new(interpolator: Interpolator, transport: Arc<dyn Transport>, auth: AuthContext) -> Self {
        Self {
            interpolator,
            transport,
            auth,
        }
    }

    /// Name of the first declared adhoc variable, or `interface`
    pub fn measurement_type(&self) -> String {
        let variables = self.interpolator.variables();
        let mut adhoc = variables.iter().filter(|v| v.is_adhoc());

        match adhoc.next() {
            Some(first) => {
                let others = adhoc.count();
                if others > 0 {
                    tracing::debug!(
                        measurement_type = %first.name,
                        ignored = others,
                        "Multiple adhoc variables declared, using the first"
                    );
                }
                first.name.clone()
            }
            None => DEFAULT_MEASUREMENT_TYPE.to_string(),
        }
    }

    /// Bindings to the left of `field_key`
    ///
    /// Every non-adhoc variable is included; adhoc filters are included up to,
    /// but not including, the first filter on `field_key`.
    pub fn parent_meta_fields(&self, field_key: &str) -> Vec<ParentField> {
        let mut fields: Vec<ParentField> = self
            .interpolator
            .variables()
            .into_iter()
            .filter(|v| !v.is_adhoc())
            .map(|v| ParentField {
                key: v.name,
                value: v.current,
            })
            .collect();

        fields.extend(
            self.interpolator
                .adhoc_filters()
                .into_iter()
                .take_while(|f| f.key != field_key)
                .map(|f| ParentField {
                    key: f.key,
                    value: Some(VariableValue::Single(f.value)),
                }),
        );

        fields
    }

    /// Queryable columns of the current measurement type
    pub async fn resolve_columns(&self) -> SearchResult<Vec<Suggestion>> {
        let target = self.interpolator.resolve_lookup(&self.measurement_type());
        let data = self.search(SearchRequest::columns(target)).await?;
        Ok(map_to_text_value(&data))
    }

    /// Values of `field_key` narrowed by the bindings to its left
    pub async fn resolve_values(&self, field_key: &str) -> SearchResult<Vec<Suggestion>> {
        let request = SearchRequest::related_values(
            self.interpolator.resolve_lookup(&self.measurement_type()),
            self.parent_meta_fields(field_key),
            self.interpolator.resolve_lookup(field_key),
            "",
        );

        let data = self.search(request).await?;
        Ok(map_to_text_value(&data))
    }

    /// Values for the where condition at `(group_index, condition_index)`
    ///
    /// Narrowed by the first other condition in the same group that has a
    /// field; a condition without such a sibling gets an unconstrained lookup.
    pub async fn resolve_where_field(
        &self,
        target: &Target,
        group_index: usize,
        condition_index: usize,
        like: &str,
    ) -> SearchResult<Vec<Value>> {
        let not_found = || SearchError::ConditionNotFound {
            group: group_index,
            condition: condition_index,
        };
        let group = target.where_groups.get(group_index).ok_or_else(not_found)?;
        let condition = group.conditions.get(condition_index).ok_or_else(not_found)?;

        let parent = if group.conditions.len() > 1 {
            group
                .conditions
                .iter()
                .enumerate()
                .find(|(i, c)| *i != condition_index && c.has_field())
                .map(|(_, c)| c)
        } else {
            None
        };

        let series = self.interpolator.resolve_lookup(&target.series);
        let meta_field = self.interpolator.resolve_lookup(&condition.left);
        let like = self.interpolator.resolve_lookup(like);

        let request = match parent {
            Some(parent) => SearchRequest::related_field(
                series,
                meta_field,
                like,
                self.interpolator.resolve_lookup(&parent.left),
                self.interpolator.resolve_lookup(&parent.right),
            ),
            None => SearchRequest::field(series, meta_field, like),
        };

        let data = self.search(request).await?;
        Ok(map_to_array(data))
    }

    /// Template variable query; nested escaping is stripped from the target
    pub async fn metric_find_query(
        &self,
        query: &str,
        range: Option<TimeRange>,
    ) -> SearchResult<Vec<Suggestion>> {
        let target = self.interpolator.resolve_lookup_target(query);
        let request = SearchRequest::new(target, SearchKind::Search).with_range(range);

        let data = self.search(request).await?;
        Ok(map_to_text_value(&data))
    }

    /// Measurement type names
    pub async fn find_tables(&self, name: Option<&str>) -> SearchResult<Vec<Suggestion>> {
        let target = self
            .interpolator
            .resolve_lookup(name.unwrap_or(DEFAULT_TABLE_LOOKUP));

        let data = self.search(SearchRequest::new(target, SearchKind::Table)).await?;
        Ok(map_to_text_value(&data))
    }

    /// Editor lookup of `kind` scoped to a series
    pub async fn find_metric(&self, series: &str, kind: SearchKind) -> SearchResult<Vec<Suggestion>> {
        let target = self.interpolator.resolve_lookup(series);

        let data = self.search(SearchRequest::new(target, kind)).await?;
        Ok(map_to_text_value(&data))
    }

    /// Comparison operators offered for where conditions
    pub fn find_operators(&self) -> Vec<Suggestion> {
        let data: Vec<Value> = CompareOp::MENU
            .iter()
            .map(|op| Value::String(op.as_str().to_string()))
            .collect();
        map_to_text_value(&data)
    }

    async fn search(&self, request: SearchRequest) -> SearchResult<Vec<Value>> {
        tracing::debug!(
            kind = request.kind.as_str(),
            target = %request.target,
            "Metadata lookup"
        );

        let request = DatasourceRequest::post(Endpoint::Search, &request, &self.auth)?;
        let response = self.transport.send(request).await?;
        Ok(data_list(response.data))
    }
}

impl std::fmt::Debug for MetadataResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataResolver")
            .field("interpolator", &self.interpolator)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}
