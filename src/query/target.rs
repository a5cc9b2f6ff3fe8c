//! Panel Targets
//!
//! A `Target` is one structured query row from the panel editor. The editor
//! stores aggregations and where-clause operators as index-aligned lists;
//! they are folded into records on the way in so the compiler never has to
//! zip lists that might disagree.
//!
//! # Editor JSON
//!
//! ```text
//! {
//!   "series": "interface",
//!   "metric_array": ["node", "intf"],
//!   "metricValues_array": ["input"],
//!   "aggregator": ["percentile"],
//!   "percentileValue": [95],
//!   "metricValueAliases": ["in p95"],
//!   "groupby_field": " ",
//!   "whereClauseGroup": [[{"left": "node", "op": "=", "right": "rtr.nyc"}]],
//!   "outerGroupOperator": [""],
//!   "inlineGroupOperator": [[""]]
//! }
//! ```

use super::error::{QueryError, QueryResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel the editor stores in `groupby_field` for "no grouping"
pub const NO_GROUPING: &str = " ";

/// Default request type for targets
pub const DEFAULT_TARGET_TYPE: &str = "timeserie";

/// Boolean combinator between conditions or groups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoolOp {
    #[default]
    And,
    Or,
}

impl BoolOp {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            _ => None,
        }
    }
}

impl std::fmt::Display for BoolOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
        }
    }
}

/// Comparison operators offered by the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
}

impl CompareOp {
    /// Operators in the order the editor menu lists them
    pub const MENU: [CompareOp; 3] = [CompareOp::Eq, CompareOp::Lt, CompareOp::Gt];

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "=" => Some(Self::Eq),
            ">" => Some(Self::Gt),
            "<" => Some(Self::Lt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `left op "right"` condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereCondition {
    /// Joins this condition to the previous one; ignored for the first
    pub connective: BoolOp,
    pub left: String,
    pub op: CompareOp,
    pub right: String,
}

impl WhereCondition {
    pub fn new(left: impl Into<String>, op: CompareOp, right: impl Into<String>) -> Self {
        Self {
            connective: BoolOp::And,
            left: left.into(),
            op,
            right: right.into(),
        }
    }

    pub fn with_connective(mut self, connective: BoolOp) -> Self {
        self.connective = connective;
        self
    }

    /// Whether the editor has filled in the field name
    pub fn has_field(&self) -> bool {
        !self.left.trim().is_empty()
    }
}

/// A parenthesized cluster of conditions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhereGroup {
    /// Joins this group to the previous one; ignored for the first
    pub operator: BoolOp,
    pub conditions: Vec<WhereCondition>,
}

impl WhereGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operator(mut self, operator: BoolOp) -> Self {
        self.operator = operator;
        self
    }

    pub fn condition(mut self, condition: WhereCondition) -> Self {
        self.conditions.push(condition);
        self
    }
}

/// Aggregation function applied to a value field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregator {
    /// `percentile(<arg>)`
    Percentile(String),
    /// Any other backend function, rendered bare (`average`, `max`, ...)
    Named(String),
}

impl Aggregator {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn percentile(value: impl ToString) -> Self {
        Self::Percentile(value.to_string())
    }
}

impl std::fmt::Display for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Percentile(p) => write!(f, "percentile({})", p),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// One aggregated value column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    /// Value field name, without the `values.` prefix
    pub field: String,
    pub aggregator: Aggregator,
    /// Display label; empty when the editor has none
    pub alias: String,
}

impl Aggregation {
    pub fn new(field: impl Into<String>, aggregator: Aggregator) -> Self {
        Self {
            field: field.into(),
            aggregator,
            alias: String::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// The exact expression text used in the query and as alias key
    pub fn expression(&self) -> String {
        format!("aggregate(values.{}, $quantify, {})", self.field, self.aggregator)
    }
}

/// One panel query row
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "WireTarget")]
pub struct Target {
    pub ref_id: String,
    pub hide: bool,
    /// Use `target` verbatim instead of the structured fields
    pub raw_query: bool,
    pub target: Option<String>,
    /// Measurement type queried in the `from` clause
    pub series: String,
    pub metrics: Vec<String>,
    pub aggregations: Vec<Aggregation>,
    pub group_by: Option<String>,
    pub where_groups: Vec<WhereGroup>,
    pub bucket: Option<Value>,
    pub target_alias: Option<String>,
    pub kind: Option<String>,
}

impl Target {
    /// Start a structured target for a measurement type
    pub fn new(series: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            ..Self::default()
        }
    }

    /// A raw-mode target carrying literal query text
    pub fn raw(query: impl Into<String>) -> Self {
        Self {
            raw_query: true,
            target: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn ref_id(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = ref_id.into();
        self
    }

    pub fn metric(mut self, metric: impl Into<String>) -> Self {
        self.metrics.push(metric.into());
        self
    }

    pub fn aggregate(mut self, aggregation: Aggregation) -> Self {
        self.aggregations.push(aggregation);
        self
    }

    /// Group by `field`; the no-grouping sentinel and empty names clear it
    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.group_by = (field != NO_GROUPING && !field.is_empty()).then_some(field);
        self
    }

    pub fn where_group(mut self, group: WhereGroup) -> Self {
        self.where_groups.push(group);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hide = true;
        self
    }

    /// Decode a target from the editor's JSON
    pub fn from_json(value: Value) -> QueryResult<Self> {
        serde_json::from_value(value).map_err(|e| QueryError::InvalidTarget(e.to_string()))
    }
}

// ============================================
// Editor wire shape
// ============================================

#[derive(Debug, Deserialize)]
struct WireCondition {
    #[serde(default)]
    left: String,
    #[serde(default)]
    op: String,
    #[serde(default, deserialize_with = "text_or_number")]
    right: String,
}

#[derive(Debug, Deserialize)]
struct WireTarget {
    #[serde(rename = "refId", default)]
    ref_id: String,
    #[serde(default)]
    hide: bool,
    #[serde(rename = "rawQuery", default)]
    raw_query: bool,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    series: String,
    #[serde(rename = "metric_array", alias = "metricArray", default)]
    metric_array: Vec<String>,
    #[serde(rename = "metricValues_array", alias = "metricValuesArray", default)]
    metric_values: Vec<String>,
    #[serde(default)]
    aggregator: Vec<String>,
    #[serde(rename = "percentileValue", default)]
    percentile_values: Vec<Value>,
    #[serde(rename = "metricValueAliases", default)]
    aliases: Vec<Option<String>>,
    #[serde(rename = "groupby_field", alias = "groupbyField", default)]
    groupby_field: Option<String>,
    #[serde(rename = "whereClauseGroup", default)]
    where_clause_group: Vec<Vec<WireCondition>>,
    #[serde(rename = "outerGroupOperator", default)]
    outer_group_operator: Vec<Option<String>>,
    #[serde(rename = "inlineGroupOperator", default)]
    inline_group_operator: Vec<Vec<Option<String>>>,
    #[serde(default)]
    bucket: Option<Value>,
    #[serde(rename = "target_alias", alias = "targetAlias", default)]
    target_alias: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl TryFrom<WireTarget> for Target {
    type Error = QueryError;

    fn try_from(wire: WireTarget) -> Result<Self, Self::Error> {
        let aggregations = fold_aggregations(
            wire.metric_values,
            wire.aggregator,
            &wire.percentile_values,
            wire.aliases,
        )?;

        let where_groups = fold_where_groups(
            wire.where_clause_group,
            &wire.outer_group_operator,
            &wire.inline_group_operator,
        )?;

        let group_by = wire
            .groupby_field
            .filter(|field| field != NO_GROUPING && !field.is_empty());

        Ok(Self {
            ref_id: wire.ref_id,
            hide: wire.hide,
            raw_query: wire.raw_query,
            target: wire.target,
            series: wire.series,
            metrics: wire.metric_array,
            aggregations,
            group_by,
            where_groups,
            bucket: wire.bucket,
            target_alias: wire.target_alias,
            kind: wire.kind,
        })
    }
}

fn fold_aggregations(
    fields: Vec<String>,
    aggregators: Vec<String>,
    percentiles: &[Value],
    aliases: Vec<Option<String>>,
) -> QueryResult<Vec<Aggregation>> {
    if aggregators.len() != fields.len() {
        return Err(QueryError::MisalignedTarget {
            list: "aggregator",
            expected: fields.len(),
            found: aggregators.len(),
        });
    }
    if aliases.len() > fields.len() {
        return Err(QueryError::MisalignedTarget {
            list: "metricValueAliases",
            expected: fields.len(),
            found: aliases.len(),
        });
    }

    let mut aliases = aliases.into_iter();

    fields
        .into_iter()
        .zip(aggregators)
        .enumerate()
        .map(|(index, (field, function))| -> QueryResult<Aggregation> {
            let aggregator = if function == "percentile" {
                let value = percentiles
                    .get(index)
                    .and_then(value_text)
                    .ok_or(QueryError::MissingPercentile { index })?;
                Aggregator::Percentile(value)
            } else {
                Aggregator::Named(function)
            };

            Ok(Aggregation {
                field,
                aggregator,
                alias: aliases.next().flatten().unwrap_or_default(),
            })
        })
        .collect()
}

fn fold_where_groups(
    groups: Vec<Vec<WireCondition>>,
    outer: &[Option<String>],
    inline: &[Vec<Option<String>>],
) -> QueryResult<Vec<WhereGroup>> {
    let outer_offset = operator_offset("outerGroupOperator", outer.len(), groups.len())?;

    groups
        .into_iter()
        .enumerate()
        .map(|(i, conditions)| -> QueryResult<WhereGroup> {
            let operator = if i == 0 {
                BoolOp::And
            } else {
                parse_bool_op(outer.get(i - outer_offset))?
            };

            let ops = inline.get(i).map(Vec::as_slice).unwrap_or(&[]);
            let inline_offset = operator_offset("inlineGroupOperator", ops.len(), conditions.len())?;

            let conditions = conditions
                .into_iter()
                .enumerate()
                .map(|(j, c)| -> QueryResult<WhereCondition> {
                    let connective = if j == 0 {
                        BoolOp::And
                    } else {
                        parse_bool_op(ops.get(j - inline_offset))?
                    };
                    let op = CompareOp::from_str(&c.op)
                        .ok_or_else(|| QueryError::InvalidOperator(c.op.clone()))?;

                    Ok(WhereCondition {
                        connective,
                        left: c.left,
                        op,
                        right: c.right,
                    })
                })
                .collect::<QueryResult<Vec<_>>>()?;

            Ok(WhereGroup {
                operator,
                conditions,
            })
        })
        .collect()
}

/// Operator lists are either aligned with their siblings (slot 0 unused) or
/// compact (one shorter). Returns the index shift for entry `i`.
fn operator_offset(list: &'static str, len: usize, siblings: usize) -> QueryResult<usize> {
    if siblings <= 1 || len == siblings {
        Ok(0)
    } else if len + 1 == siblings {
        Ok(1)
    } else {
        Err(QueryError::MisalignedTarget {
            list,
            expected: siblings,
            found: len,
        })
    }
}

fn parse_bool_op(op: Option<&Option<String>>) -> QueryResult<BoolOp> {
    let op = op.and_then(Option::as_deref).unwrap_or_default();
    BoolOp::from_str(op).ok_or_else(|| QueryError::InvalidOperator(op.to_string()))
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_editor_target() {
        let target = Target::from_json(json!({
            "refId": "A",
            "series": "interface",
            "metric_array": ["node", "intf"],
            "metricValues_array": ["input", "output"],
            "aggregator": ["percentile", "max"],
            "percentileValue": [95, null],
            "metricValueAliases": ["in p95"],
            "groupby_field": " ",
            "whereClauseGroup": [[{"left": "node", "op": "=", "right": "rtr.nyc"}]],
            "outerGroupOperator": [""],
            "inlineGroupOperator": [[""]]
        }))
        .unwrap();

        assert_eq!(target.ref_id, "A");
        assert_eq!(target.metrics, vec!["node", "intf"]);
        assert_eq!(
            target.aggregations,
            vec![
                Aggregation::new("input", Aggregator::percentile(95)).with_alias("in p95"),
                Aggregation::new("output", Aggregator::named("max")),
            ]
        );
        assert_eq!(target.group_by, None);
        assert_eq!(target.where_groups.len(), 1);
        assert_eq!(target.where_groups[0].conditions[0].op, CompareOp::Eq);
    }

    #[test]
    fn test_decode_camel_case_aliases() {
        let target = Target::from_json(json!({
            "series": "interface",
            "metricArray": ["node"],
            "metricValuesArray": ["input"],
            "aggregator": ["average"],
            "groupbyField": "node"
        }))
        .unwrap();

        assert_eq!(target.metrics, vec!["node"]);
        assert_eq!(target.group_by.as_deref(), Some("node"));
    }

    #[test]
    fn test_misaligned_aggregators_fail_fast() {
        let err = Target::from_json(json!({
            "series": "interface",
            "metricValues_array": ["input", "output"],
            "aggregator": ["max"]
        }))
        .unwrap_err();

        assert!(err.to_string().contains("aggregator has 1 entries, expected 2"));
    }

    #[test]
    fn test_missing_percentile() {
        let err = Target::from_json(json!({
            "metricValues_array": ["input"],
            "aggregator": ["percentile"],
            "percentileValue": []
        }))
        .unwrap_err();

        assert!(err.to_string().contains("Missing percentile value for aggregation 0"));
    }

    #[test]
    fn test_operator_lists_aligned_and_compact() {
        let aligned = Target::from_json(json!({
            "whereClauseGroup": [
                [{"left": "a", "op": "=", "right": "1"}],
                [{"left": "b", "op": ">", "right": "2"}, {"left": "c", "op": "<", "right": 3}]
            ],
            "outerGroupOperator": [null, "or"],
            "inlineGroupOperator": [[], [null, "or"]]
        }))
        .unwrap();

        let compact = Target::from_json(json!({
            "whereClauseGroup": [
                [{"left": "a", "op": "=", "right": "1"}],
                [{"left": "b", "op": ">", "right": "2"}, {"left": "c", "op": "<", "right": 3}]
            ],
            "outerGroupOperator": ["or"],
            "inlineGroupOperator": [[], ["or"]]
        }))
        .unwrap();

        assert_eq!(aligned.where_groups, compact.where_groups);
        assert_eq!(aligned.where_groups[1].operator, BoolOp::Or);
        assert_eq!(aligned.where_groups[1].conditions[1].connective, BoolOp::Or);
        assert_eq!(aligned.where_groups[1].conditions[1].right, "3");
    }

    #[test]
    fn test_invalid_operators() {
        let err = Target::from_json(json!({
            "whereClauseGroup": [[{"left": "a", "op": "~", "right": "1"}]]
        }))
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidTarget(_)));

        let err = Target::from_json(json!({
            "whereClauseGroup": [[], []],
            "outerGroupOperator": [null, "xor"]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("xor"));
    }

    #[test]
    fn test_group_by_builder_sentinel() {
        assert_eq!(Target::new("interface").group_by(NO_GROUPING).group_by, None);
        assert_eq!(Target::new("interface").group_by("").group_by, None);
        assert_eq!(
            Target::new("interface").group_by("node").group_by.as_deref(),
            Some("node")
        );
    }

    #[test]
    fn test_aggregation_expression() {
        assert_eq!(
            Aggregation::new("input", Aggregator::percentile(99.9)).expression(),
            "aggregate(values.input, $quantify, percentile(99.9))"
        );
        assert_eq!(
            Aggregation::new("output", Aggregator::named("average")).expression(),
            "aggregate(values.output, $quantify, average)"
        );
    }
}
