//! `/search` request bodies
//!
//! Every metadata lookup is a POST to `/search` discriminated by `type`.

use crate::query::TimeRange;
use crate::template::VariableValue;
use serde::{Serialize, Serializer};

/// Lookup discriminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKind {
    /// Column names of a measurement type
    Column,
    /// Field values narrowed by related fields
    WhereRelated,
    /// Field values without narrowing
    Where,
    /// Free-form template variable query
    Search,
    /// Measurement type names
    Table,
    /// Any other lookup the editor asks for
    Other(String),
}

impl SearchKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Column => "Column",
            Self::WhereRelated => "Where_Related",
            Self::Where => "Where",
            Self::Search => "Search",
            Self::Table => "Table",
            Self::Other(kind) => kind,
        }
    }
}

impl From<&str> for SearchKind {
    fn from(kind: &str) -> Self {
        match kind {
            "Column" => Self::Column,
            "Where_Related" => Self::WhereRelated,
            "Where" => Self::Where,
            "Search" => Self::Search,
            "Table" => Self::Table,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Serialize for SearchKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A field binding that narrows a value lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentField {
    pub key: String,
    pub value: Option<VariableValue>,
}

/// Body of a `/search` request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub target: String,
    #[serde(rename = "type")]
    pub kind: SearchKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_meta_fields: Option<Vec<ParentField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_meta_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_meta_field_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<TimeRange>,
}

impl SearchRequest {
    /// A plain lookup carrying only a target
    pub fn new(target: impl Into<String>, kind: SearchKind) -> Self {
        Self {
            target: target.into(),
            kind,
            parent_meta_fields: None,
            parent_meta_field: None,
            parent_meta_field_value: None,
            meta_field: None,
            like_field: None,
            range: None,
        }
    }

    pub fn columns(target: impl Into<String>) -> Self {
        Self::new(target, SearchKind::Column)
    }

    /// Values of `meta_field` narrowed by a list of parent bindings
    pub fn related_values(
        target: impl Into<String>,
        parents: Vec<ParentField>,
        meta_field: impl Into<String>,
        like: impl Into<String>,
    ) -> Self {
        Self {
            parent_meta_fields: Some(parents),
            meta_field: Some(meta_field.into()),
            like_field: Some(like.into()),
            ..Self::new(target, SearchKind::WhereRelated)
        }
    }

    /// Values of `meta_field` narrowed by one sibling condition
    pub fn related_field(
        target: impl Into<String>,
        meta_field: impl Into<String>,
        like: impl Into<String>,
        parent_field: impl Into<String>,
        parent_value: impl Into<String>,
    ) -> Self {
        Self {
            parent_meta_field: Some(parent_field.into()),
            parent_meta_field_value: Some(parent_value.into()),
            meta_field: Some(meta_field.into()),
            like_field: Some(like.into()),
            ..Self::new(target, SearchKind::WhereRelated)
        }
    }

    /// Values of `meta_field` without narrowing
    pub fn field(
        target: impl Into<String>,
        meta_field: impl Into<String>,
        like: impl Into<String>,
    ) -> Self {
        Self {
            meta_field: Some(meta_field.into()),
            like_field: Some(like.into()),
            ..Self::new(target, SearchKind::Where)
        }
    }

    pub fn with_range(mut self, range: Option<TimeRange>) -> Self {
        self.range = range;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_body() {
        let body = serde_json::to_value(SearchRequest::columns("interface")).unwrap();
        assert_eq!(body, json!({"target": "interface", "type": "Column"}));
    }

    #[test]
    fn test_related_values_body() {
        let request = SearchRequest::related_values(
            "interface",
            vec![ParentField {
                key: "site".into(),
                value: Some(VariableValue::from("nyc")),
            }],
            "intf",
            "",
        );

        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({
                "target": "interface",
                "type": "Where_Related",
                "parent_meta_fields": [{"key": "site", "value": "nyc"}],
                "meta_field": "intf",
                "like_field": ""
            })
        );
    }

    #[test]
    fn test_kind_round_trip_names() {
        assert_eq!(SearchKind::from("Where_Related"), SearchKind::WhereRelated);
        assert_eq!(SearchKind::from("Metric").as_str(), "Metric");
    }
}
