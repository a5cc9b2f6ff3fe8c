//! Template Variables
//!
//! Resolves dashboard template variables and adhoc filters inside TSDS query
//! text.
//!
//! - **TemplateEngine**: the host dashboard's variable engine (external seam)
//! - **StaticTemplateEngine**: in-memory engine for the CLI and tests
//! - **Interpolator**: TSDS-specific rewrites layered over the engine
//!
//! # Reference Syntax
//!
//! ```text
//! $name
//! ${name}
//! ${name:regex}
//! [[name]]
//! [[name:glob]]
//! ```

mod engine;
mod interpolate;
mod parser;

pub use engine::{StaticTemplateEngine, VariablesFile};
pub use interpolate::{compile_adhoc_filters, rewrite_multi_value, strip_backslashes, Interpolator};
pub use parser::{parse_template, Segment, VariableRef};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Host type name of adhoc variables
pub const ADHOC_VARIABLE_TYPE: &str = "adhoc";

/// How multi-valued variables are rendered into text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableFormat {
    /// `{a,b,c}` for multi-values, values verbatim
    Glob,
    /// `(a|b|c)` for multi-values, regex-escaped
    Regex,
    /// Values verbatim, multi-values comma separated without braces
    Raw,
    /// Comma separated
    Csv,
    /// Pipe separated
    Pipe,
}

impl VariableFormat {
    /// Parse an explicit `${name:format}` suffix
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "glob" => Some(Self::Glob),
            "regex" => Some(Self::Regex),
            "raw" => Some(Self::Raw),
            "csv" => Some(Self::Csv),
            "pipe" => Some(Self::Pipe),
            _ => None,
        }
    }
}

/// Current value of a template variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Single(String),
    Multi(Vec<String>),
}

impl VariableValue {
    /// All selected values in declaration order
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(v) => vec![v.as_str()],
            Self::Multi(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<Vec<&str>> for VariableValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multi(values.into_iter().map(str::to_string).collect())
    }
}

/// A dashboard template variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    /// Host variable type (`query`, `custom`, `adhoc`, ...)
    #[serde(rename = "type", default = "default_variable_type")]
    pub kind: String,
    #[serde(default)]
    pub current: Option<VariableValue>,
}

fn default_variable_type() -> String {
    "custom".to_string()
}

impl Variable {
    /// Create a regular (non-adhoc) variable with a current value
    pub fn new(name: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        Self {
            name: name.into(),
            kind: default_variable_type(),
            current: Some(value.into()),
        }
    }

    /// Create an adhoc variable; adhoc variables carry no current value
    pub fn adhoc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ADHOC_VARIABLE_TYPE.to_string(),
            current: None,
        }
    }

    pub fn is_adhoc(&self) -> bool {
        self.kind == ADHOC_VARIABLE_TYPE
    }
}

/// A dashboard-global key/operator/value filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdhocFilter {
    pub key: String,
    pub operator: String,
    pub value: String,
}

impl AdhocFilter {
    pub fn new(key: impl Into<String>, operator: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// Per-request variable overrides (panel repeats and similar)
pub type ScopedVars = HashMap<String, VariableValue>;

/// The host dashboard's template-variable engine
///
/// Implementations must be side-effect free: the compiler and the resolver
/// call these methods on every refresh and every keystroke.
pub trait TemplateEngine: Send + Sync {
    /// Substitute variable references in `text`
    fn resolve(&self, text: &str, scoped: &ScopedVars, format: VariableFormat) -> String;

    /// All declared variables in declaration order
    fn variables(&self) -> Vec<Variable>;

    /// Adhoc filters bound to the named datasource, in declared order
    fn adhoc_filters(&self, source: &str) -> Vec<AdhocFilter> {
        let _ = source;
        Vec::new()
    }
}

/// Errors raised while loading template state
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to read variables file {path}: {error}")]
    Io { path: String, error: String },

    #[error("Invalid variables file {path}: {error}")]
    Parse { path: String, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_value_untagged() {
        let single: VariableValue = serde_json::from_str(r#""nyc""#).unwrap();
        assert_eq!(single, VariableValue::Single("nyc".into()));

        let multi: VariableValue = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert_eq!(multi.values(), vec!["a", "b"]);
    }

    #[test]
    fn test_variable_kind() {
        assert!(Variable::adhoc("interface").is_adhoc());
        assert!(!Variable::new("site", "nyc").is_adhoc());
    }

    #[test]
    fn test_format_from_name() {
        assert_eq!(VariableFormat::from_name("REGEX"), Some(VariableFormat::Regex));
        assert_eq!(VariableFormat::from_name("lucene"), None);
    }
}
