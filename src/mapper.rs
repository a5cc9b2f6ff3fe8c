//! Result Mapper
//!
//! Normalizes `/search` response data into the shapes the panel editor
//! consumes: `{text, value}` suggestion pairs, or a plain value list.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel returned by array mode when the backend has nothing to offer
pub const NO_RESULTS: &str = "No results found";

/// An autocomplete suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: Value,
    pub value: Value,
}

impl Suggestion {
    pub fn new(text: impl Into<Value>, value: impl Into<Value>) -> Self {
        Self {
            text: text.into(),
            value: value.into(),
        }
    }
}

/// Pair mode: normalize every element into a `{text, value}` suggestion
///
/// Elements that already carry a truthy `text` and `value` pass through.
/// Other composite elements are labelled by their position.
pub fn map_to_text_value(data: &[Value]) -> Vec<Suggestion> {
    data.iter()
        .enumerate()
        .map(|(i, d)| match d {
            Value::Object(map) => match (map.get("text"), map.get("value")) {
                (Some(text), Some(value)) if is_truthy(text) && is_truthy(value) => {
                    Suggestion::new(text.clone(), value.clone())
                }
                _ => Suggestion::new(d.clone(), i),
            },
            Value::Array(_) => Suggestion::new(d.clone(), i),
            _ => Suggestion::new(d.clone(), d.clone()),
        })
        .collect()
}

/// Array mode: the raw data list, or the no-results sentinel when empty
pub fn map_to_array(data: Vec<Value>) -> Vec<Value> {
    if data.is_empty() {
        vec![Value::String(NO_RESULTS.to_string())]
    } else {
        data
    }
}

/// Extract the data list from a response body
///
/// Bodies that are not a list are treated as empty; callers see the same
/// result as for a backend returning `[]`.
pub fn data_list(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => {
            tracing::warn!(body = %other, "Search response is not a list");
            Vec::new()
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pair_mode_mixed() {
        let data = vec![json!({"text": "A", "value": "a"}), json!(5), json!({"nested": 1})];

        assert_eq!(
            map_to_text_value(&data),
            vec![
                Suggestion::new("A", "a"),
                Suggestion::new(5, 5),
                Suggestion::new(json!({"nested": 1}), 2),
            ]
        );
    }

    #[test]
    fn test_pair_mode_falsy_value_is_composite() {
        let data = vec![json!({"text": "zero", "value": 0})];
        let mapped = map_to_text_value(&data);
        assert_eq!(mapped[0].text, json!({"text": "zero", "value": 0}));
        assert_eq!(mapped[0].value, json!(0));
    }

    #[test]
    fn test_pair_mode_strings() {
        let data = vec![json!("node"), json!("intf")];
        let mapped = map_to_text_value(&data);
        assert_eq!(mapped[1], Suggestion::new("intf", "intf"));
    }

    #[test]
    fn test_array_mode_empty() {
        assert_eq!(map_to_array(Vec::new()), vec![json!("No results found")]);
    }

    #[test]
    fn test_array_mode_passthrough() {
        let data = vec![json!("rtr.nyc"), json!({"value": 1})];
        assert_eq!(map_to_array(data.clone()), data);
    }

    #[test]
    fn test_data_list() {
        assert_eq!(data_list(json!(["a"])), vec![json!("a")]);
        assert!(data_list(Value::Null).is_empty());
        assert!(data_list(json!({"error": "bad"})).is_empty());
    }
}
