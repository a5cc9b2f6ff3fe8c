//! In-memory template engine
//!
//! Stand-in for the host dashboard's variable engine. Used by the CLI (loaded
//! from a variables file) and by tests.

use super::parser::{parse_template, Segment};
use super::{
    AdhocFilter, ScopedVars, TemplateEngine, TemplateError, Variable, VariableFormat,
    VariableValue,
};
use serde::Deserialize;
use std::path::Path;

/// Template engine holding a fixed set of variables and adhoc filters
#[derive(Debug, Clone, Default)]
pub struct StaticTemplateEngine {
    variables: Vec<Variable>,
    adhoc_filters: Vec<AdhocFilter>,
}

/// On-disk representation of dashboard template state
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariablesFile {
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub adhoc_filters: Vec<AdhocFilter>,
}

impl StaticTemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a variable (declaration order is preserved)
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Add an adhoc filter (declaration order is preserved)
    pub fn with_adhoc_filter(mut self, filter: AdhocFilter) -> Self {
        self.adhoc_filters.push(filter);
        self
    }

    /// Load variables and adhoc filters from a JSON file
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(path).map_err(|e| TemplateError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let file: VariablesFile =
            serde_json::from_str(&content).map_err(|e| TemplateError::Parse {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;

        Ok(Self::from(file))
    }

    fn lookup<'a>(&'a self, name: &str, scoped: &'a ScopedVars) -> Option<&'a VariableValue> {
        if let Some(value) = scoped.get(name) {
            return Some(value);
        }

        self.variables
            .iter()
            .filter(|v| !v.is_adhoc())
            .find(|v| v.name == name)
            .and_then(|v| v.current.as_ref())
    }
}

impl From<VariablesFile> for StaticTemplateEngine {
    fn from(file: VariablesFile) -> Self {
        Self {
            variables: file.variables,
            adhoc_filters: file.adhoc_filters,
        }
    }
}

impl TemplateEngine for StaticTemplateEngine {
    fn resolve(&self, text: &str, scoped: &ScopedVars, format: VariableFormat) -> String {
        let mut out = String::with_capacity(text.len());

        for segment in parse_template(text) {
            match segment {
                Segment::Literal(literal) => out.push_str(literal),
                Segment::Variable(reference) => match self.lookup(reference.name, scoped) {
                    Some(value) => {
                        let format = reference
                            .format
                            .and_then(VariableFormat::from_name)
                            .unwrap_or(format);
                        out.push_str(&format_value(value, format));
                    }
                    None => out.push_str(reference.raw),
                },
            }
        }

        out
    }

    fn variables(&self) -> Vec<Variable> {
        self.variables.clone()
    }

    fn adhoc_filters(&self, _source: &str) -> Vec<AdhocFilter> {
        self.adhoc_filters.clone()
    }
}

/// Render a variable value in the requested format
fn format_value(value: &VariableValue, format: VariableFormat) -> String {
    match (value, format) {
        (VariableValue::Single(v), VariableFormat::Regex) => regex::escape(v),
        (VariableValue::Single(v), _) => v.clone(),
        (VariableValue::Multi(vs), VariableFormat::Glob) if vs.len() > 1 => {
            format!("{{{}}}", vs.join(","))
        }
        (VariableValue::Multi(vs), VariableFormat::Regex) => {
            let escaped: Vec<String> = vs.iter().map(|v| regex::escape(v)).collect();
            if escaped.len() == 1 {
                escaped.into_iter().next().unwrap_or_default()
            } else {
                format!("({})", escaped.join("|"))
            }
        }
        (VariableValue::Multi(vs), VariableFormat::Pipe) => vs.join("|"),
        (VariableValue::Multi(vs), _) => vs.join(","),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn engine() -> StaticTemplateEngine {
        StaticTemplateEngine::new()
            .with_variable(Variable::new("node", "rtr.nyc"))
            .with_variable(Variable::new("intf", vec!["xe-0/0/1", "xe-0/0/2"]))
            .with_variable(Variable::adhoc("interface"))
    }

    #[test]
    fn test_resolve_glob() {
        let text = engine().resolve("node = \"$node\" and intf = \"$intf\"", &ScopedVars::new(), VariableFormat::Glob);
        assert_eq!(text, "node = \"rtr.nyc\" and intf = \"{xe-0/0/1,xe-0/0/2}\"");
    }

    #[test]
    fn test_resolve_regex() {
        let engine = StaticTemplateEngine::new()
            .with_variable(Variable::new("node", "rtr.nyc"))
            .with_variable(Variable::new("intf", vec!["ae1", "ae2"]));

        let text = engine.resolve("$node ${intf}", &ScopedVars::new(), VariableFormat::Regex);
        assert_eq!(text, r"rtr\.nyc (ae1|ae2)");
    }

    #[test]
    fn test_explicit_format_overrides_mode() {
        let text = engine().resolve("[[intf:pipe]]", &ScopedVars::new(), VariableFormat::Glob);
        assert_eq!(text, "xe-0/0/1|xe-0/0/2");
    }

    #[test]
    fn test_unknown_references_untouched() {
        let text = engine().resolve(
            "aggregate(values.input, $quantify, average) between ($START,$END)",
            &ScopedVars::new(),
            VariableFormat::Glob,
        );
        assert_eq!(text, "aggregate(values.input, $quantify, average) between ($START,$END)");
    }

    #[test]
    fn test_scoped_vars_shadow_dashboard() {
        let mut scoped = ScopedVars::new();
        scoped.insert("node".to_string(), VariableValue::from("rtr.chi"));

        let text = engine().resolve("$node", &scoped, VariableFormat::Glob);
        assert_eq!(text, "rtr.chi");
    }

    #[test]
    fn test_single_element_multi_has_no_braces() {
        let engine = StaticTemplateEngine::new().with_variable(Variable::new("x", vec!["only"]));
        assert_eq!(engine.resolve("$x", &ScopedVars::new(), VariableFormat::Glob), "only");
    }

    #[test]
    fn test_load_variables_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "variables": [
                    {{"name": "interface", "type": "adhoc"}},
                    {{"name": "site", "type": "query", "current": "nyc"}}
                ],
                "adhoc_filters": [{{"key": "intf", "operator": "=", "value": "xe-0/2/0.433"}}]
            }}"#
        )
        .unwrap();

        let engine = StaticTemplateEngine::load(file.path()).unwrap();
        assert_eq!(engine.variables().len(), 2);
        assert_eq!(engine.adhoc_filters("tsds").len(), 1);
        assert_eq!(engine.resolve("$site", &ScopedVars::new(), VariableFormat::Glob), "nyc");
    }

    #[test]
    fn test_load_missing_file() {
        let err = StaticTemplateEngine::load(Path::new("/nonexistent/vars.json")).unwrap_err();
        assert!(matches!(err, TemplateError::Io { .. }));
    }
}
