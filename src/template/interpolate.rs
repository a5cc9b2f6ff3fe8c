//! TSDS-specific interpolation
//!
//! Layers the rewrites TSDS needs on top of the host engine's substitution:
//! multi-value sets become boolean `or` lists, nested escaping is stripped from
//! lookup targets, and adhoc filters are compiled into a where fragment.

use super::{AdhocFilter, ScopedVars, TemplateEngine, Variable, VariableFormat};
use std::sync::Arc;

/// Resolves template text for one datasource
#[derive(Clone)]
pub struct Interpolator {
    engine: Arc<dyn TemplateEngine>,
    source: String,
}

impl Interpolator {
    /// `source` is the datasource name adhoc filters are bound to
    pub fn new(engine: Arc<dyn TemplateEngine>, source: impl Into<String>) -> Self {
        Self {
            engine,
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Plain delegation to the host engine
    pub fn resolve(&self, text: &str, scoped: &ScopedVars, format: VariableFormat) -> String {
        self.engine.resolve(text, scoped, format)
    }

    /// Resolve compiled query text, rewriting multi-value sets for TSDS
    pub fn resolve_query(&self, text: &str, scoped: &ScopedVars) -> String {
        let resolved = self.engine.resolve(text, scoped, VariableFormat::Glob);
        rewrite_multi_value(&resolved)
    }

    /// Resolve a metadata lookup field (regex mode, no scoped variables)
    pub fn resolve_lookup(&self, text: &str) -> String {
        self.engine.resolve(text, &ScopedVars::new(), VariableFormat::Regex)
    }

    /// Resolve a free-form lookup target and strip nested escaping
    pub fn resolve_lookup_target(&self, text: &str) -> String {
        strip_backslashes(&self.resolve_lookup(text))
    }

    pub fn variables(&self) -> Vec<Variable> {
        self.engine.variables()
    }

    pub fn adhoc_filters(&self) -> Vec<AdhocFilter> {
        self.engine.adhoc_filters(&self.source)
    }

    /// Current adhoc filters rendered as a where fragment
    pub fn adhoc_fragment(&self) -> String {
        compile_adhoc_filters(&self.adhoc_filters())
    }
}

impl std::fmt::Debug for Interpolator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpolator")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Replace every comma at or after the first `{` with ` or `
///
/// Text before the first brace is never altered. Nesting is not parsed.
pub fn rewrite_multi_value(text: &str) -> String {
    match text.find('{') {
        Some(start) => {
            let (head, tail) = text.split_at(start);
            format!("{}{}", head, tail.replace(',', " or "))
        }
        None => text.to_string(),
    }
}

/// Remove every backslash
pub fn strip_backslashes(text: &str) -> String {
    text.chars().filter(|&c| c != '\\').collect()
}

/// Render adhoc filters as `key<op>"value"` joined with ` and `
pub fn compile_adhoc_filters(filters: &[AdhocFilter]) -> String {
    filters
        .iter()
        .map(|f| format!("{}{}\"{}\"", f.key, f.operator, f.value))
        .collect::<Vec<_>>()
        .join(" and ")
}
