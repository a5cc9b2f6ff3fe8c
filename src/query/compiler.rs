//! Query Compiler
//!
//! Assembles one TSDS query string per panel target. Clause order is fixed:
//!
//! ```text
//! get <metrics>[, aggregate(values.<field>, $quantify, <fn>)]*
//!     between ($START,$END) [by <field>] from <series> where (<group>) [op (<group>)]*
//! ```
//!
//! `$START`, `$END` and `$quantify` are left for the backend to resolve.
//! Compilation is a pure function of the target and the current template
//! state; the alias map is keyed by the exact aggregation expression text, so
//! two compilations of the same target must agree byte for byte.

use super::error::{QueryError, QueryResult};
use super::target::{Target, WhereCondition, WhereGroup};
use crate::template::{Interpolator, ScopedVars};
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregation expression text -> display alias
pub type AliasMap = BTreeMap<String, String>;

/// Output of compiling one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledQuery {
    pub text: String,
    pub aliases: AliasMap,
}

/// Compiles panel targets into TSDS query text
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    interpolator: Interpolator,
}

impl QueryCompiler {
    pub fn new(interpolator: Interpolator) -> Self {
        Self { interpolator }
    }

    pub fn interpolator(&self) -> &Interpolator {
        &self.interpolator
    }

    /// Compile a target under the current template state
    pub fn compile(&self, target: &Target, scoped: &ScopedVars) -> QueryResult<CompiledQuery> {
        let compiled = if target.raw_query {
            self.compile_raw(target, scoped)?
        } else {
            self.compile_structured(target, scoped)
        };

        tracing::debug!(
            ref_id = %target.ref_id,
            raw = target.raw_query,
            query = %compiled.text,
            "Compiled target"
        );

        Ok(compiled)
    }

    fn compile_raw(&self, target: &Target, scoped: &ScopedVars) -> QueryResult<CompiledQuery> {
        let text = target.target.as_deref().ok_or(QueryError::EmptyRawQuery)?;

        Ok(CompiledQuery {
            text: self.interpolator.resolve_query(text, scoped),
            aliases: AliasMap::new(),
        })
    }

    fn compile_structured(&self, target: &Target, scoped: &ScopedVars) -> CompiledQuery {
        let mut aliases = AliasMap::new();
        let mut select: Vec<String> = target.metrics.clone();

        for aggregation in &target.aggregations {
            let expression = aggregation.expression();
            aliases.insert(expression.clone(), aggregation.alias.clone());
            select.push(expression);
        }

        let mut query = format!("get {}", select.join(", "));
        query.push_str(" between ($START,$END)");

        if let Some(field) = &target.group_by {
            query.push_str(" by ");
            query.push_str(field);
        }

        query.push_str(" from ");
        query.push_str(&target.series);

        let adhoc = self.interpolator.adhoc_fragment();
        if let Some(where_clause) = where_expression(&target.where_groups, &adhoc) {
            query.push_str(" where ");
            query.push_str(&where_clause);
        }

        CompiledQuery {
            text: self.interpolator.resolve_query(&query, scoped),
            aliases,
        }
    }
}

/// Render where-clause groups, appending the adhoc fragment to each
///
/// Adhoc filters only narrow groups the target declares; a target without
/// groups has no where clause at all.
pub fn where_expression(groups: &[WhereGroup], adhoc: &str) -> Option<String> {
    if groups.is_empty() {
        return None;
    }

    let mut out = String::new();
    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            out.push(' ');
            out.push_str(&group.operator.to_string());
            out.push(' ');
        }
        out.push_str(&render_group(group, adhoc));
    }

    Some(out)
}

fn render_group(group: &WhereGroup, adhoc: &str) -> String {
    let mut body = String::new();

    for (j, condition) in group.conditions.iter().enumerate() {
        if j > 0 {
            body.push(' ');
            body.push_str(&condition.connective.to_string());
            body.push(' ');
        }
        body.push_str(&render_condition(condition));
    }

    if !adhoc.is_empty() {
        if !body.is_empty() {
            body.push_str(" and ");
        }
        body.push_str(adhoc);
    }

    format!("( {} )", body)
}

fn render_condition(condition: &WhereCondition) -> String {
    format!("{} {} \"{}\"", condition.left, condition.op, condition.right)
}
