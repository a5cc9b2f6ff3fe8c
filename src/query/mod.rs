//! TSDS Query Compiler
//!
//! Turns panel editor targets into TSDS query language:
//!
//! - **Target**: structured query rows decoded from the editor's JSON
//! - **Compiler**: deterministic target -> query text assembly
//! - **Request**: `/query` body construction for a panel refresh
//!
//! # Query Language
//!
//! ```text
//! get node, intf, aggregate(values.input, $quantify, average)
//! between ($START,$END)
//! [by node]
//! from interface
//! where ( node = "rtr.nyc" and intf = "xe-0/0/1" ) or ( ... )
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use tsds_datasource::query::{Aggregation, Aggregator, Target, QueryCompiler};
//!
//! let target = Target::new("interface")
//!     .metric("node")
//!     .aggregate(Aggregation::new("input", Aggregator::named("average")));
//!
//! let compiled = compiler.compile(&target, &ScopedVars::new())?;
//! println!("{}", compiled.text);
//! ```

mod compiler;
mod error;
mod request;
mod target;

pub use compiler::{where_expression, AliasMap, CompiledQuery, QueryCompiler};
pub use error::{QueryError, QueryResult};
pub use request::{QueryOptions, QueryRequest, TargetRequest, TimeRange};
pub use target::{
    Aggregation, Aggregator, BoolOp, CompareOp, Target, WhereCondition, WhereGroup,
    DEFAULT_TARGET_TYPE, NO_GROUPING,
};
