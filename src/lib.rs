//! # TSDS Datasource
//!
//! Dashboard datasource for the TSDS time-series web service. Turns panel
//! targets into TSDS query text and drives the cascading metadata lookups
//! behind the query editor.
//!
//! ## Modules
//!
//! - [`template`]: Dashboard variable interpolation and adhoc filters
//! - [`query`]: Target model, query compiler and `/query` request bodies
//! - [`search`]: Metadata lookups against `/search`
//! - [`mapper`]: Normalization of lookup results into suggestions
//! - [`client`]: Request construction and the HTTP transport
//! - [`datasource`]: Facade tying the pieces together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tsds_datasource::config::DatasourceConfig;
//! use tsds_datasource::query::{Aggregation, Aggregator, QueryOptions, Target};
//! use tsds_datasource::template::StaticTemplateEngine;
//! use tsds_datasource::TsdsDatasource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Arc::new(StaticTemplateEngine::new());
//!     let datasource = TsdsDatasource::from_config(&DatasourceConfig::default(), engine)?;
//!
//!     let target = Target::new("interface")
//!         .metric("node")
//!         .aggregate(Aggregation::new("input", Aggregator::named("average")))
//!         .group_by("node");
//!
//!     let options = QueryOptions {
//!         targets: vec![target],
//!         ..QueryOptions::default()
//!     };
//!     let data = datasource.query(&options).await?;
//!     println!("{}", data);
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod datasource;
pub mod mapper;
pub mod query;
pub mod search;
pub mod template;

// Re-export top-level types for convenience
pub use client::{AuthContext, HttpTransport, Transport, TransportError};

pub use config::{Config, ConfigError, DatasourceConfig, LoggingConfig};

pub use datasource::{DatasourceError, TestOutcome, TsdsDatasource};

pub use mapper::Suggestion;

pub use query::{
    CompiledQuery, QueryCompiler, QueryError, QueryOptions, QueryRequest, Target, TimeRange,
};

pub use search::{MetadataResolver, SearchError, SearchKind};

pub use template::{Interpolator, ScopedVars, StaticTemplateEngine, TemplateEngine};
