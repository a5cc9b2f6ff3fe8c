//! TSDS CLI
//!
//! Command-line front end for the TSDS datasource:
//! - Compile panel targets into query text
//! - Run panel queries
//! - Check datasource connectivity
//! - Browse metadata (columns, values, tables)

use anyhow::{bail, Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tsds_datasource::config::{generate_default_config, Config, LoggingConfig};
use tsds_datasource::mapper::Suggestion;
use tsds_datasource::query::{QueryOptions, Target, TimeRange};
use tsds_datasource::template::{ScopedVars, StaticTemplateEngine, TemplateEngine};
use tsds_datasource::TsdsDatasource;

#[derive(Parser)]
#[command(name = "tsds")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query builder and metadata browser for the TSDS time-series service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// TSDS web service URL (overrides config)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Dashboard variables file (JSON with `variables` and `adhoc_filters`)
    #[arg(long, global = true)]
    pub vars: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile targets into TSDS query text without contacting the service
    Compile {
        /// Target JSON file (one target or a list)
        #[arg(short, long, required_unless_present = "raw")]
        target: Option<PathBuf>,
        /// Raw query text
        #[arg(long, conflicts_with = "target")]
        raw: Option<String>,
    },

    /// Run a panel query
    Query {
        /// Target JSON file (one target or a list)
        target: PathBuf,
        /// Time range (e.g., 30m, 24h, 7d, 2w)
        #[arg(short, long, default_value = "24h")]
        last: String,
        /// Dashboard interval (e.g., 1m)
        #[arg(long)]
        interval: Option<String>,
        /// Maximum data points per series
        #[arg(long)]
        max_data_points: Option<u32>,
    },

    /// Check that the datasource is reachable
    Test,

    /// List columns of the current measurement type
    Columns,

    /// List values of a field, narrowed by the fields bound before it
    Values {
        /// Field name
        field: String,
    },

    /// List values for a where condition of a target
    Where {
        /// Target JSON file
        target: PathBuf,
        /// Where group index
        #[arg(short, long, default_value = "0")]
        group: usize,
        /// Condition index within the group
        #[arg(short = 'i', long, default_value = "0")]
        condition: usize,
        /// Partial value typed so far
        #[arg(long, default_value = "")]
        like: String,
    },

    /// Run a template variable query
    Search {
        /// Query text
        query: String,
        /// Restrict to a time range (e.g., 24h)
        #[arg(short, long)]
        last: Option<String>,
    },

    /// List measurement types
    Tables {
        /// Lookup text
        name: Option<String>,
    },

    /// List comparison operators for where conditions
    Operators,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_deref());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.url {
        config.datasource.url = url.clone();
    }

    init_logging(&config.logging)?;

    let engine: Arc<dyn TemplateEngine> = match &cli.vars {
        Some(path) => Arc::new(StaticTemplateEngine::load(path)?),
        None => Arc::new(StaticTemplateEngine::new()),
    };
    let datasource = TsdsDatasource::from_config(&config.datasource, engine)?;
    tracing::debug!(url = %config.datasource.url, name = datasource.name(), "Datasource ready");

    let json = cli.format == "json";

    match cli.command {
        Commands::Compile { target, raw } => {
            let targets = match (target, raw) {
                (_, Some(raw)) => vec![Target::raw(raw)],
                (Some(path), None) => load_targets(&path)?,
                (None, None) => bail!("Either --target or --raw is required"),
            };

            let scoped = ScopedVars::default();
            for target in &targets {
                let compiled = datasource.compiler().compile(target, &scoped)?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&compiled)?);
                } else {
                    println!("{}", compiled.text);
                    for (expression, alias) in &compiled.aliases {
                        println!("  {} => {}", expression, alias);
                    }
                }
            }
        }

        Commands::Query {
            target,
            last,
            interval,
            max_data_points,
        } => {
            let options = QueryOptions {
                range: Some(TimeRange::last(parse_duration(&last)?)),
                interval,
                max_data_points,
                targets: load_targets(&target)?,
                ..QueryOptions::default()
            };

            let data = datasource.query(&options).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                print_series(&data);
            }
        }

        Commands::Test => {
            let outcome = datasource.test_datasource().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else if outcome.is_success() {
                println!("Data source is working ({})", config.datasource.url);
            }

            if !outcome.is_success() {
                bail!("Data source isn't working ({})", config.datasource.url);
            }
        }

        Commands::Columns => {
            let columns = datasource.resolver().resolve_columns().await?;
            print_suggestions(&columns, json)?;
        }

        Commands::Values { field } => {
            let values = datasource.resolver().resolve_values(&field).await?;
            print_suggestions(&values, json)?;
        }

        Commands::Where {
            target: path,
            group,
            condition,
            like,
        } => {
            let targets = load_targets(&path)?;
            let Some(target) = targets.first() else {
                bail!("No target in {:?}", path);
            };

            let values = datasource
                .resolver()
                .resolve_where_field(target, group, condition, &like)
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else {
                for value in &values {
                    println!("{}", display_value(value));
                }
            }
        }

        Commands::Search { query, last } => {
            let range = last
                .as_deref()
                .map(parse_duration)
                .transpose()?
                .map(TimeRange::last);

            let results = datasource.resolver().metric_find_query(&query, range).await?;
            print_suggestions(&results, json)?;
        }

        Commands::Tables { name } => {
            let tables = datasource.resolver().find_tables(name.as_deref()).await?;
            print_suggestions(&tables, json)?;
        }

        Commands::Operators => {
            print_suggestions(&datasource.resolver().find_operators(), json)?;
        }

        Commands::Config { output } => write_default_config(output.as_deref())?,
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let writer = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .init();
    }

    Ok(())
}

fn write_default_config(output: Option<&Path>) -> Result<()> {
    let config = generate_default_config();

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &config)?;
            println!("Config written to {:?}", path);
        }
        None => {
            print!("{}", config);
        }
    }

    Ok(())
}

/// Read one target or a list of targets from a JSON file
fn load_targets(path: &Path) -> Result<Vec<Target>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read target file {:?}", path))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse target file {:?}", path))?;

    parse_targets(value)
}

fn parse_targets(value: Value) -> Result<Vec<Target>> {
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    items
        .into_iter()
        .map(|item| Target::from_json(item).map_err(Into::into))
        .collect()
}

fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();

    let duration = if let Some(seconds) = s.strip_suffix('s') {
        Duration::try_seconds(seconds.parse()?)
    } else if let Some(minutes) = s.strip_suffix('m') {
        Duration::try_minutes(minutes.parse()?)
    } else if let Some(hours) = s.strip_suffix('h') {
        Duration::try_hours(hours.parse()?)
    } else if let Some(days) = s.strip_suffix('d') {
        Duration::try_days(days.parse()?)
    } else if let Some(weeks) = s.strip_suffix('w') {
        Duration::try_weeks(weeks.parse()?)
    } else if let Some(years) = s.strip_suffix('y') {
        years.parse::<i64>()?.checked_mul(365).and_then(Duration::try_days)
    } else {
        bail!("Invalid duration format: {}. Use: 30m, 24h, 7d, 2w, 1y", s)
    };

    duration.with_context(|| format!("Duration out of range: {}", s))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn print_suggestions(suggestions: &[Suggestion], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(suggestions)?);
        return Ok(());
    }

    if suggestions.is_empty() {
        println!("No results found");
        return Ok(());
    }

    println!("{:<30} {}", "Text", "Value");
    println!("{}", "-".repeat(50));
    for suggestion in suggestions {
        println!(
            "{:<30} {}",
            display_value(&suggestion.text),
            display_value(&suggestion.value)
        );
    }

    Ok(())
}

fn print_series(data: &Value) {
    let series = match data.as_array().or_else(|| data["data"].as_array()) {
        Some(s) => s,
        None => {
            println!("{}", display_value(data));
            return;
        }
    };

    if series.is_empty() {
        println!("No data for the selected time range");
        return;
    }

    println!("{:<50} {}", "Series", "Points");
    println!("{}", "-".repeat(60));
    for entry in series {
        let name = entry["target"].as_str().unwrap_or("-");
        let points = entry["datapoints"].as_array().map(Vec::len).unwrap_or(0);
        println!("{:<50} {}", name, points);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30m").unwrap(), Duration::minutes(30));
        assert_eq!(parse_duration("24H").unwrap(), Duration::hours(24));
        assert_eq!(parse_duration("7d").unwrap(), Duration::days(7));
        assert_eq!(parse_duration("2w").unwrap(), Duration::weeks(2));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("xd").is_err());
    }

    #[test]
    fn test_parse_duration_out_of_range() {
        assert!(parse_duration("99999999999w").is_err());
        assert!(parse_duration("99999999999999999y").is_err());
        assert!(parse_duration("9999999999999999999s").is_err());
        assert_eq!(parse_duration("1y").unwrap(), Duration::days(365));
    }

    #[test]
    fn test_parse_targets_single_and_list() {
        let single = parse_targets(json!({"series": "interface", "metric_array": ["node"]})).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].series, "interface");

        let list = parse_targets(json!([
            {"series": "interface"},
            {"rawQuery": true, "target": "get node from interface"}
        ]))
        .unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[1].raw_query);
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("rtr.chic")), "rtr.chic");
        assert_eq!(display_value(&json!(3)), "3");
    }
}
