use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info, warn};

use cma_engine::app::ports::PropertyKey;
use cma_engine::domain::Metric;
use cma_engine::infra::{FixtureStore, RestPropertyApi};
use cma_engine::observability::{self, metrics};
use cma_engine::pipeline::processing::compare::{classify_with, ClassifyOptions, Verdict};
use cma_engine::pipeline::processing::numeric::{format_currency, format_percent_diff};
use cma_engine::pipeline::processing::summary::MarketSummary;
use cma_engine::{AnalyzeUseCase, CmaReport, Config};

#[derive(Parser)]
#[command(name = "cma_engine")]
#[command(about = "Comparative market analysis over property-detail and MLS feeds")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = cma_engine::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Write the JSON result here instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Print Prometheus metrics to stderr when done
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a subject property through the REST feeds
    Analyze {
        /// Street address of the subject property
        #[arg(long, conflicts_with = "id")]
        address: Option<String>,
        /// Property id of the subject
        #[arg(long)]
        id: Option<i64>,
    },
    /// Analyze a subject property from captured JSON responses
    AnalyzeFixtures {
        /// Directory holding detail.json, detail/ and mls/
        #[arg(long)]
        dir: PathBuf,
        /// Subject address; defaults to the directory's detail.json
        #[arg(long)]
        address: Option<String>,
    },
    /// Classify one metric value against a reference value
    Compare {
        /// Metric name, e.g. daysOnMarket or days_on_market
        #[arg(long)]
        metric: Metric,
        #[arg(long, allow_hyphen_values = true)]
        value: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        reference: Option<f64>,
        /// Treat lower price per square foot as better
        #[arg(long)]
        score_price_per_sqft: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Classification {
    metric: Metric,
    value: Option<f64>,
    reference: Option<f64>,
    verdict: Verdict,
    delta: String,
}

fn subject_key(address: Option<String>, id: Option<i64>) -> Result<PropertyKey> {
    match (address, id) {
        (Some(address), _) => Ok(PropertyKey::Address(address)),
        (None, Some(id)) => Ok(PropertyKey::Id(id)),
        (None, None) => anyhow::bail!("either --address or --id is required"),
    }
}

fn write_output<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Result written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn run_analysis(use_case: AnalyzeUseCase, key: PropertyKey) -> Result<CmaReport> {
    tokio::select! {
        report = use_case.analyze(&key) => Ok(report?),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling analysis");
            metrics::analysis::failed("cancelled");
            anyhow::bail!("analysis cancelled")
        }
    }
}

fn print_report_summary(report: &CmaReport) {
    let stats = &report.enrichment;
    eprintln!("\n📊 CMA for {}:", report.subject.address);
    eprintln!("   Comparables retained: {}/{}", stats.retained, stats.requested);
    eprintln!("   Enriched with MLS: {}", stats.enriched_with_mls);
    eprintln!(
        "   Lookups failed/timed out: {}/{}",
        stats.lookups_failed, stats.lookups_timed_out
    );
    if let Some(line) = suggested_value_line(&report.summary) {
        eprintln!("   {}", line);
    }
}

fn suggested_value_line(summary: &MarketSummary) -> Option<String> {
    summary.suggested_value?;
    Some(format!(
        "Suggested value: {} ({} - {})",
        format_currency(summary.suggested_value),
        format_currency(summary.suggested_value_low),
        format_currency(summary.suggested_value_high)
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = observability::init_logging();

    let cli = Cli::parse();
    let config = Config::load_from(&cli.config).context("loading configuration")?;

    if cli.metrics {
        if let Err(e) = metrics::init() {
            warn!("Metrics unavailable: {}", e);
        }
    }

    let result = match cli.command {
        Commands::Analyze { address, id } => {
            let key = subject_key(address, id)?;
            let api = Arc::new(RestPropertyApi::new(&config.api)?);
            let use_case = AnalyzeUseCase::from_config(&config, api.clone(), api);
            run_analysis(use_case, key).await.and_then(|report| {
                print_report_summary(&report);
                write_output(&report, cli.output.as_ref())
            })
        }
        Commands::AnalyzeFixtures { dir, address } => {
            let key = PropertyKey::Address(address.unwrap_or_default());
            let store = Arc::new(FixtureStore::new(dir));
            let use_case = AnalyzeUseCase::from_config(&config, store.clone(), store);
            run_analysis(use_case, key).await.and_then(|report| {
                print_report_summary(&report);
                write_output(&report, cli.output.as_ref())
            })
        }
        Commands::Compare {
            metric,
            value,
            reference,
            score_price_per_sqft,
        } => {
            let options = ClassifyOptions {
                score_price_per_sqft: score_price_per_sqft || config.presentation.score_price_per_sqft,
            };
            let classification = Classification {
                metric,
                value,
                reference,
                verdict: classify_with(metric, value, reference, options),
                delta: format_percent_diff(value, reference),
            };
            write_output(&classification, cli.output.as_ref())
        }
    };

    if let Some(rendered) = metrics::render() {
        eprintln!("{}", rendered);
    }

    if let Err(e) = &result {
        error!("Command failed: {:#}", e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggested_value_line_groups_thousands() {
        let summary = MarketSummary {
            suggested_value: Some(1_250_000.0),
            suggested_value_low: Some(1_187_500.0),
            suggested_value_high: Some(1_312_500.0),
            ..Default::default()
        };
        assert_eq!(
            suggested_value_line(&summary).as_deref(),
            Some("Suggested value: $1,250,000 ($1,187,500 - $1,312,500)")
        );
        assert_eq!(suggested_value_line(&MarketSummary::default()), None);
    }

    #[test]
    fn test_subject_key_prefers_address() {
        assert_eq!(
            subject_key(Some("1 Main St".to_string()), Some(3)).unwrap(),
            PropertyKey::Address("1 Main St".to_string())
        );
        assert_eq!(subject_key(None, Some(3)).unwrap(), PropertyKey::Id(3));
        assert!(subject_key(None, None).is_err());
    }
}
