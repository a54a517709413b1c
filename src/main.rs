//! Stock movement clustering CLI.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use stock_clusters::application::analysis::ClusterAnalysis;
use stock_clusters::application::reporting;
use stock_clusters::config::{load_universe, AnalysisConfig};
use stock_clusters::infrastructure::yahoo::YahooFinanceSource;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Clusters equities by daily price-movement behavior", long_about = None)]
struct Cli {
    /// Start date, inclusive (YYYY-MM-DD)
    #[arg(long, default_value = "2015-01-01")]
    start: String,

    /// End date, exclusive (YYYY-MM-DD)
    #[arg(long, default_value = "2017-12-31")]
    end: String,

    /// Number of clusters
    #[arg(short = 'k', long, default_value = "10")]
    clusters: usize,

    /// Number of PCA components
    #[arg(long, default_value = "2")]
    components: usize,

    /// Maximum k-means iterations
    #[arg(long, default_value = "1000")]
    max_iter: usize,

    /// Random seed for reproducible clustering
    #[arg(long, default_value = "42")]
    seed: u64,

    /// TOML file with the company universe (defaults to the built-in list)
    #[arg(long)]
    universe: Option<PathBuf>,

    /// Output CSV file for cluster assignments
    #[arg(long, default_value = "stock_clusters.csv")]
    csv: PathBuf,

    /// Output JSON file with the visualization payload
    #[arg(long, default_value = "stock_clusters.json")]
    json: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();

    let companies = match &cli.universe {
        Some(path) => {
            info!("Loading universe from: {}", path.display());
            load_universe(path)?
        }
        None => {
            info!("Using built-in company universe");
            stock_clusters::config::default_universe()
        }
    };

    let config = AnalysisConfig {
        companies,
        start: parse_date(&cli.start)?,
        end: parse_date(&cli.end)?,
        n_clusters: cli.clusters,
        n_components: cli.components,
        max_iterations: cli.max_iter,
        seed: cli.seed,
    };

    let source = YahooFinanceSource::new();
    let analysis = ClusterAnalysis::new(&source, config)?;

    info!(
        companies = analysis.universe().len(),
        start = %analysis.config().start,
        end = %analysis.config().end,
        "starting clustering run"
    );

    let outcome = analysis.run().await?;

    reporting::print_results_table(&outcome);
    reporting::write_assignments_csv(&outcome, &cli.csv)?;
    reporting::write_visualization_json(&outcome, &cli.json)?;

    info!(
        csv = %cli.csv.display(),
        json = %cli.json.display(),
        "results written"
    );
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format (expected YYYY-MM-DD): {}", s))
}
