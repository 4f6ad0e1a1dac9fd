//! Threat Score CLI
//!
//! Aggregates department threat scores held in a document index.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Timelike;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use threat_core::{AggregationStrategy, ScoreRecord};
use threat_runtime::{ImportanceTable, ScoreReport, ScoreService};
use threat_store::{ElasticStore, SchemaStatus, StoreConfig};

#[derive(Parser)]
#[command(name = "threat-score")]
#[command(author, version, about = "Aggregate department threat scores", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,

    /// Elasticsearch base URL
    #[arg(long, env = "ELASTICSEARCH_URL", default_value = "http://localhost:9200")]
    url: String,

    /// Index holding department scores
    #[arg(long, env = "THREAT_INDEX", default_value = "department_scores")]
    index: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the score index if it does not exist
    Init,

    /// Load `department,threat_score` rows from a CSV file into the index
    Populate {
        /// CSV file with a header row
        #[arg(long)]
        csv: PathBuf,

        /// Maximum concurrent index writes
        #[arg(long, default_value = "8")]
        concurrency: usize,
    },

    /// Compute the aggregated threat score
    Score {
        /// Fail instead of reporting 0 when there are no observations
        #[arg(long, conflicts_with_all = ["weights", "default_weight"])]
        strict: bool,

        /// Department importance as `department=weight` (enables weighting)
        #[arg(short, long = "weight", value_parser = parse_weight)]
        weights: Vec<(String, f64)>,

        /// Importance for departments without an explicit weight
        #[arg(long)]
        default_weight: Option<f64>,

        /// Maximum documents fetched from the index
        #[arg(long, default_value = "1000")]
        size: usize,
    },

    /// Generate synthetic threat scores
    Generate {
        #[arg(long, allow_hyphen_values = true)]
        mean: i64,

        #[arg(long, allow_hyphen_values = true)]
        variance: i64,

        #[arg(long, default_value = "50")]
        count: usize,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Index the generated scores under this department
        #[arg(long)]
        department: Option<String>,
    },

    /// Encode an hour of the day as a point on the unit circle
    Encode {
        /// Hour in [0, 23] (default: current UTC hour)
        #[arg(long, allow_hyphen_values = true)]
        hour: Option<i64>,
    },
}

fn parse_weight(raw: &str) -> Result<(String, f64), String> {
    let (department, weight) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected department=weight, got '{}'", raw))?;
    let department = department.trim();
    if department.is_empty() {
        return Err(format!("missing department in '{}'", raw));
    }
    let weight = weight
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid weight in '{}': {}", raw, e))?;
    Ok((department.to_string(), weight))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let config = StoreConfig::new(&cli.url, &cli.index);

    match cli.command {
        Commands::Init => {
            let service = connect(config)?;
            match service.prepare().await? {
                SchemaStatus::Created => println!("Index '{}' created successfully.", cli.index),
                SchemaStatus::AlreadyExists => println!("Index '{}' already exists.", cli.index),
            }
        }
        Commands::Populate { csv, concurrency } => {
            let records = threat_store::read_records_path(&csv)?;
            let service = connect(config)?;
            service.prepare().await?;
            let stored = service.ingest(records, concurrency).await?;
            println!("Indexed {} scores from {}.", stored, csv.display());
        }
        Commands::Score {
            strict,
            weights,
            default_weight,
            size,
        } => {
            let service = connect(config.with_search_size(size))?;
            let report = if weights.is_empty() && default_weight.is_none() {
                let strategy = if strict {
                    AggregationStrategy::Strict
                } else {
                    AggregationStrategy::Robust
                };
                service.aggregate(strategy).await?
            } else {
                let mut table = ImportanceTable::new();
                if let Some(weight) = default_weight {
                    table = table.with_default(weight);
                }
                for (department, weight) in &weights {
                    table = table.with_weight(department, *weight);
                }
                service.aggregate_weighted(&table).await?
            };
            print_report(&report);
        }
        Commands::Generate {
            mean,
            variance,
            count,
            seed,
            department,
        } => {
            let scores = match seed {
                Some(seed) => {
                    threat_core::generate_with(&mut StdRng::seed_from_u64(seed), mean, variance, count)
                }
                None => threat_core::generate(mean, variance, count),
            };

            let rendered: Vec<String> = scores.scores().iter().map(|s| s.to_string()).collect();
            println!("{}", rendered.join(" "));

            if let Some(department) = department {
                let records = scores
                    .threat_scores()
                    .map(|score| ScoreRecord::new(&department, score))
                    .collect();
                let service = connect(config)?;
                service.prepare().await?;
                let stored = service.ingest(records, 8).await?;
                println!("Indexed {} scores for {}.", stored, department);
            }
        }
        Commands::Encode { hour } => {
            let (hour, point) = match hour {
                Some(hour) => (hour, threat_core::encode(hour)?),
                None => {
                    let now = chrono::Utc::now();
                    (now.hour() as i64, threat_core::encode_datetime(&now))
                }
            };
            println!("hour {:>2}: sin={:.6} cos={:.6}", hour, point.sin, point.cos);
        }
    }

    Ok(())
}

fn connect(config: StoreConfig) -> Result<ScoreService> {
    let store = ElasticStore::new(config)?;
    Ok(ScoreService::new(Arc::new(store)))
}

fn print_report(report: &ScoreReport) {
    println!(
        "Threat score report ({}) at {}",
        report.method,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    for dept in &report.departments {
        let mean = dept
            .mean
            .map(|m| format!("{:.2}", m))
            .unwrap_or_else(|| "-".to_string());
        match dept.importance {
            Some(importance) => println!(
                "   {:<20} n={:<5} mean={:<6} importance={}",
                dept.department, dept.observations, mean, importance
            ),
            None => println!(
                "   {:<20} n={:<5} mean={}",
                dept.department, dept.observations, mean
            ),
        }
    }
    println!("Aggregated Threat Score: {}", report.score.rounded());
}
