mod analyzer;
mod config;
mod model;
mod normalizer;
mod parser;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use analyzer::{summarize, Classifier, CoolerClassifier};
use clap::{Parser, Subcommand};
use config::{load_config, AppConfig};
use model::Verdict;
use normalizer::BrandCatalog;
use pipeline::{AnalysisPipeline, ImageOutcome};
use scraper::{HttpIdentifier, HttpImageFetcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use storage::SqliteStorage;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cooler-audit", about = "Store visit cooler audit backend")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyse every uploaded image of an assignment
    Analyse { assignment_id: i64 },
    /// Classify a saved identification response offline
    Classify { detection: PathBuf },
    /// Print the stored analysis summary of an assignment
    Summary { assignment_id: i64 },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Panic occurred: {:?}", panic_info);
    }));

    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let catalog = Arc::new(BrandCatalog::new(config.reference_brands.iter().cloned()));
    if catalog.is_empty() {
        error!("No usable reference brands in config");
        return ExitCode::FAILURE;
    }
    if catalog.len() < catalog.raw().len() {
        warn!(
            "{} of {} reference brands have no comparable key",
            catalog.raw().len() - catalog.len(),
            catalog.raw().len()
        );
    }
    let classifier = CoolerClassifier::new(catalog);
    info!("Loaded {} reference brands", classifier.catalog().len());

    let result = match cli.command {
        Command::Analyse { assignment_id } => analyse(&config, classifier, assignment_id).await,
        Command::Classify { detection } => classify_file(&classifier, &detection).and_then(|verdict| {
            println!("{}", serde_json::to_string_pretty(&verdict)?);
            Ok(())
        }),
        Command::Summary { assignment_id } => summary(&config, assignment_id),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn analyse(
    config: &AppConfig,
    classifier: CoolerClassifier,
    assignment_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let storage = Arc::new(Mutex::new(SqliteStorage::new(&config.database_path)?));
    let fetcher = HttpImageFetcher::new(Duration::from_secs(config.request_timeout_seconds))?;
    let identifier = HttpIdentifier::from_env(
        config.identify_url.clone(),
        &config.identify_api_key_env,
        Duration::from_secs(config.identify_timeout_seconds),
    )?;

    let pipeline = AnalysisPipeline::new(
        Arc::new(fetcher),
        Arc::new(identifier),
        classifier,
        storage,
        config.max_concurrent_images,
    );

    let report = pipeline.run_analysis(assignment_id).await?;
    for (image_id, outcome) in &report.outcomes {
        match outcome {
            ImageOutcome::Analysed(verdict) => println!(
                "image {}: purity={} abused={} empty={} chargeability={}",
                image_id,
                verdict.purity,
                verdict.abused,
                verdict.empty,
                verdict
                    .chargeability_percentage
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |n| n.to_string())
            ),
            ImageOutcome::Failed(reason) => println!("image {}: error ({})", image_id, reason),
        }
    }
    Ok(())
}

fn classify_file(classifier: &CoolerClassifier, path: &Path) -> Result<Verdict, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(classifier.evaluate(&text)?)
}

fn summary(config: &AppConfig, assignment_id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let storage = SqliteStorage::new(&config.database_path)?;
    let status = storage.assignment_status(assignment_id)?;
    let records = storage.get_image_records(assignment_id)?;
    info!("Assignment {} is {}", assignment_id, status);
    println!("{}", serde_json::to_string_pretty(&summarize(&records))?);
    Ok(())
}
