//! optimize-reports CLI - Check, reconcile and evaluate combined reports
//!
//! Usage:
//!   optimize-reports check <reports.json>
//!   optimize-reports reconcile <results.json> [--limit <n>]
//!   optimize-reports evaluate <fixture.json> --report <id> [--filters <filters.json>]
//!
//! Examples:
//!   optimize-reports check demos/members.json
//!   optimize-reports reconcile demos/numeric.json --limit 100
//!   optimize-reports evaluate demos/invoices.json --report revenue-by-month --filters demos/filters.json

use clap::{Parser, Subcommand};
use optimize_reports::config::{Settings, StoreBackend};
use optimize_reports::evaluation::{InMemoryEvaluator, ProcessDataSet};
use optimize_reports::model::{
    Alert, BucketedResult, Collection, Dashboard, MapEntry, ReportDefinition, ReportFilter,
};
use optimize_reports::reconcile::{AxisKind, AxisStrategy};
use optimize_reports::store::{DefinitionStore, Expected, InMemoryStore, SqliteStore, WriteBatch};
use optimize_reports::validation::check_combinable;
use optimize_reports::ReportService;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "optimize-reports")]
#[command(about = "Combined process report evaluation with shared bucket axes")]
#[command(version)]
struct Cli {
    /// Path to a settings file (defaults to the usual lookup)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether report definitions can be combined
    Check {
        /// JSON array of report definitions
        file: PathBuf,
    },

    /// Align bucketed results on one shared axis
    Reconcile {
        /// JSON object with `axis` and `results`
        file: PathBuf,

        /// Most keys the shared axis may hold
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Evaluate a report from a fixture of definitions and process instances
    Evaluate {
        /// Fixture JSON file
        file: PathBuf,

        /// Id of the report to evaluate
        #[arg(short, long)]
        report: String,

        /// JSON array of additional filters
        #[arg(short, long)]
        filters: Option<PathBuf>,
    },
}

/// Input of the `reconcile` command.
#[derive(Deserialize)]
struct ReconcileInput {
    axis: AxisKind,
    results: Vec<Vec<MapEntry>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReconcileOutput {
    keys: Vec<String>,
    results: Vec<BucketedResult>,
    is_complete: bool,
}

/// Definitions and data loaded by the `evaluate` command.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Fixture {
    #[serde(default)]
    collections: Vec<Collection>,
    #[serde(default)]
    reports: Vec<ReportDefinition>,
    #[serde(default)]
    dashboards: Vec<Dashboard>,
    #[serde(default)]
    alerts: Vec<Alert>,
    #[serde(default)]
    data: ProcessDataSet,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&settings);

    match cli.command {
        Commands::Check { file } => cmd_check(file),
        Commands::Reconcile { file, limit } => {
            cmd_reconcile(file, limit.unwrap_or(settings.evaluation.bucket_limit))
        }
        Commands::Evaluate {
            file,
            report,
            filters,
        } => cmd_evaluate(&settings, file, report, filters),
    }
}

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json<T: serde::de::DeserializeOwned>(file: &Path) -> Result<T, String> {
    let source = fs::read_to_string(file)
        .map_err(|e| format!("Error reading file '{}': {}", file.display(), e))?;
    serde_json::from_str(&source).map_err(|e| format!("Error parsing '{}': {}", file.display(), e))
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error writing output: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_check(file: PathBuf) -> ExitCode {
    let reports: Vec<ReportDefinition> = match read_json(&file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let refs: Vec<&ReportDefinition> = reports.iter().collect();
    match check_combinable(&refs) {
        Ok(()) => {
            println!("OK: {} reports can be combined", reports.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_reconcile(file: PathBuf, limit: usize) -> ExitCode {
    let input: ReconcileInput = match read_json(&file) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let results: Vec<BucketedResult> =
        input.results.into_iter().map(BucketedResult::new).collect();
    let axis = AxisStrategy::for_kind(input.axis, limit.max(1)).reconcile(&results);

    print_json(&ReconcileOutput {
        keys: axis.keys().into_iter().map(str::to_string).collect(),
        is_complete: axis.is_complete,
        results: axis.results,
    })
}

fn cmd_evaluate(
    settings: &Settings,
    file: PathBuf,
    report: String,
    filters: Option<PathBuf>,
) -> ExitCode {
    let fixture: Fixture = match read_json(&file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let additional = filters
        .as_deref()
        .map(read_json::<Vec<ReportFilter>>)
        .transpose();
    let additional = match additional {
        Ok(f) => f.unwrap_or_default(),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let evaluator = InMemoryEvaluator::new(fixture.data.clone())
        .with_automatic_date_buckets(settings.evaluation.automatic_date_buckets)
        .with_bucket_limit(settings.evaluation.bucket_limit);

    match settings.store.backend {
        StoreBackend::Memory => evaluate_with(
            InMemoryStore::new(),
            evaluator,
            settings,
            &fixture,
            &report,
            &additional,
        ),
        StoreBackend::Sqlite => {
            let path = match settings.store.resolved_path() {
                Ok(Some(p)) => Ok(p),
                Ok(None) => SqliteStore::default_path().map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            let store = path.and_then(|p| SqliteStore::open(&p).map_err(|e| e.to_string()));
            match store {
                Ok(store) => {
                    evaluate_with(store, evaluator, settings, &fixture, &report, &additional)
                }
                Err(e) => {
                    eprintln!("Error opening store: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn evaluate_with<S: DefinitionStore>(
    store: S,
    evaluator: InMemoryEvaluator,
    settings: &Settings,
    fixture: &Fixture,
    report: &str,
    additional: &[ReportFilter],
) -> ExitCode {
    if let Err(e) = load_fixture(&store, fixture) {
        eprintln!("Error loading fixture: {}", e);
        return ExitCode::FAILURE;
    }

    let service =
        ReportService::new(store, evaluator).with_settings(settings.evaluation.clone());
    match service.evaluate_report(report, additional) {
        Ok(evaluated) => print_json(&evaluated),
        Err(e) => {
            eprintln!("Evaluation error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_fixture<S: DefinitionStore>(
    store: &S,
    fixture: &Fixture,
) -> optimize_reports::store::StoreResult<()> {
    let mut batch = WriteBatch::new();
    for collection in &fixture.collections {
        batch.put(collection, Expected::Any)?;
    }
    for report in &fixture.reports {
        batch.put(report, Expected::Any)?;
    }
    for dashboard in &fixture.dashboards {
        batch.put(dashboard, Expected::Any)?;
    }
    for alert in &fixture.alerts {
        batch.put(alert, Expected::Any)?;
    }
    store.commit(batch)
}
