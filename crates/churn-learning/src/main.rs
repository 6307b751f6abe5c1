//! CLI entry point for training, serving and inspecting the churn model.

use anyhow::{Context, Result};
use churn_learning::{
    ChurnService, ModelStats, PredictionOutcome, ServingConfig, TrainingConfig, TrainingResult,
    train,
};
use churn_processing::{
    CustomerRecord, Dataset, DatasetConfig, DatasetStatistics, MalformedRowPolicy,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    author = "Churn Team",
    version,
    about = "Customer churn training and prediction",
    long_about = "Train a seeded random-forest churn model, predict single customers, \
                  and inspect model and dataset statistics.\n\n\
                  EXAMPLES:\n  \
                  # Train and save a model\n  \
                  churn train --data customer_churn.csv --model model.json\n\n  \
                  # Predict one customer and append it to the log\n  \
                  churn predict --age 30 --gender Male --tenure 12 --usage 10 \\\n    \
                  --support-calls 2 --payment-delay 5 --subscription Basic \\\n    \
                  --contract Monthly --total-spend 500 --last-interaction 5\n\n  \
                  # Model quality over the dataset, as JSON\n  \
                  churn --json stats --model model.json --data customer_churn.csv"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show warnings and the result)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable text
    ///
    /// Disables all logs; only the JSON result is written.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a model on the dataset and save it
    Train(TrainArgs),
    /// Predict one customer, print the report and append it to the log
    Predict(PredictArgs),
    /// Accuracy, confusion matrix, classification report and feature importance
    Stats(StatsArgs),
    /// Churn distribution, churn by contract length and feature correlations
    Visualize(VisualizeArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Path to the dataset CSV
    #[arg(short, long, default_value = "customer_churn.csv")]
    data: PathBuf,

    /// Where to write the model artifact
    #[arg(short, long, default_value = "model.json")]
    model: PathBuf,

    /// Number of trees in the forest
    #[arg(long, default_value = "100")]
    trees: usize,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Fraction of rows held out for evaluation (0.0 - 1.0)
    #[arg(long, default_value = "0.2")]
    test_size: f64,

    /// Seed for the split, bootstrap and feature sampling
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Skip rows that cannot be encoded instead of failing
    #[arg(long)]
    drop_malformed: bool,
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// Path to the model artifact
    #[arg(short, long, default_value = "model.json")]
    model: PathBuf,

    /// Prediction log CSV (created on first prediction)
    #[arg(long, default_value = "prediction_logs.csv")]
    log: PathBuf,

    /// Also write the report to this text file
    #[arg(long)]
    report_out: Option<PathBuf>,

    #[arg(long, value_parser = clap::value_parser!(u32).range(18..=100))]
    age: u32,

    /// Male or Female
    #[arg(long)]
    gender: String,

    /// Tenure in months
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=60))]
    tenure: u32,

    /// Usage frequency
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=50))]
    usage: u32,

    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=20))]
    support_calls: u32,

    /// Payment delay in days
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=30))]
    payment_delay: u32,

    /// Basic, Standard or Premium
    #[arg(long)]
    subscription: String,

    /// Monthly, Quarterly or Annual
    #[arg(long)]
    contract: String,

    #[arg(long, value_parser = parse_total_spend)]
    total_spend: f64,

    /// Days since the last interaction
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=30))]
    last_interaction: u32,
}

impl PredictArgs {
    fn record(&self) -> CustomerRecord {
        CustomerRecord::new()
            .age(self.age)
            .gender(&self.gender)
            .tenure_months(self.tenure)
            .usage_frequency(self.usage)
            .support_calls(self.support_calls)
            .payment_delay_days(self.payment_delay)
            .subscription_type(&self.subscription)
            .contract_length(&self.contract)
            .total_spend(self.total_spend)
            .last_interaction_days(self.last_interaction)
    }
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Path to the model artifact
    #[arg(short, long, default_value = "model.json")]
    model: PathBuf,

    /// Labelled dataset to score
    #[arg(short, long, default_value = "customer_churn.csv")]
    data: PathBuf,

    /// Skip rows that cannot be encoded instead of failing
    #[arg(long)]
    drop_malformed: bool,
}

#[derive(Args, Debug)]
struct VisualizeArgs {
    /// Path to the dataset CSV
    #[arg(short, long, default_value = "customer_churn.csv")]
    data: PathBuf,

    /// Skip rows that cannot be encoded instead of failing
    #[arg(long)]
    drop_malformed: bool,
}

fn parse_total_spend(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if !(0.0..=2000.0).contains(&value) {
        return Err(format!("{} is not in 0..=2000", value));
    }
    Ok(value)
}

fn malformed_policy(drop_malformed: bool) -> MalformedRowPolicy {
    if drop_malformed {
        MalformedRowPolicy::Drop
    } else {
        MalformedRowPolicy::FailFast
    }
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.quiet, cli.json);

    match &cli.command {
        Command::Train(args) => run_train(args, cli.json),
        Command::Predict(args) => run_predict(args, cli.json),
        Command::Stats(args) => run_stats(args, cli.json),
        Command::Visualize(args) => run_visualize(args, cli.json),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_dataset(path: &Path, policy: MalformedRowPolicy) -> Result<Dataset> {
    let config = DatasetConfig::builder().malformed_rows(policy).build()?;
    Dataset::load(path, &config).with_context(|| format!("Failed to load {}", path.display()))
}

#[derive(Serialize)]
struct TrainSummary<'a> {
    model_path: String,
    class_counts: [usize; 2],
    training_rows: usize,
    test_rows: usize,
    dropped_rows: usize,
    holdout: &'a ModelStats,
}

fn run_train(args: &TrainArgs, json: bool) -> Result<()> {
    let policy = malformed_policy(args.drop_malformed);
    let dataset = load_dataset(&args.data, policy)?;

    let config = TrainingConfig::builder()
        .n_estimators(args.trees)
        .max_depth(args.max_depth)
        .test_size(args.test_size)
        .random_seed(args.seed)
        .malformed_rows(policy)
        .build()?;

    let result = train(&dataset, &config)?;
    result.model.save(&args.model)?;

    if json {
        let info = result.model.info();
        return print_json(&TrainSummary {
            model_path: args.model.display().to_string(),
            class_counts: result.class_counts,
            training_rows: info.training_rows,
            test_rows: info.test_rows,
            dropped_rows: info.dropped_rows,
            holdout: &result.holdout,
        });
    }

    print_training_summary(&result, args);
    Ok(())
}

/// Human-readable training summary.
///
/// Note: This uses `println!` intentionally; the summary is the command's
/// output and must not depend on the log level.
fn print_training_summary(result: &TrainingResult, args: &TrainArgs) {
    let info = result.model.info();

    println!("\n{}", "=".repeat(60));
    println!("TRAINING COMPLETE");
    println!("{}", "=".repeat(60));
    println!("  Model: {}", args.model.display());
    println!(
        "  Rows: {} training, {} hold-out, {} dropped",
        info.training_rows, info.test_rows, info.dropped_rows
    );
    println!(
        "  Classes: {} stayed, {} churned",
        result.class_counts[0], result.class_counts[1]
    );
    if let Some(train_score) = info.metrics.train_score {
        println!("  Training accuracy: {:.4}", train_score);
    }
    println!();
    print_model_stats(&result.holdout);
}

fn print_model_stats(stats: &ModelStats) {
    println!("Accuracy: {:.4}", stats.accuracy);
    println!();
    println!("CONFUSION MATRIX");
    println!("{}", "-".repeat(40));
    print!("{}", stats.confusion_matrix);
    println!();
    println!("CLASSIFICATION REPORT");
    println!("{}", "-".repeat(40));
    print!("{}", stats.classification_report);
    println!();

    match &stats.feature_importance {
        Some(ranking) => {
            println!("FEATURE IMPORTANCE");
            println!("{}", "-".repeat(40));
            for entry in ranking {
                println!("  {:<20} {:.4}", entry.feature, entry.weight);
            }
        }
        None => println!("Feature importance not available for this model"),
    }
}

#[derive(Serialize)]
struct PredictSummary<'a> {
    prediction: &'a str,
    outcome: &'a str,
    report: &'a churn_learning::PredictionReport,
    logged: bool,
}

fn run_predict(args: &PredictArgs, json: bool) -> Result<()> {
    let config = ServingConfig::builder()
        .model_path(&args.model)
        .log_path(&args.log)
        .build()?;
    let service = ChurnService::load(&config)?;

    let PredictionOutcome {
        label,
        report,
        log_error,
    } = service.predict_one(&args.record())?;

    if let Some(path) = &args.report_out {
        report.write_to(path)?;
        info!("Report written to {}", path.display());
    }

    if json {
        return print_json(&PredictSummary {
            prediction: label.display_name(),
            outcome: label.outcome_text(),
            report: &report,
            logged: log_error.is_none(),
        });
    }

    print!("{}", report);
    if let Some(e) = log_error {
        warn!("Prediction was not recorded: {}", e);
    }
    Ok(())
}

fn run_stats(args: &StatsArgs, json: bool) -> Result<()> {
    let policy = malformed_policy(args.drop_malformed);
    let config = ServingConfig::builder()
        .model_path(&args.model)
        .dataset_path(&args.data)
        .dataset(DatasetConfig::builder().malformed_rows(policy).build()?)
        .build()?;
    let service = ChurnService::load(&config)?;
    let stats = service.model_stats()?;

    if json {
        return print_json(&stats);
    }

    println!("\n{}", "=".repeat(60));
    println!("MODEL STATISTICS ({})", args.data.display());
    println!("{}", "=".repeat(60));
    print_model_stats(&stats);
    Ok(())
}

fn run_visualize(args: &VisualizeArgs, json: bool) -> Result<()> {
    let policy = malformed_policy(args.drop_malformed);
    let dataset = load_dataset(&args.data, policy)?;
    let stats = DatasetStatistics::compute_with_policy(&dataset, policy)?;

    if json {
        return print_json(&stats);
    }

    print_dataset_statistics(&stats);
    Ok(())
}

/// Width of the longest bar in the distribution charts.
const BAR_WIDTH: usize = 40;

fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    "#".repeat(count * BAR_WIDTH / max)
}

fn print_dataset_statistics(stats: &DatasetStatistics) {
    let distribution = &stats.churn_distribution;

    println!("\n{}", "=".repeat(60));
    println!("DATASET OVERVIEW ({} rows)", stats.rows);
    println!("{}", "=".repeat(60));

    println!("CHURN DISTRIBUTION");
    println!("{}", "-".repeat(40));
    let max = distribution.stayed.max(distribution.churned);
    println!(
        "  {:<8} {:>6} {}",
        "Stayed",
        distribution.stayed,
        bar(distribution.stayed, max)
    );
    println!(
        "  {:<8} {:>6} {}",
        "Churned",
        distribution.churned,
        bar(distribution.churned, max)
    );
    println!("  Churn rate: {:.1}%", distribution.churn_rate() * 100.0);
    println!();

    println!("CHURN BY CONTRACT LENGTH");
    println!("{}", "-".repeat(40));
    println!(
        "  {:<10} {:>8} {:>8} {:>8}",
        "Contract", "Stayed", "Churned", "Rate"
    );
    for row in &stats.contract_churn {
        println!(
            "  {:<10} {:>8} {:>8} {:>7.1}%",
            row.contract_length,
            row.counts.stayed,
            row.counts.churned,
            row.counts.churn_rate() * 100.0
        );
    }
    println!();

    println!("FEATURE CORRELATIONS");
    println!("{}", "-".repeat(40));
    print!("{}", stats.correlation);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_spend_bounds() {
        assert_eq!(parse_total_spend("500"), Ok(500.0));
        assert_eq!(parse_total_spend("0"), Ok(0.0));
        assert!(parse_total_spend("2000.5").is_err());
        assert!(parse_total_spend("-1").is_err());
        assert!(parse_total_spend("lots").is_err());
    }

    #[test]
    fn test_predict_args_bounds() {
        let base = [
            "churn", "predict", "--gender", "Male", "--tenure", "12", "--usage", "10",
            "--support-calls", "2", "--payment-delay", "5", "--subscription", "Basic",
            "--contract", "Monthly", "--total-spend", "500", "--last-interaction", "5",
        ];

        let ok = Cli::try_parse_from(base.iter().copied().chain(["--age", "30"]));
        assert!(ok.is_ok());

        let too_young = Cli::try_parse_from(base.iter().copied().chain(["--age", "17"]));
        assert!(too_young.is_err());
    }

    #[test]
    fn test_record_from_args() {
        let cli = Cli::try_parse_from([
            "churn", "--json", "predict", "--age", "30", "--gender", "Male", "--tenure", "12",
            "--usage", "10", "--support-calls", "2", "--payment-delay", "5", "--subscription",
            "Gold", "--contract", "Monthly", "--total-spend", "500", "--last-interaction", "5",
        ])
        .unwrap();
        assert!(cli.json);

        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        let record = args.record();
        assert_eq!(record.age, Some(30));
        assert_eq!(record.subscription_type.as_deref(), Some("Gold"));
    }

    #[test]
    fn test_visualize_drop_malformed_flag() {
        let cli = Cli::try_parse_from(["churn", "visualize", "--data", "c.csv", "--drop-malformed"])
            .unwrap();
        let Command::Visualize(args) = cli.command else {
            panic!("expected visualize");
        };
        assert_eq!(malformed_policy(args.drop_malformed), MalformedRowPolicy::Drop);

        let cli = Cli::try_parse_from(["churn", "visualize"]).unwrap();
        let Command::Visualize(args) = cli.command else {
            panic!("expected visualize");
        };
        assert_eq!(malformed_policy(args.drop_malformed), MalformedRowPolicy::FailFast);
    }

    #[test]
    fn test_load_dataset_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("customer_churn.csv");

        let err = load_dataset(&path, MalformedRowPolicy::FailFast).unwrap_err();
        assert!(err.to_string().starts_with("Failed to load"));
        let cause = err.downcast_ref::<churn_processing::ProcessingError>().unwrap();
        assert_eq!(cause.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_bar_scaling() {
        assert_eq!(bar(10, 10).len(), BAR_WIDTH);
        assert_eq!(bar(5, 10).len(), BAR_WIDTH / 2);
        assert!(bar(3, 0).is_empty());
    }
}
