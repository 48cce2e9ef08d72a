//! CLI entry point for hospital patient imputation.

use anyhow::{Result, anyhow};
use clap::Parser;
use hospital_imputation::{ImputationConfig, ImputationOperation, ImputationRunner, ImputationSteps, ImputationSummary};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Impute missing patient measurements across hospitals",
    long_about = "Loads one CSV file per hospital (hospital id = trailing number of the\n\
                  file name), fills missing age, cholesterol and tomography values and\n\
                  optionally writes the cleaned table.\n\n\
                  EXAMPLES:\n  \
                  # Impute everything under ./files and save the result\n  \
                  hospital-imputation -i files -o output/patients.csv\n\n  \
                  # Only the per-hospital steps, for hospitals 1 and 3\n  \
                  hospital-imputation -i files --hospital 1 --hospital 3 --skip-brackets --skip-tomography\n\n  \
                  # Machine-readable summary\n  \
                  hospital-imputation -i files --json | jq .steps"
)]
struct Args {
    /// Directory holding one file per hospital
    #[arg(short, long, default_value = "files")]
    input_dir: PathBuf,

    /// CSV file to write the cleaned table to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extension of hospital files
    #[arg(long, default_value = "csv")]
    extension: String,

    /// Field separator of hospital files
    #[arg(long, default_value = ",")]
    separator: char,

    /// Restrict per-hospital steps to this hospital (repeatable)
    #[arg(long = "hospital")]
    hospitals: Vec<i64>,

    /// Skip per-hospital median age imputation
    #[arg(long)]
    skip_age: bool,

    /// Skip per-hospital same-age mean cholesterol imputation
    #[arg(long)]
    skip_single_hospital: bool,

    /// Skip cross-hospital age-bracket cholesterol imputation
    #[arg(long)]
    skip_brackets: bool,

    /// Skip tomography sanitization and regression
    #[arg(long)]
    skip_tomography: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output the run summary as JSON on stdout
    ///
    /// Disables all logs so stdout only carries the JSON document.
    #[arg(long)]
    json: bool,
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
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let separator = u8::try_from(args.separator)
        .map_err(|_| anyhow!("Separator must be a single ASCII character: {:?}", args.separator))?;

    let mut builder = ImputationConfig::builder()
        .input_dir(&args.input_dir)
        .file_extension(&args.extension)
        .separator(separator)
        .steps(ImputationSteps {
            age: !args.skip_age,
            cholesterol_single_hospital: !args.skip_single_hospital,
            cholesterol_brackets: !args.skip_brackets,
            tomography: !args.skip_tomography,
        });

    if !args.hospitals.is_empty() {
        builder = builder.hospitals(args.hospitals.clone());
    }
    if let Some(ref output) = args.output {
        builder = builder.output_path(output);
    }

    let config = builder.build()?;
    let mut runner = ImputationRunner::new(config)?;

    let output = match runner.run() {
        Ok(output) => output,
        Err(e) => {
            error!("Imputation failed: {}", e);
            return Err(e.into());
        }
    };

    if args.json {
        println!("{}", output.summary.to_json()?);
    } else {
        print_summary(&output.summary);
    }

    info!("Done in {}ms", output.summary.duration_ms);
    Ok(())
}

/// Human-readable run summary.
///
/// Uses `println!` on purpose: this is the command's result, not a log line,
/// and must show regardless of log level.
fn print_summary(summary: &ImputationSummary) {
    println!("\n{}", "=".repeat(60));
    println!("IMPUTATION SUMMARY");
    println!("{}", "=".repeat(60));

    println!(
        "  Files loaded:     {} ({} skipped)",
        summary.load.files.len(),
        summary.load.skipped.len()
    );
    println!("  Patient records:  {}", summary.rows);
    println!(
        "  Missing cells:    {} -> {}",
        summary.missing_before, summary.missing_after
    );

    println!("\n  Rows changed per operation:");
    for operation in [
        ImputationOperation::Age,
        ImputationOperation::CholesterolSingleHospital,
        ImputationOperation::CholesterolBrackets,
        ImputationOperation::Tomography,
    ] {
        if summary.steps.iter().any(|step| step.operation == operation) {
            println!(
                "    {:<30} {}",
                operation.as_str(),
                summary.rows_changed_by(operation)
            );
        }
    }

    if let Some(ref path) = summary.output_path {
        println!("\n  Cleaned table saved to: {}", path);
    }
    println!();
}
