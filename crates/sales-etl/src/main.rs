//! Sales ETL command line
//!
//! ```bash
//! sales-etl run --data-dir ./data
//! sales-etl migrate
//! sales-etl counts
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use sales_common::logging::{init_logging, LogConfig, LogLevel, LogOutput, WorkerGuard};
use sales_etl::config::Config;
use sales_etl::pipeline::{self, ExitStatus, PipelineError, PipelineReport, RunOptions, TableCounts};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "sales-etl")]
#[command(author, version, about = "Load purchase event logs into the sales tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract, transform and load one directory of event files
    Run {
        /// Input directory (overrides DATA_DIR)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Do not apply migrations before loading
        #[arg(long)]
        skip_migrations: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply database migrations
    Migrate,

    /// Print row counts of the sales tables
    Counts,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_tracing(cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: logging disabled: {:#}", e);
            None
        },
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            eprintln!("Error: {}", e);
            return ExitStatus::Failure.into();
        },
    };

    execute(cli.command, config).await.into()
}

fn init_tracing(verbose: bool) -> Result<Option<WorkerGuard>> {
    let level = if verbose { LogLevel::Debug } else { LogLevel::Info };
    let base = LogConfig::builder()
        .level(level)
        .output(LogOutput::Both)
        .log_file_prefix("etl_pipeline")
        .filter_directives("sqlx=warn")
        .build();

    init_logging(&LogConfig::from_env_with(base)?)
}

async fn execute(command: Command, mut config: Config) -> ExitStatus {
    match command {
        Command::Run {
            data_dir,
            skip_migrations,
            json,
        } => {
            if let Some(dir) = data_dir {
                config.pipeline.data_dir = dir;
            }
            let options = RunOptions {
                run_migrations: !skip_migrations,
            };

            match pipeline::run(&config, &options).await {
                Ok(report) => {
                    print_report(&report, json);
                    report.exit_status()
                },
                Err(e) => fail(&e),
            }
        },
        Command::Migrate => match pipeline::migrate(&config).await {
            Ok(()) => {
                info!("Migrations applied");
                ExitStatus::Success
            },
            Err(e) => fail(&e),
        },
        Command::Counts => match pipeline::count_tables(&config).await {
            Ok(counts) => {
                print_counts(&counts);
                ExitStatus::Success
            },
            Err(e) => fail(&e),
        },
    }
}

fn print_report(report: &PipelineReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(out) => println!("{}", out),
            Err(e) => error!(error = %e, "Failed to serialize run report"),
        }
        return;
    }

    print_counts(&report.table_counts);
    if !report.sales.is_clean() || !report.sales_detail.is_clean() {
        println!(
            "Rows not loaded: sales {} rejected / {} failed, sales_detail {} rejected / {} failed",
            report.sales.rejected,
            report.sales.failed,
            report.sales_detail.rejected,
            report.sales_detail.failed
        );
    }
}

fn print_counts(counts: &TableCounts) {
    println!("Total number of records in 'sales' table: {}", counts.sales);
    println!("Total number of records in 'sales_detail' table: {}", counts.sales_detail);
}

fn fail(e: &PipelineError) -> ExitStatus {
    let status = e.exit_status();
    error!(error = %e, status = ?status, "Pipeline failed");
    eprintln!("Error: {}", e);
    status
}
