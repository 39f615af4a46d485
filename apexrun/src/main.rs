//! apexrun - run Apex tests on a Salesforce org from the command line.
//!
//! Selects remote test classes by pattern, exact name and namespace, submits
//! them as one asynchronous job through the Tooling API, waits for the job
//! to finish, and prints a pass/fail report. Exits non-zero on any pipeline
//! failure and on a run whose tests did not all pass.

mod secrets;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use apexrun_core::{RestToolingClient, RunOptions, runner};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use settings::{Overrides, RunConfigFile};

#[derive(Parser)]
#[command(name = "apexrun")]
#[command(author, version, about = "Run Apex tests via the Salesforce Tooling API")]
struct Cli {
    /// SOQL LIKE pattern for test class names (repeatable, e.g. '%_Test')
    #[arg(short, long = "pattern")]
    patterns: Vec<String>,

    /// Exact test class name (repeatable)
    #[arg(short = 'n', long = "name")]
    names: Vec<String>,

    /// Namespace prefix to search (repeatable; 'null' selects classes
    /// without a namespace, which is also the default)
    #[arg(long = "namespace")]
    namespaces: Vec<String>,

    /// Collect per-class code coverage after the run
    #[arg(long)]
    coverage: bool,

    /// Pause between submission attempts and status polls
    #[arg(long, value_parser = humantime::parse_duration)]
    poll_interval: Option<Duration>,

    /// Give up submission after this many busy retries (default: retry forever)
    #[arg(long)]
    max_submit_attempts: Option<u32>,

    /// Give up polling after this many status fetches (default: poll forever)
    #[arg(long)]
    max_polls: Option<u32>,

    /// Path to the JSON secret file holding per-org credential blocks
    #[arg(long, default_value = "secret.json")]
    secret_file: PathBuf,

    /// Credential block to use from the secret file
    #[arg(long, default_value = "staging")]
    org: String,

    /// Optional TOML run configuration (flags override file values)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match execute(cli).await {
        Ok(true) => {
            info!("Apex tests complete!");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            error!("Apex tests ran with failures.");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("Error!! {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<bool> {
    let file = match &cli.config {
        Some(path) => RunConfigFile::load(path)?,
        None => RunConfigFile::default(),
    };
    let merged = settings::merge(
        &file,
        &Overrides {
            patterns: cli.patterns,
            exact_names: cli.names,
            namespaces: cli.namespaces,
            coverage: cli.coverage,
            poll_interval: cli.poll_interval,
            max_submit_attempts: cli.max_submit_attempts,
            max_polls: cli.max_polls,
        },
    );

    let credentials = secrets::resolve_credentials(&cli.secret_file, &cli.org)?;

    let options = RunOptions {
        credentials,
        selection: merged.selection,
        collect_coverage: merged.coverage,
        poll_interval: merged.poll_interval,
        max_submit_attempts: merged.max_submit_attempts,
        max_polls: merged.max_polls,
    };

    let mut client = RestToolingClient::new(&options.credentials);
    let report = runner::run(&mut client, options).await?;
    print!("{}", report.text);
    Ok(report.passed)
}
