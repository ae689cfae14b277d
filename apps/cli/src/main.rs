//! Cadence CLI - batch driver for the Cadence planning engine
//!
//! Reads a backlog snapshot (JSON), runs the planning pipeline and prints
//! the plan, decompositions or critical path.

mod backlog;
mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cadence_core::PlannerConfig;
use commands::{critical_path, decompose, plan};

/// Cadence - work item planning and allocation
///
/// Decomposes oversized items, orders the backlog by WSJF and allocates it
/// across capacity-limited iterations.
#[derive(Parser, Debug)]
#[command(name = "cadence", author, version, about = "Cadence - work item planning and allocation")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Planner configuration file (skips config discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan a backlog across its iterations
    ///
    /// Runs decomposition, dependency analysis, prioritization, allocation
    /// and readiness validation, then prints the resulting plan.
    Plan {
        /// Backlog snapshot (JSON)
        backlog: PathBuf,

        /// Output the full planning result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how oversized items would be split
    Decompose {
        /// Backlog snapshot (JSON)
        backlog: PathBuf,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the longest Hard-dependency chain
    CriticalPath {
        /// Backlog snapshot (JSON)
        backlog: PathBuf,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    // RUST_LOG wins over --log-level. Logs go to stderr so --json output stays parseable.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cadence_core={}", args.log_level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_target(false),
        )
        .init();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::from(commands::EXIT_FAILURE)
        }
    }
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config = load_config(args.config.as_deref())?;

    let code = match args.command {
        Command::Plan { backlog, json } => plan::execute(&backlog, config, json)?,
        Command::Decompose { backlog, json } => decompose::execute(&backlog, &config, json)?,
        Command::CriticalPath { backlog, json } => {
            critical_path::execute(&backlog, config, json)?
        }
    };
    Ok(ExitCode::from(code))
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<PlannerConfig> {
    use anyhow::Context;

    match path {
        Some(path) => {
            let mut config = PlannerConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?;
            config.apply_env_overrides().context("Invalid environment override")?;
            config.validate().context("Invalid planner configuration")?;
            Ok(config)
        }
        None => {
            PlannerConfig::discover_and_load().context("Failed to load planner configuration")
        }
    }
}
