//! Mender CLI — the main entry point.
//!
//! Commands:
//! - `policy`  — Show which repairs apply to a model API / provider / model
//! - `repair`  — Repair a transcript file for a target provider
//! - `config`  — Show, locate, or initialize configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::TargetArgs;

#[derive(Parser)]
#[command(
    name = "mender",
    about = "Mender — transcript repair for LLM chat APIs",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "MENDER_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the repair policy for a target
    Policy {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Repair a transcript (JSON) before sending it to a provider
    Repair {
        /// Transcript file, or `-` for stdin
        input: PathBuf,

        #[command(flatten)]
        target: TargetArgs,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit the repair report instead of the transcript
        #[arg(long)]
        report: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing; stdout carries command output
    let filter = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Policy { target } => commands::policy::run(&target)?,
        Commands::Repair {
            input,
            target,
            output,
            report,
        } => commands::repair::run(&input, &target, output.as_deref(), report)?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show()?,
            ConfigAction::Path => commands::config_cmd::path()?,
            ConfigAction::Init { force } => commands::config_cmd::init(force)?,
        },
    }

    Ok(())
}
