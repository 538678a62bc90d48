//! spanlab: run adaptive span, counting, change-detection and card tasks
//! from a terminal.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};

mod app;
mod commands;
mod response;
mod simulate;
mod terminal;

#[derive(Parser)]
#[command(name = "spanlab", version, about = "Adaptive psychometric trial engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
pub struct TaskArgs {
    /// Built-in task id (see `spanlab presets`)
    #[arg(long, conflicts_with = "config")]
    task: Option<String>,

    /// Task configuration TOML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for stimulus generation
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Clone)]
pub struct ExportArgs {
    /// Participant id used in export filenames
    #[arg(long, default_value = "anonymous")]
    participant: String,

    /// Directory to write results into; nothing is written without it
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    format: ExportFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
    Both,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task interactively in this terminal
    Run {
        #[command(flatten)]
        task: TaskArgs,
        #[command(flatten)]
        export: ExportArgs,
    },

    /// Run a task against a scripted participant on a virtual clock
    Simulate {
        #[command(flatten)]
        task: TaskArgs,
        #[command(flatten)]
        export: ExportArgs,

        /// Probability of answering each trial correctly
        #[arg(long, default_value = "0.8")]
        accuracy: f64,

        /// Print the CSV export to stdout
        #[arg(long)]
        print_csv: bool,
    },

    /// Task configuration files
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// List built-in tasks, or print one as TOML
    Presets {
        /// Task id to print
        #[arg(long)]
        show: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Check a task configuration file
    Validate { path: PathBuf },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("spanlab=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { task, export } => commands::run(&task, &export),
        Commands::Simulate {
            task,
            export,
            accuracy,
            print_csv,
        } => commands::simulate(&task, &export, accuracy, print_csv),
        Commands::Config {
            command: ConfigCommands::Validate { path },
        } => commands::validate(&path),
        Commands::Presets { show } => commands::presets(show.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
