//! examsit CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "examsit", version, about = "Terminal client for timed assessments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the assessment's sections with status and lock state
    Sections {
        /// Scope the listing to a specific attempt
        #[arg(long)]
        attempt: Option<i64>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the progress snapshot for an attempt
    Status {
        /// Attempt id
        #[arg(long)]
        attempt: i64,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Take (or resume) the assessment interactively
    Take {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("examsit=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sections { attempt, config } => commands::sections::execute(attempt, config).await,
        Commands::Status { attempt, config } => commands::status::execute(attempt, config).await,
        Commands::Take { config } => commands::take::execute(config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
