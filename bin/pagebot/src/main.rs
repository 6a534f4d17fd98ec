mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pagebot")]
#[command(about = "An embeddable page-assistant widget agent", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount the widget against a host page and drive it interactively
    Run {
        /// Host page HTML file
        #[arg(short, long)]
        page: PathBuf,

        /// Watch the page file and feed modifications to the widget as
        /// page mutations
        #[arg(short, long)]
        watch: bool,

        /// Start with the widget open (the companion "open" signal)
        #[arg(long)]
        open: bool,
    },

    /// Run identity detection against a host page and print the outcome
    Identify {
        /// Host page HTML file
        #[arg(short, long)]
        page: PathBuf,

        /// Watch the page file during the detection window
        #[arg(short, long)]
        watch: bool,
    },

    /// Show config and snapshot status
    Status,

    /// Clear the persisted snapshot
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Run { page, watch, open } => {
            commands::run_cmd::run(page, watch, open).await?;
        }
        Commands::Identify { page, watch } => {
            commands::identify::run(page, watch).await?;
        }
        Commands::Status => {
            commands::status::run().await?;
        }
        Commands::Reset => {
            commands::reset::run().await?;
        }
    }

    Ok(())
}
