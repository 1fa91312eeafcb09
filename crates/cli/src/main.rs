//! DermaChat CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write the default config file
//! - `serve`: Start the HTTP gateway and chat page
//! - `chat`: Interactive or single-question terminal chat
//! - `doctor`: Diagnose configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "dermachat",
    about = "DermaChat — psoriasis treatment assistant for dermatologists",
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
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Onboard,

    /// Start the HTTP gateway serving the chat page
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat about a patient's treatment in the terminal
    Chat {
        /// Raw query string carrying the patient context,
        /// e.g. "formulario=...&tratamiento=..."
        #[arg(short, long)]
        query: Option<String>,

        /// Ask a single question instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Diagnose configuration and service keys
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat { query, message } => commands::chat::run(query, message).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
