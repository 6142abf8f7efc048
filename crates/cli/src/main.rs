//! Media gallery operator CLI
//!
//! Queries the service probes and the gated diagnostics API, and can
//! trigger a corrective memory collection on demand.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{diag, health};

/// Media gallery CLI
#[derive(Parser, Debug)]
#[command(name = "galleryctl")]
#[command(author, version, about = "CLI for the media gallery diagnostics API", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via GALLERY_API_URL env var)
    #[arg(long, env = "GALLERY_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token for gated endpoints (can also be set via GALLERY_TOKEN env var)
    #[arg(long, env = "GALLERY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show liveness and readiness
    Health,

    /// Process diagnostics
    #[command(subcommand)]
    Diag(DiagCommands),
}

#[derive(Subcommand, Debug)]
pub enum DiagCommands {
    /// Show the current sample, rolling history and thresholds
    Memory,

    /// Run a corrective collection and show the resulting state
    Gc,
}

async fn run(cli: Cli) -> Result<()> {
    let (api_url, token) = config::Config::load()?.resolve(cli.api_url, cli.token);
    let client = client::ApiClient::new(&api_url, token)?;

    match cli.command {
        Commands::Health => health::show_health(&client, cli.format).await?,
        Commands::Diag(diag_cmd) => match diag_cmd {
            DiagCommands::Memory => diag::show_memory(&client, cli.format).await?,
            DiagCommands::Gc => diag::force_collect(&client, cli.format).await?,
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
