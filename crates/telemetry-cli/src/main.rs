//! telemetry - CLI for the usage telemetry daemon

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod paths;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{daemon, hook, status};

#[derive(Parser)]
#[command(name = "telemetry", version, about = "Usage telemetry for AI coding assistants")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daemon lifecycle: bare invocation runs in the foreground, or install/uninstall/status
    Daemon(daemon::DaemonArgs),
    /// Forward a hook payload to the daemon
    Hook(hook::HookArgs),
    /// Show current account usage snapshots
    Status(status::StatusArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Daemon(args) => daemon::run(args).await,
        Commands::Hook(args) => hook::run(args).await,
        Commands::Status(args) => status::run(args).await,
    }
}
