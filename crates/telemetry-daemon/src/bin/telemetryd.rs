//! Telemetry Daemon (telemetryd)
//!
//! Background process that ingests hook payloads, polls provider quotas,
//! and serves the read-model over a Unix socket.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;
use std::sync::Arc;

use telemetry_daemon::collector::{Collector, FileDropCollector};
use telemetry_daemon::{config::DaemonConfig, http, logging, service::DaemonService, socket};
use telemetry_providers::ProviderRegistry;
use telemetry_sources::SourceRegistry;
use telemetry_store::SqliteStore;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let socket_path = match parse_args(std::env::args().skip(1).collect()) {
        ParsedArgs::Run { socket_path } => socket_path,
        ParsedArgs::Version => {
            println!("telemetryd {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        ParsedArgs::Help => {
            print_help();
            return Ok(());
        }
        ParsedArgs::Invalid(message) => {
            eprintln!("error: {message}");
            eprintln!("Usage: telemetryd [--socket-path <path>] [--help | --version]");
            std::process::exit(1);
        }
    };

    let config = DaemonConfig::load_with_socket_path_override(socket_path)?;
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.spool_dir)?;

    let log_guard = logging::setup(&config)?;
    info!("starting telemetry daemon");

    let listener = match socket::bind(&config.socket_path).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "failed to bind daemon socket");
            drop(log_guard);
            return Err(e.into());
        }
    };

    let store = Arc::new(SqliteStore::open(&config.db_path).await?);
    let sources = Arc::new(SourceRegistry::builtin());
    let providers = Arc::new(ProviderRegistry::builtin());
    let collectors: Vec<Arc<dyn Collector>> =
        vec![Arc::new(FileDropCollector::new(config.spool_dir.clone(), Arc::clone(&sources)))];

    let collect_interval = config.collect_interval;
    let poll_interval = config.poll_interval;
    let service = Arc::new(DaemonService::new(store, sources, providers, collectors, config));

    let cancel = CancellationToken::new();
    let router = http::router(Arc::clone(&service));

    let mut tasks = tokio::task::JoinSet::new();
    tasks.spawn(serve_task(listener, router, cancel.clone()));
    tasks.spawn(Arc::clone(&service).run_collect_loop(collect_interval, cancel.clone()));
    tasks.spawn(Arc::clone(&service).run_poll_loop(poll_interval, cancel.clone()));
    tasks.spawn(Arc::clone(&service).run_spool_maintenance_loop(cancel.clone()));
    tasks.spawn(Arc::clone(&service).run_retention_loop(cancel.clone()));
    tasks.spawn(Arc::clone(&service).run_read_model_cache_loop(cancel.clone()));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, draining");
    cancel.cancel();

    while tasks.join_next().await.is_some() {}
    socket::remove(&service.config.socket_path);
    info!("telemetry daemon shutdown complete");

    drop(log_guard);
    Ok(())
}

async fn serve_task(
    listener: tokio::net::UnixListener,
    router: axum::Router,
    cancel: CancellationToken,
) {
    telemetry_daemon::serve::serve(listener, router, cancel).await;
}

async fn wait_for_shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sig) => sig,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = tokio::signal::ctrl_c() => {}
    }
}

fn print_help() {
    println!("telemetryd {}", env!("CARGO_PKG_VERSION"));
    println!("Telemetry Daemon - background process that ingests usage telemetry");
    println!();
    println!("USAGE:");
    println!("    telemetryd [--socket-path <path>]");
    println!();
    println!("The daemon is typically started by the `telemetry` CLI's service");
    println!("manager and should not be invoked directly. It listens on a Unix");
    println!("socket for hook payloads and read-model requests.");
    println!();
    println!("OPTIONS:");
    println!("    --socket-path <path>    Bind the given socket instead of the state-dir default");
    println!("    -h, --help              Print help information");
    println!("    -v, --version           Print version information");
}

enum ParsedArgs {
    Run { socket_path: Option<PathBuf> },
    Version,
    Help,
    Invalid(String),
}

fn parse_args(args: Vec<String>) -> ParsedArgs {
    let mut socket_path = None;
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--version" | "-V" | "-v" => return ParsedArgs::Version,
            "--help" | "-h" | "help" => return ParsedArgs::Help,
            "--socket-path" => match iter.next() {
                Some(path) => socket_path = Some(PathBuf::from(path)),
                None => return ParsedArgs::Invalid("--socket-path requires a value".to_string()),
            },
            other => return ParsedArgs::Invalid(format!("unexpected argument '{other}'")),
        }
    }
    ParsedArgs::Run { socket_path }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_socket_path_flag() {
        let parsed = parse_args(vec!["--socket-path".to_string(), "/tmp/x.sock".to_string()]);
        match parsed {
            ParsedArgs::Run { socket_path } => assert_eq!(socket_path, Some(PathBuf::from("/tmp/x.sock"))),
            _ => panic!("expected Run"),
        }
    }

    #[test]
    fn no_args_runs_with_default_socket() {
        match parse_args(Vec::new()) {
            ParsedArgs::Run { socket_path } => assert_eq!(socket_path, None),
            _ => panic!("expected Run"),
        }
    }

    #[test]
    fn version_flag_short_circuits() {
        assert!(matches!(parse_args(vec!["--version".to_string()]), ParsedArgs::Version));
    }

    #[test]
    fn unknown_flag_is_invalid() {
        assert!(matches!(parse_args(vec!["--bogus".to_string()]), ParsedArgs::Invalid(_)));
    }
}
