//! `telemetry status` - one-shot read-model dump, or `--watch` to keep
//! printing snapshots as the [`telemetry_runtime::Broadcaster`] refreshes
//! them (exercises the same client-side runtime a TUI would embed).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Args;
use telemetry_runtime::{Broadcaster, ViewRuntime};
use tokio_util::sync::CancellationToken;

use crate::paths::Paths;

const WATCH_REFRESH_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Args)]
pub struct StatusArgs {
    /// Keep polling and reprinting snapshots until interrupted
    #[arg(long)]
    pub watch: bool,
}

pub async fn run(args: StatusArgs) -> Result<()> {
    let paths = Paths::resolve()?;
    let own_version = env!("CARGO_PKG_VERSION");
    let own_exe = std::env::current_exe().map_err(|e| anyhow!("could not resolve own executable path: {e}"))?;
    let runtime = Arc::new(ViewRuntime::new(paths.socket_path, own_exe, paths.state_dir, own_version));

    if !args.watch {
        let snapshots = runtime
            .read_with_fallback()
            .await
            .ok_or_else(|| anyhow!("daemon unreachable ({:?})", runtime.state().status))?;
        print_snapshots(&snapshots);
        return Ok(());
    }

    let (broadcaster, mut handles) = Broadcaster::new();
    let cancel = CancellationToken::new();

    let driver = {
        let runtime = Arc::clone(&runtime);
        let cancel = cancel.clone();
        tokio::spawn(async move { broadcaster.run(runtime, WATCH_REFRESH_INTERVAL, cancel).await })
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = handles.snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                clear_screen();
                print_snapshots(&handles.snapshots.borrow());
            }
        }
    }

    cancel.cancel();
    let _ = driver.await;
    Ok(())
}

fn clear_screen() {
    print!("\x1b[2J\x1b[H");
}

fn print_snapshots(snapshots: &std::collections::HashMap<String, telemetry_core::UsageSnapshot>) {
    if snapshots.is_empty() {
        println!("no accounts configured");
        return;
    }
    let mut ids: Vec<&String> = snapshots.keys().collect();
    ids.sort();
    for id in ids {
        let snap = &snapshots[id];
        println!("{id:<20} {:<10?} provider={}", snap.status, snap.provider_id);
        if let Some(message) = &snap.message {
            println!("  {message}");
        }
        let mut metric_names: Vec<&String> = snap.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let metric = &snap.metrics[name];
            match (metric.used, metric.limit) {
                (Some(used), Some(limit)) => println!("  {name}: {used}/{limit} {}", metric.unit.as_deref().unwrap_or("")),
                (Some(used), None) => println!("  {name}: {used} {}", metric.unit.as_deref().unwrap_or("")),
                _ => {}
            }
        }
    }
}
