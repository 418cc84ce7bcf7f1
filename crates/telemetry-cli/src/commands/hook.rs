//! `telemetry hook <source>` - forward a hook payload (read from stdin, or a
//! file given by `--file`) to the daemon, starting it first if needed.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;

use crate::paths::Paths;

#[derive(Args)]
pub struct HookArgs {
    /// Hook source name (e.g. `claude-code`, `opencode`)
    pub source: String,

    /// Account to attribute this payload to, if the source can't infer one
    #[arg(long)]
    pub account_id: Option<String>,

    /// Read the payload from this file instead of stdin
    #[arg(long)]
    pub file: Option<PathBuf>,
}

pub async fn run(args: HookArgs) -> Result<()> {
    let payload = match &args.file {
        Some(path) => std::fs::read(path).map_err(|e| anyhow!("reading {}: {e}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|e| anyhow!("reading stdin: {e}"))?;
            buf
        }
    };
    if payload.is_empty() {
        return Err(anyhow!("empty hook payload"));
    }

    let paths = Paths::resolve()?;
    let own_version = env!("CARGO_PKG_VERSION");
    let own_exe = std::env::current_exe().map_err(|e| anyhow!("could not resolve own executable path: {e}"))?;
    let client = telemetry_client::ensure_running(paths.socket_path.clone(), own_exe, paths.state_dir.clone(), own_version)
        .await
        .map_err(|e| anyhow!("{e}"))?;

    let tally = client
        .ingest_hook(&args.source, args.account_id.as_deref(), payload)
        .await
        .map_err(|e| anyhow!("{e}"))?;

    println!("{}", serde_json::to_string_pretty(&tally)?);
    Ok(())
}
