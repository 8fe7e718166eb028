//! Lutron Bridge entry point.
//!
//! Connects to a Lutron gateway's telnet integration port, logs in, keeps a
//! cache of every output level the gateway reports, and accepts operator
//! commands on stdin until `quit`, end of input, or Ctrl+C.
//!
//! # Usage
//!
//! ```text
//! lutron-bridge [OPTIONS]
//!
//! Options:
//!   --config <PATH>      Config file [default: platform config dir]
//!   --host <IP>          Gateway IP address
//!   --port <PORT>        Gateway telnet port
//!   --scan <MAX>         Query ids 0..MAX after connecting
//!   --log-level <LEVEL>  Log filter when RUST_LOG is unset
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable      | Option        |
//! |---------------|---------------|
//! | `LUTRON_HOST` | `--host`      |
//! | `LUTRON_PORT` | `--port`      |
//! | `LUTRON_SCAN` | `--scan`      |
//! | `LUTRON_LOG`  | `--log-level` |
//!
//! Precedence: command line, then environment, then config file, then
//! built-in defaults.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use lutron_core::DeviceId;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lutron_bridge::infrastructure::config_file::{load_config, FileConfig};
use lutron_bridge::infrastructure::console::run_console;
use lutron_bridge::infrastructure::TracingEventSink;
use lutron_bridge::LutronBridge;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Bridge to a Lutron lighting gateway's telnet integration protocol.
#[derive(Debug, Parser)]
#[command(
    name = "lutron-bridge",
    about = "Keeps a telnet integration session to a Lutron gateway and caches output levels",
    version
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// IP address of the gateway.  Host names are not resolved.
    #[arg(long, env = "LUTRON_HOST")]
    host: Option<String>,

    /// Telnet integration port of the gateway.
    #[arg(long, env = "LUTRON_PORT")]
    port: Option<u16>,

    /// Query output ids 0..SCAN right after connecting to prime the cache.
    #[arg(long, env = "LUTRON_SCAN")]
    scan: Option<DeviceId>,

    /// `tracing` filter used when `RUST_LOG` is unset (e.g. `debug`).
    #[arg(long, env = "LUTRON_LOG")]
    log_level: Option<String>,
}

impl Cli {
    /// Overlays the values given on the command line onto `file`.
    fn apply_to(&self, file: &mut FileConfig) {
        if let Some(host) = &self.host {
            file.gateway.host = host.clone();
        }
        if let Some(port) = self.port {
            file.gateway.port = port;
        }
        if let Some(scan) = self.scan {
            file.scan.on_connect = Some(scan);
        }
        if let Some(level) = &self.log_level {
            file.logging.level = level.clone();
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut file = load_config(cli.config.as_deref()).context("loading config file")?;
    cli.apply_to(&mut file);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&file.logging.level)),
        )
        .init();

    let config = file.to_bridge_config().context("invalid gateway address")?;
    info!("Lutron bridge starting, gateway={}", config.gateway_addr);

    let bridge = LutronBridge::new(config, Arc::new(TracingEventSink));
    bridge
        .connect()
        .await
        .with_context(|| format!("connecting to {}", bridge.config().gateway_addr))?;

    if let Some(max_id) = file.scan.on_connect {
        match bridge.initialize_range(max_id).await {
            Ok(sent) => info!("primed cache with {sent} queries"),
            Err(e) => warn!("cache priming stopped early: {e}"),
        }
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    tokio::select! {
        result = run_console(&bridge, stdin, stdout) => {
            if let Err(e) = result {
                error!("console I/O error: {e}");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("received Ctrl+C, shutting down"),
                Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
            }
        }
    }

    bridge.disconnect().await;
    info!("Lutron bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
