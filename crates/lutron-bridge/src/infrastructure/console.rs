//! Line-oriented operator console.
//!
//! Reads one command per line (grammar in `application::console`), runs it
//! against a [`LutronBridge`], and writes a one-line (or, for `all` and
//! `help`, multi-line) reply.  The binary wires this to stdin/stdout; tests
//! wire it to in-memory buffers.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::application::console::{ConsoleCommand, HELP};
use crate::bridge::LutronBridge;

/// What the console loop should do after a command.
#[derive(Debug, PartialEq)]
pub enum Reply {
    /// Print this text and read the next line.
    Text(String),
    /// Stop reading.
    Quit,
}

/// Runs one parsed command.
pub async fn execute(bridge: &LutronBridge, command: ConsoleCommand) -> Reply {
    let text = match command {
        ConsoleCommand::Set { device_id, level } => match bridge.set_level(device_id, level).await {
            Ok(()) => format!("ok: output {device_id} set to {level:.2}"),
            Err(e) => format!("error: {e}"),
        },
        ConsoleCommand::Query { device_id } => match bridge.query_level(device_id).await {
            Ok(()) => format!("ok: queried output {device_id}"),
            Err(e) => format!("error: {e}"),
        },
        ConsoleCommand::Level { device_id } => match bridge.cached_level(device_id) {
            Some(device) => format!(
                "output {} {} at {:.2} (on level {:.2})",
                device.id,
                if device.is_on() { "on" } else { "off" },
                device.current_level,
                device.on_level
            ),
            None => format!("output {device_id} not seen yet"),
        },
        ConsoleCommand::All => {
            let batch = bridge.describe_all_devices();
            if batch.is_empty() {
                "no outputs cached".to_string()
            } else {
                batch.trim_end().to_string()
            }
        }
        ConsoleCommand::Bulk(batch) => match bridge.apply_bulk_state(&batch).await {
            Ok(n) => format!("ok: {n} levels sent"),
            Err(e) => format!("error: {e}"),
        },
        ConsoleCommand::Raw(line) => match bridge.send_raw(&line).await {
            Ok(()) => "ok".to_string(),
            Err(e) => format!("error: {e}"),
        },
        ConsoleCommand::Scan { max_id } => match bridge.initialize_range(max_id).await {
            Ok(n) => format!("ok: {n} queries sent"),
            Err(e) => format!("error: {e}"),
        },
        ConsoleCommand::Status => format!(
            "{} ({} outputs cached)",
            bridge.state(),
            bridge.devices().len()
        ),
        ConsoleCommand::Help => HELP.to_string(),
        ConsoleCommand::Quit => return Reply::Quit,
    };
    Reply::Text(text)
}

/// Reads commands from `input` until `quit` or end of input.
///
/// # Errors
///
/// Returns any I/O error from `input` or `output`.  Command failures are
/// reported as reply text, not as errors.
pub async fn run_console<R, W>(bridge: &LutronBridge, input: R, mut output: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        debug!("console: {line}");

        let reply = match line.parse::<ConsoleCommand>() {
            Ok(command) => execute(bridge, command).await,
            Err(e) => Reply::Text(format!("error: {e}")),
        };
        match reply {
            Reply::Text(text) => {
                output.write_all(text.as_bytes()).await?;
                output.write_all(b"\n").await?;
                output.flush().await?;
            }
            Reply::Quit => break,
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
