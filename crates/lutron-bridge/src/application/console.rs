//! Grammar of the operator console.
//!
//! One command per line; the verb is case-insensitive.
//!
//! ```text
//! set 5,100        set output 5 to 100%   (also: set 5 100)
//! get 5            ask the gateway for output 5's level
//! level 5          show the cached level of output 5
//! all              describe every cached output as D=&L= lines
//! bulk D=3&L=20 D=9&L=75   set several levels at once
//! raw ?SYSTEM,1    send any protocol line
//! scan 90          query ids 0..90 to prime the cache
//! status           show the session state
//! help             list commands
//! quit             disconnect and exit
//! ```

use std::str::FromStr;

use lutron_core::protocol::LINE_TERMINATOR;
use lutron_core::DeviceId;
use thiserror::Error;

/// Usage text printed by `help`.
pub const HELP: &str = "\
commands:
  set <id>,<level>   set an output level (also: set <id> <level>)
  get <id>           query an output level from the gateway
  level <id>         show the cached level of an output
  all                describe every cached output
  bulk <D=id&L=level>...  set several levels at once
  raw <line>         send a protocol line verbatim
  scan <max>         query ids 0..max to prime the cache
  status             show the session state
  help               show this text
  quit               disconnect and exit";

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Set { device_id: DeviceId, level: f64 },
    Query { device_id: DeviceId },
    Level { device_id: DeviceId },
    All,
    /// Tokens re-joined into a CRLF-terminated `D=&L=` batch.
    Bulk(String),
    Raw(String),
    Scan { max_id: DeviceId },
    Status,
    Help,
    Quit,
}

/// Why a console line could not be parsed.
#[derive(Debug, Error, PartialEq)]
pub enum ConsoleError {
    #[error("empty command")]
    Empty,

    #[error("unknown command {0:?}; type `help`")]
    UnknownVerb(String),

    #[error("`{verb}` needs {what}")]
    MissingArgument { verb: &'static str, what: &'static str },

    #[error("invalid {what}: {value:?}")]
    InvalidNumber { what: &'static str, value: String },
}

impl FromStr for ConsoleCommand {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(v, r)| (v, r.trim()));
        if verb.is_empty() {
            return Err(ConsoleError::Empty);
        }

        match verb.to_ascii_lowercase().as_str() {
            "set" => {
                let (device_id, level) = parse_dimmer_request(rest)?;
                Ok(ConsoleCommand::Set { device_id, level })
            }
            "get" => Ok(ConsoleCommand::Query {
                device_id: parse_id(rest, "get")?,
            }),
            "level" => Ok(ConsoleCommand::Level {
                device_id: parse_id(rest, "level")?,
            }),
            "all" => Ok(ConsoleCommand::All),
            "bulk" => {
                if rest.is_empty() {
                    return Err(ConsoleError::MissingArgument {
                        verb: "bulk",
                        what: "at least one D=<id>&L=<level> token",
                    });
                }
                let batch = rest
                    .split_whitespace()
                    .map(|token| format!("{token}{LINE_TERMINATOR}"))
                    .collect();
                Ok(ConsoleCommand::Bulk(batch))
            }
            "raw" => {
                if rest.is_empty() {
                    return Err(ConsoleError::MissingArgument {
                        verb: "raw",
                        what: "a protocol line",
                    });
                }
                Ok(ConsoleCommand::Raw(rest.to_string()))
            }
            "scan" => Ok(ConsoleCommand::Scan {
                max_id: parse_id(rest, "scan")?,
            }),
            "status" => Ok(ConsoleCommand::Status),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            other => Err(ConsoleError::UnknownVerb(other.to_string())),
        }
    }
}

/// Parses a `"<id>,<level>"` (or `"<id> <level>"`) dimmer request.
///
/// # Errors
///
/// Returns [`ConsoleError::MissingArgument`] if either half is absent and
/// [`ConsoleError::InvalidNumber`] if either is not a number.
pub fn parse_dimmer_request(request: &str) -> Result<(DeviceId, f64), ConsoleError> {
    let missing = ConsoleError::MissingArgument {
        verb: "set",
        what: "<id>,<level>",
    };
    let (id, level) = request
        .split_once(',')
        .or_else(|| request.split_once(char::is_whitespace))
        .ok_or(missing)?;

    let device_id = parse_id(id, "set")?;
    let level = level.trim();
    let level = level
        .parse::<f64>()
        .ok()
        .filter(|l| l.is_finite())
        .ok_or_else(|| ConsoleError::InvalidNumber {
            what: "level",
            value: level.to_string(),
        })?;
    Ok((device_id, level))
}

fn parse_id(raw: &str, verb: &'static str) -> Result<DeviceId, ConsoleError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConsoleError::MissingArgument {
            verb,
            what: "an output id",
        });
    }
    raw.parse().map_err(|_| ConsoleError::InvalidNumber {
        what: "output id",
        value: raw.to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
