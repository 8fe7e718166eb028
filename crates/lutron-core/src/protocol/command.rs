//! Outbound command lines.
//!
//! The bridge never validates ranges: a level of `150` or `-5` is forwarded
//! exactly as given, because the gateway is the authority on what an output
//! accepts.

use std::fmt;

use crate::domain::device::DeviceId;
use crate::protocol::{ACTION_OUTPUT_LEVEL, LINE_TERMINATOR, LOGIN_SEQUENCE};

/// A single line the bridge can send to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `#OUTPUT,<id>,1,<level>` with the level rendered to two decimals.
    SetLevel { device_id: DeviceId, level: f64 },
    /// `?OUTPUT,<id>,1`; the answer arrives later as an `~OUTPUT` event.
    QueryLevel { device_id: DeviceId },
    /// Any other protocol line, sent verbatim.
    Raw(String),
}

impl Command {
    /// The login lines, in the order they must be sent.
    pub fn login_sequence() -> [Command; 2] {
        LOGIN_SEQUENCE.map(|line| Command::Raw(line.to_string()))
    }

    /// Builds a raw command, dropping any line terminator the caller included
    /// so the line is never terminated twice.
    pub fn raw(line: impl Into<String>) -> Self {
        let mut line = line.into();
        let trimmed_len = line.trim_end_matches(&['\r', '\n'][..]).len();
        line.truncate(trimmed_len);
        Command::Raw(line)
    }

    /// Renders the command as wire bytes, terminator included.
    pub fn encode(&self) -> Vec<u8> {
        format!("{self}{LINE_TERMINATOR}").into_bytes()
    }
}

impl fmt::Display for Command {
    /// Renders the command without its terminator.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetLevel { device_id, level } => {
                write!(f, "#OUTPUT,{device_id},{ACTION_OUTPUT_LEVEL},{level:.2}")
            }
            Command::QueryLevel { device_id } => {
                write!(f, "?OUTPUT,{device_id},{ACTION_OUTPUT_LEVEL}")
            }
            Command::Raw(line) => f.write_str(line),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_level_renders_two_decimals() {
        let cmd = Command::SetLevel {
            device_id: 5,
            level: 100.0,
        };
        assert_eq!(cmd.to_string(), "#OUTPUT,5,1,100.00");
    }

    #[test]
    fn test_set_level_rounds_to_two_decimals() {
        let cmd = Command::SetLevel {
            device_id: 12,
            level: 33.333,
        };
        assert_eq!(cmd.to_string(), "#OUTPUT,12,1,33.33");
    }

    #[test]
    fn test_set_level_forwards_out_of_range_values() {
        let cmd = Command::SetLevel {
            device_id: 3,
            level: 150.0,
        };
        assert_eq!(cmd.to_string(), "#OUTPUT,3,1,150.00");
    }

    #[test]
    fn test_query_level_renders_without_level() {
        let cmd = Command::QueryLevel { device_id: 42 };
        assert_eq!(cmd.to_string(), "?OUTPUT,42,1");
    }

    #[test]
    fn test_encode_appends_crlf() {
        let cmd = Command::QueryLevel { device_id: 1 };
        assert_eq!(cmd.encode(), b"?OUTPUT,1,1\r\n".to_vec());
    }

    #[test]
    fn test_raw_strips_caller_terminator() {
        assert_eq!(Command::raw("#DEVICE,1,2,3\r\n").encode(), b"#DEVICE,1,2,3\r\n".to_vec());
        assert_eq!(Command::raw("?SYSTEM,1\n").to_string(), "?SYSTEM,1");
    }

    #[test]
    fn test_login_sequence_order() {
        let lines: Vec<String> = Command::login_sequence().iter().map(ToString::to_string).collect();
        assert_eq!(lines, vec!["lutron", "integration"]);
    }
}
