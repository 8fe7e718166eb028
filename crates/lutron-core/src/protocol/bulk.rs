//! The `D=<id>&L=<level>` batch grammar used by external callers.
//!
//! A batch is a sequence of CRLF-terminated tokens:
//!
//! ```text
//! D=3&L=20.00\r\n
//! D=9&L=75.00\r\n
//! ```
//!
//! The same shape (with levels rounded to whole percent) describes the full
//! device cache in the opposite direction.

use std::fmt::Write as _;

use thiserror::Error;
use tracing::debug;

use crate::domain::device::{Device, DeviceId};
use crate::protocol::LINE_TERMINATOR;

const DEVICE_KEY: &str = "D=";
const LEVEL_SEPARATOR: &str = "&L=";

/// One `D=<id>&L=<level>` token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelAssignment {
    pub device_id: DeviceId,
    pub level: f64,
}

/// Why processing of a batch stopped early.
#[derive(Debug, Error, PartialEq)]
pub enum BulkParseError {
    #[error("token {0:?} does not start with D=")]
    MissingDevice(String),

    #[error("token {0:?} has no &L= level")]
    MissingLevel(String),

    #[error("invalid {field} in token {token:?}")]
    InvalidNumber { field: &'static str, token: String },
}

/// Parses a batch into assignments, in order.
///
/// Processing stops silently at the first malformed token; everything before
/// it is returned.  Empty lines are skipped, and the final token may omit its
/// terminator.
///
/// # Examples
///
/// ```rust
/// use lutron_core::parse_bulk_state;
///
/// let batch = parse_bulk_state("D=3&L=20.00\r\nD=9&L=75.00\r\n");
/// assert_eq!(batch.len(), 2);
/// assert_eq!(batch[1].device_id, 9);
/// ```
pub fn parse_bulk_state(spec: &str) -> Vec<LevelAssignment> {
    let mut assignments = Vec::new();
    for token in spec.split(LINE_TERMINATOR).map(str::trim) {
        if token.is_empty() {
            continue;
        }
        match parse_assignment(token) {
            Ok(assignment) => assignments.push(assignment),
            Err(e) => {
                debug!("bulk state parsing stopped: {e}");
                break;
            }
        }
    }
    assignments
}

fn parse_assignment(token: &str) -> Result<LevelAssignment, BulkParseError> {
    let rest = token
        .strip_prefix(DEVICE_KEY)
        .ok_or_else(|| BulkParseError::MissingDevice(token.to_string()))?;
    let (device, level) = rest
        .split_once(LEVEL_SEPARATOR)
        .ok_or_else(|| BulkParseError::MissingLevel(token.to_string()))?;

    let device_id = device.trim().parse().map_err(|_| BulkParseError::InvalidNumber {
        field: "device id",
        token: token.to_string(),
    })?;
    let level = level
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|l| l.is_finite())
        .ok_or_else(|| BulkParseError::InvalidNumber {
            field: "level",
            token: token.to_string(),
        })?;

    Ok(LevelAssignment { device_id, level })
}

/// Renders devices as `D=<id>&L=<level>` lines, levels rounded to whole
/// percent, in the order given.
pub fn format_device_states(devices: &[Device]) -> String {
    let mut out = String::with_capacity(devices.len() * 16);
    for device in devices {
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "{DEVICE_KEY}{}{LEVEL_SEPARATOR}{:.0}{LINE_TERMINATOR}",
            device.id, device.current_level
        );
    }
    out
}

/// Renders the payload of a single "device changed" notification:
/// `device=<id>&level=<level>` with the level rounded to whole percent.
pub fn format_change_payload(device_id: DeviceId, level: f64) -> String {
    format!("device={device_id}&level={level:.0}")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(device_id: DeviceId, level: f64) -> LevelAssignment {
        LevelAssignment { device_id, level }
    }

    #[test]
    fn test_parse_two_tokens_in_order() {
        let batch = parse_bulk_state("D=3&L=20.00\r\nD=9&L=75.00\r\n");
        assert_eq!(batch, vec![assignment(3, 20.0), assignment(9, 75.0)]);
    }

    #[test]
    fn test_parse_accepts_final_token_without_terminator() {
        let batch = parse_bulk_state("D=3&L=20\r\nD=9&L=75");
        assert_eq!(batch, vec![assignment(3, 20.0), assignment(9, 75.0)]);
    }

    #[test]
    fn test_parse_stops_at_first_malformed_token() {
        // Arrange: the middle token has a non-numeric level
        let spec = "D=3&L=20\r\nD=4&L=bright\r\nD=9&L=75\r\n";

        // Act
        let batch = parse_bulk_state(spec);

        // Assert: only the token before the bad one is applied
        assert_eq!(batch, vec![assignment(3, 20.0)]);
    }

    #[test]
    fn test_parse_stops_at_incomplete_trailing_token() {
        let batch = parse_bulk_state("D=3&L=20\r\nD=9&");
        assert_eq!(batch, vec![assignment(3, 20.0)]);
    }

    #[test]
    fn test_parse_empty_input_yields_nothing() {
        assert!(parse_bulk_state("").is_empty());
        assert!(parse_bulk_state("\r\n\r\n").is_empty());
    }

    #[test]
    fn test_parse_assignment_errors() {
        assert_eq!(
            parse_assignment("X=3&L=2"),
            Err(BulkParseError::MissingDevice("X=3&L=2".to_string()))
        );
        assert_eq!(
            parse_assignment("D=3"),
            Err(BulkParseError::MissingLevel("D=3".to_string()))
        );
        assert!(matches!(
            parse_assignment("D=x&L=2"),
            Err(BulkParseError::InvalidNumber { field: "device id", .. })
        ));
    }

    #[test]
    fn test_format_device_states_rounds_levels() {
        let devices = [Device::new(5, 100.0, 100.0), Device::new(7, 30.0, 100.0)];
        assert_eq!(format_device_states(&devices), "D=5&L=100\r\nD=7&L=30\r\n");
    }

    #[test]
    fn test_format_device_states_empty() {
        assert_eq!(format_device_states(&[]), "");
    }

    #[test]
    fn test_format_change_payload() {
        assert_eq!(format_change_payload(5, 99.6), "device=5&level=100");
    }
}
