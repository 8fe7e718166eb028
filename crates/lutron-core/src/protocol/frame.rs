//! Incremental parser for inbound `~OUTPUT` event lines.
//!
//! # Why the parser keeps a buffer
//!
//! TCP is a *stream* protocol: a single read may return half an event line,
//! or several lines glued together.  A line split across two reads, such as
//!
//! ```text
//! read 1:  ~OUTPUT,5,1,10
//! read 2:  0.00\r\n
//! ```
//!
//! must still produce one frame for device 5 at level 100.00.  The parser
//! therefore owns an accumulation buffer: [`FrameParser::feed`] appends the
//! new bytes, extracts every complete line it can, and keeps the unconsumed
//! tail for the next call.
//!
//! # Scanning rules
//!
//! 1. Look for the event marker `~OUTPUT,`.  Bytes before it (prompts such as
//!    `GNET> `, echoes of our own commands, other event families) are
//!    discarded, except for a trailing fragment that could be the start of
//!    the next marker.
//! 2. Look for the CRLF terminator after the marker.  If it has not arrived
//!    yet, stop and wait for more bytes.
//! 3. Split the line body on commas: device id, action, level.  A numeric
//!    parse failure makes the line malformed: the parser skips past the
//!    marker and keeps scanning.  Nothing is ever surfaced to the caller
//!    except well-formed frames.
//! 4. Only action `1` (output level changed) yields a [`Frame`]; other
//!    actions are recognized and dropped.

use std::str;

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::device::DeviceId;
use crate::protocol::{ACTION_OUTPUT_LEVEL, EVENT_MARKER, LINE_TERMINATOR};

/// Default cap on an unterminated line held in the buffer.
pub const DEFAULT_MAX_PENDING: usize = 4096;

/// One parsed "output level changed" event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Integration id of the output that changed.
    pub device_id: DeviceId,
    /// Action number from the line; always [`ACTION_OUTPUT_LEVEL`] for frames
    /// returned by [`FrameParser::feed`].
    pub command_code: u16,
    /// New level, 0.00–100.00.
    pub level: f64,
}

/// Reasons a line following the event marker was rejected.
///
/// These never leave the parser; they are logged and the scan resumes at the
/// next marker.
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    /// The line ended before a required field.
    #[error("missing {0} field")]
    MissingField(&'static str),

    /// A field was present but not a valid number.
    #[error("invalid {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    /// The line contained bytes that are not UTF-8.
    #[error("line is not valid UTF-8")]
    NotText,

    /// Another event marker appeared before this line's terminator, so this
    /// line was cut short on the wire.
    #[error("line truncated by a following event marker")]
    Truncated,

    /// No terminator arrived within the pending-bytes limit.
    #[error("unterminated line exceeds {limit} bytes ({pending} pending)")]
    Oversized { pending: usize, limit: usize },
}

/// Result of scanning one line out of the buffer.
#[derive(Debug, PartialEq)]
enum Scanned {
    Frame(Frame),
    Ignored { device_id: DeviceId, command_code: u16 },
    Malformed(FrameError),
}

/// Stateful parser that turns an arbitrarily chunked byte stream into
/// [`Frame`]s.
///
/// # Examples
///
/// ```rust
/// use lutron_core::FrameParser;
///
/// let mut parser = FrameParser::new();
/// assert!(parser.feed(b"~OUTPUT,5,1,10").is_empty());
///
/// let frames = parser.feed(b"0.00\r\n");
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].device_id, 5);
/// assert_eq!(frames[0].level, 100.0);
/// ```
#[derive(Debug)]
pub struct FrameParser {
    buffer: Vec<u8>,
    max_pending: usize,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Creates a parser with the default pending-bytes limit.
    pub fn new() -> Self {
        Self::with_max_pending(DEFAULT_MAX_PENDING)
    }

    /// Creates a parser that gives up on an unterminated line once more than
    /// `max_pending` bytes are buffered after its marker.
    pub fn with_max_pending(max_pending: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(256),
            max_pending,
        }
    }

    /// Appends `bytes` to the buffer and returns every complete level-change
    /// frame now available, in arrival order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(scanned) = self.next_line() {
            match scanned {
                Scanned::Frame(frame) => {
                    debug!(
                        "processing frame: device={}, level={:.2}",
                        frame.device_id, frame.level
                    );
                    frames.push(frame);
                }
                Scanned::Ignored {
                    device_id,
                    command_code,
                } => {
                    debug!("ignoring output event: device={device_id}, action={command_code}");
                }
                Scanned::Malformed(e) => {
                    warn!("discarding malformed output event: {e}");
                }
            }
        }
        frames
    }

    /// Bytes retained for the next call (an incomplete line or a partial marker).
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Drops any retained bytes, e.g. when a new connection starts.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Extracts one line from the front of the buffer, or returns `None` when
    /// more bytes are needed.
    fn next_line(&mut self) -> Option<Scanned> {
        let marker = EVENT_MARKER.as_bytes();

        let Some(start) = find(&self.buffer, marker) else {
            // Keep only what could still grow into a marker.
            let keep = partial_marker_len(&self.buffer, marker);
            let discard = self.buffer.len() - keep;
            self.buffer.drain(..discard);
            return None;
        };
        self.buffer.drain(..start);

        let body_start = marker.len();
        let Some(body_len) = find(&self.buffer[body_start..], LINE_TERMINATOR.as_bytes()) else {
            let pending = self.buffer.len() - body_start;
            if pending > self.max_pending {
                self.buffer.drain(..body_start);
                return Some(Scanned::Malformed(FrameError::Oversized {
                    pending,
                    limit: self.max_pending,
                }));
            }
            return None;
        };
        let body_end = body_start + body_len;

        match parse_body(&self.buffer[body_start..body_end]) {
            Ok(scanned) => {
                self.buffer.drain(..body_end + LINE_TERMINATOR.len());
                Some(scanned)
            }
            Err(e) => {
                // Skip only the marker: a complete line may start inside the
                // rejected body.
                self.buffer.drain(..body_start);
                Some(Scanned::Malformed(e))
            }
        }
    }
}

/// Parses the text between the marker and the terminator.
fn parse_body(body: &[u8]) -> Result<Scanned, FrameError> {
    if find(body, EVENT_MARKER.as_bytes()).is_some() {
        return Err(FrameError::Truncated);
    }
    let text = str::from_utf8(body).map_err(|_| FrameError::NotText)?;
    let mut fields = text.split(',').map(str::trim);

    let device_id: DeviceId = parse_field(fields.next(), "device id")?;
    let command_code: u16 = parse_field(fields.next(), "action")?;

    if command_code != ACTION_OUTPUT_LEVEL {
        return Ok(Scanned::Ignored {
            device_id,
            command_code,
        });
    }

    // Fields after the level (fade and delay on some firmware) are ignored.
    let level: f64 = parse_field(fields.next(), "level")?;
    if !level.is_finite() {
        return Err(FrameError::InvalidNumber {
            field: "level",
            value: level.to_string(),
        });
    }

    Ok(Scanned::Frame(Frame {
        device_id,
        command_code,
        level,
    }))
}

fn parse_field<T: str::FromStr>(raw: Option<&str>, field: &'static str) -> Result<T, FrameError> {
    let raw = raw.filter(|s| !s.is_empty()).ok_or(FrameError::MissingField(field))?;
    raw.parse().map_err(|_| FrameError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Length of the longest suffix of `buffer` that is a proper prefix of `marker`.
fn partial_marker_len(buffer: &[u8], marker: &[u8]) -> usize {
    let max = (marker.len() - 1).min(buffer.len());
    (1..=max)
        .rev()
        .find(|&n| buffer.ends_with(&marker[..n]))
        .unwrap_or(0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(device_id: DeviceId, level: f64) -> Frame {
        Frame {
            device_id,
            command_code: ACTION_OUTPUT_LEVEL,
            level,
        }
    }

    #[test]
    fn test_single_complete_line_yields_one_frame() {
        // Arrange
        let mut parser = FrameParser::new();

        // Act
        let frames = parser.feed(b"~OUTPUT,5,1,100.00\r\n");

        // Assert
        assert_eq!(frames, vec![frame(5, 100.0)]);
        assert!(parser.pending().is_empty());
    }

    #[test]
    fn test_line_split_across_two_feeds_is_reassembled() {
        let mut parser = FrameParser::new();

        assert!(parser.feed(b"~OUTPUT,5,1,10").is_empty());
        assert_eq!(parser.pending(), b"~OUTPUT,5,1,10");

        let frames = parser.feed(b"0.00\r\n");
        assert_eq!(frames, vec![frame(5, 100.0)]);
    }

    #[test]
    fn test_split_between_cr_and_lf_waits_for_terminator() {
        let mut parser = FrameParser::new();
        assert!(parser.feed(b"~OUTPUT,5,1,40.00\r").is_empty());
        assert_eq!(parser.feed(b"\n"), vec![frame(5, 40.0)]);
    }

    #[test]
    fn test_marker_split_across_feeds_is_retained() {
        // Arrange: the marker itself is cut in half
        let mut parser = FrameParser::new();

        // Act
        assert!(parser.feed(b"GNET> ~OUT").is_empty());
        let frames = parser.feed(b"PUT,7,1,30.00\r\n");

        // Assert: the prompt was discarded, the marker fragment was kept
        assert_eq!(frames, vec![frame(7, 30.0)]);
    }

    #[test]
    fn test_unrelated_bytes_are_discarded() {
        let mut parser = FrameParser::new();
        assert!(parser.feed(b"login: password: GNET> ~DEVICE,1,2,3\r\n").is_empty());
        assert!(parser.pending().is_empty());
    }

    #[test]
    fn test_multiple_lines_in_one_feed_are_returned_in_order() {
        let mut parser = FrameParser::new();
        let frames = parser.feed(b"~OUTPUT,5,1,100.00\r\nGNET> ~OUTPUT,7,1,30.00\r\n~OUTPUT,9");

        assert_eq!(frames, vec![frame(5, 100.0), frame(7, 30.0)]);
        assert_eq!(parser.pending(), b"~OUTPUT,9");
    }

    #[test]
    fn test_non_level_action_is_discarded() {
        let mut parser = FrameParser::new();
        let frames = parser.feed(b"~OUTPUT,5,29,6\r\n~OUTPUT,5,2\r\n");
        assert!(frames.is_empty());
        assert!(parser.pending().is_empty());
    }

    #[test]
    fn test_non_numeric_level_is_skipped_and_scan_resumes() {
        // Arrange: a bad line followed by a good one in the same buffer
        let mut parser = FrameParser::new();

        // Act
        let frames = parser.feed(b"~OUTPUT,5,1,abc\r\n~OUTPUT,6,1,20.00\r\n");

        // Assert
        assert_eq!(frames, vec![frame(6, 20.0)]);
    }

    #[test]
    fn test_missing_tokens_are_skipped_and_scan_resumes() {
        let mut parser = FrameParser::new();
        let frames = parser.feed(b"~OUTPUT,\r\n~OUTPUT,5,1\r\n~OUTPUT,6,1,20.00\r\n");
        assert_eq!(frames, vec![frame(6, 20.0)]);
    }

    #[test]
    fn test_truncated_line_does_not_swallow_following_frame() {
        // The first line lost its tail; its body runs into the next marker.
        let mut parser = FrameParser::new();
        let frames = parser.feed(b"~OUTPUT,5,29,x~OUTPUT,6,1,20.00\r\n");
        assert_eq!(frames, vec![frame(6, 20.0)]);
    }

    #[test]
    fn test_negative_device_id_is_malformed() {
        let mut parser = FrameParser::new();
        assert!(parser.feed(b"~OUTPUT,-1,1,20.00\r\n").is_empty());
    }

    #[test]
    fn test_non_finite_level_is_malformed() {
        let mut parser = FrameParser::new();
        assert!(parser.feed(b"~OUTPUT,5,1,NaN\r\n~OUTPUT,5,1,inf\r\n").is_empty());
    }

    #[test]
    fn test_trailing_fields_after_level_are_ignored() {
        let mut parser = FrameParser::new();
        let frames = parser.feed(b"~OUTPUT,5,1,50.00,00:02\r\n");
        assert_eq!(frames, vec![frame(5, 50.0)]);
    }

    #[test]
    fn test_whitespace_around_fields_is_tolerated() {
        let mut parser = FrameParser::new();
        let frames = parser.feed(b"~OUTPUT, 5 ,1, 75.5 \r\n");
        assert_eq!(frames, vec![frame(5, 75.5)]);
    }

    #[test]
    fn test_oversized_unterminated_line_is_dropped() {
        // Arrange: a tiny limit so the guard triggers quickly
        let mut parser = FrameParser::with_max_pending(8);

        // Act: marker followed by garbage that never terminates
        let frames = parser.feed(b"~OUTPUT,123456789");

        // Assert: the marker was skipped and nothing is retained for it
        assert!(frames.is_empty());
        assert!(!parser.pending().starts_with(b"~OUTPUT,"));

        // A later well-formed line is still parsed
        assert_eq!(parser.feed(b"~OUTPUT,5,1,1.00\r\n"), vec![frame(5, 1.0)]);
    }

    #[test]
    fn test_reset_clears_pending_bytes() {
        let mut parser = FrameParser::new();
        parser.feed(b"~OUTPUT,5,1");
        parser.reset();
        assert!(parser.pending().is_empty());
    }

    #[test]
    fn test_partial_marker_len_finds_longest_prefix() {
        let marker = EVENT_MARKER.as_bytes();
        assert_eq!(partial_marker_len(b"abc~OUT", marker), 4);
        assert_eq!(partial_marker_len(b"abc~", marker), 1);
        assert_eq!(partial_marker_len(b"abc", marker), 0);
        assert_eq!(partial_marker_len(b"", marker), 0);
    }

    #[test]
    fn test_parse_body_reports_field_errors() {
        assert_eq!(
            parse_body(b"x,1,2"),
            Err(FrameError::InvalidNumber {
                field: "device id",
                value: "x".to_string()
            })
        );
        assert_eq!(parse_body(b"5"), Err(FrameError::MissingField("action")));
        assert_eq!(parse_body(b"5,1,"), Err(FrameError::MissingField("level")));
    }
}
