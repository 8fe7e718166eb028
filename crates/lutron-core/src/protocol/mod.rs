//! Protocol module containing the inbound frame parser, outbound command
//! encoding, and the `D=<id>&L=<level>` batch grammar.
//!
//! Wire grammar (every line is terminated by CRLF):
//!
//! ```text
//! in   ~OUTPUT,<id>,<action>,<level>   action 1 = output level changed
//! out  #OUTPUT,<id>,1,<level:.2>       set output level
//! out  ?OUTPUT,<id>,1                  query output level
//! out  lutron / integration            login, sent once after connect
//! ```

pub mod bulk;
pub mod command;
pub mod frame;

pub use bulk::{format_change_payload, format_device_states, parse_bulk_state, BulkParseError, LevelAssignment};
pub use command::Command;
pub use frame::{Frame, FrameError, FrameParser};

/// Line terminator used in both directions.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Literal token that prefixes every inbound output event line.
pub const EVENT_MARKER: &str = "~OUTPUT,";

/// Action number meaning "output level" in both events and commands.
pub const ACTION_OUTPUT_LEVEL: u16 = 1;

/// Lines sent once, in order, right after the transport connects.
///
/// The gateway prompts `login:` and `password:` but never acknowledges a
/// successful login, so callers wait a fixed settle delay afterwards.
pub const LOGIN_SEQUENCE: [&str; 2] = ["lutron", "integration"];

/// Default TCP port of the gateway's telnet integration service.
pub const TELNET_PORT: u16 = 23;
