//! Lifecycle states of the gateway session.

use std::fmt;

/// Where the single gateway connection is in its lifecycle.
///
/// ```text
/// Disconnected ──connect()──► Connecting ──TCP up──► Authenticating
///      ▲                          │                       │
///      │                     connect failed        login settled
///      │                          ▼                       ▼
///      └──────────────────── Disconnected ◄─disconnect()/EOF── Connected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Authenticating,
    Connected,
}

impl SessionState {
    /// Only a fully logged-in session accepts commands.
    pub fn is_connected(self) -> bool {
        self == SessionState::Connected
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Authenticating => "authenticating",
            SessionState::Connected => "connected",
        };
        f.write_str(name)
    }
}
