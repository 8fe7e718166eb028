//! Application layer for lutron-bridge.
//!
//! The application layer knows *what* to do with gateway traffic, but
//! delegates *how* bytes move to the infrastructure layer through the
//! [`GatewayLink`] trait.
//!
//! # Responsibilities
//!
//! - Turning drained bytes into cache updates and notifications ([`ListenerLoop`])
//! - Turning caller requests into protocol lines ([`CommandTranslator`])
//! - The operator console grammar ([`console`])
//! - Defining [`BridgeError`], the error every caller-facing operation returns
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or serializing access to them (that is `infrastructure::session`)
//! - Spawning or joining tasks (that is `bridge`)

pub mod console;
pub mod error;
pub mod link;
pub mod listener;
pub mod translator;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::BridgeError;
pub use link::GatewayLink;
pub use listener::ListenerLoop;
pub use translator::CommandTranslator;
