//! slircd-xline - X-line access control for the Straylight IRC daemon.
//!
//! Stores, matches, expires and enforces server bans (G/K/Z/Q-lines) and
//! ban exemptions (E-lines) against connected sessions.

pub mod config;
pub mod error;
pub mod state;
pub mod xline;

pub use error::{ConfigError, XLineError};
pub use state::ServerState;
pub use xline::{LineType, XLine, XLineManager};
