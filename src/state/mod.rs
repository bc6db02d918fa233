//! State management module.
//!
//! Contains the shared server state (line store plus local sessions) and
//! the concrete session types the line store operates on.

mod server;
mod session;

pub use server::{ServerState, TickReport, unix_now};
pub use session::{LocalSession, SessionTable};
