//! X-lines: server-level bans and exemptions.
//!
//! Provides:
//! - **Wildcard matching**: `*`/`?` globs with RFC 1459 case folding
//! - **Line types**: G/K/Z/Q-line bans and E-line exemptions
//! - **Line store**: expiry-sorted active list, per-type index, pending queue
//!
//! # Architecture
//!
//! ```text
//! add_*() ──► XLineManager ──► active_lines (sorted by expiry, permanent last)
//!                  │      └──► lookup_lines (type -> mask -> line)
//!                  │      └──► pending_lines ──► apply_pending(sessions)
//!                  │
//!                  ├── sweep_expired(now) pops the front of active_lines
//!                  └── E-line changes ──► recompute_exemptions(sessions)
//! ```

pub mod manager;
pub mod session;
pub mod types;
pub mod wildcard;

pub use manager::{AddOutcome, XLineManager};
pub use session::{Session, SessionSet};
pub use types::{Disconnect, EnforcementOptions, LineMask, LineType, XLine};
pub use wildcard::matches;
