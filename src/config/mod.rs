//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig)
//! - [`xlines`]: X-line enforcement settings and static line blocks
//! - [`validation`]: Startup checks

mod types;
mod validation;
mod xlines;

pub use types::{Config, ServerConfig};
pub use validation::{ValidationError, validate};
pub use xlines::{StaticLine, XLinesConfig};
