//! Unified error handling for slircd-xline.
//!
//! Every error here is local and recoverable. The line store reports
//! "not found" as `false`/`None`, so these types only cover the cases a
//! caller may want to log or surface.

use crate::xline::LineType;
use thiserror::Error;

// ============================================================================
// Line Store Errors
// ============================================================================

/// Errors raised by the line store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XLineError {
    /// A line for this type and mask exists and could not be replaced.
    #[error("duplicate {line_type} for mask {mask}")]
    DuplicateMask { line_type: LineType, mask: String },

    /// The operation does not apply to this line type.
    #[error("operation not supported for {0}")]
    UnsupportedType(LineType),
}

impl XLineError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateMask { .. } => "duplicate_mask",
            Self::UnsupportedType(_) => "unsupported_type",
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "config_io",
            Self::Parse(_) => "config_parse",
        }
    }
}
