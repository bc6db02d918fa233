//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("server.sid must be exactly 3 characters, got {0}")]
    InvalidSid(usize),
    #[error("xlines.sweep_interval must be at least 1 second")]
    ZeroSweepInterval,
    #[error("xlines.{block} entry {index} has an empty mask")]
    EmptyMask { block: &'static str, index: usize },
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }
    if config.server.sid.len() != 3 {
        errors.push(ValidationError::InvalidSid(config.server.sid.len()));
    }

    let xlines = &config.xlines;
    if xlines.sweep_interval == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }

    let blocks = [
        ("gline", &xlines.gline),
        ("kline", &xlines.kline),
        ("zline", &xlines.zline),
        ("qline", &xlines.qline),
        ("exception", &xlines.exception),
    ];
    for (block, entries) in blocks {
        for (index, entry) in entries.iter().enumerate() {
            if entry.mask.trim().is_empty() {
                errors.push(ValidationError::EmptyMask { block, index });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
