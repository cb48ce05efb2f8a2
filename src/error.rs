//! Unified error type hierarchy for App Builder
//!
//! Provides structured error handling with ConfigError, BuildError,
//! TemplateError and BundleError.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Build driver execution errors.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Cannot list source directory {}: {source}", .path.display())]
    SourceDirUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Unit '{unit}' failed: {reason}")]
    UnitFailed { unit: String, reason: String },

    #[error("Placement overflow for unit #{index}: base {base:#x} + step {step:#x} * {index}")]
    PlacementOverflow { base: u64, step: u64, index: usize },

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Bundle generation failed: {0}")]
    Bundle(#[from] BundleError),
}

/// Linker script template rendering errors.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Linker template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Undefined variable '{0}' in linker template")]
    MissingVariable(String),

    #[error("IO error during template rendering: {0}")]
    IoError(#[from] io::Error),
}

/// App bundle (link_app assembly) generation errors.
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Cannot write bundle to {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to format bundle: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Top-level result type for operations that may fail.
/// Use this as the return type for top-level glue code.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::FileNotFound("/etc/app-builder.json".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration file not found: /etc/app-builder.json"
        );
    }

    #[test]
    fn test_source_dir_error_display() {
        let err = BuildError::SourceDirUnreadable {
            path: PathBuf::from("src/bin"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.to_string(), "Cannot list source directory src/bin: missing");
    }

    #[test]
    fn test_placement_overflow_display() {
        let err = BuildError::PlacementOverflow { base: 0x1000, step: 0x200000, index: 3 };
        assert_eq!(
            err.to_string(),
            "Placement overflow for unit #3: base 0x1000 + step 0x200000 * 3"
        );
    }

    #[test]
    fn test_template_missing_variable_display() {
        let err = TemplateError::MissingVariable("BASE_ADDRESS".to_string());
        assert_eq!(err.to_string(), "Undefined variable 'BASE_ADDRESS' in linker template");
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err("test error".into());
        assert!(result.is_err());
    }
}
