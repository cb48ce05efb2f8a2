//! Configuration module for the build driver.
//!
//! Every field has a default, so an absent or empty configuration file
//! reproduces the stock behavior: every file in `src/bin` is built with
//! `cargo build --bin <name> --release` and `BASE_ADDRESS=4096`.
//!
//! # Module Structure
//!
//! - `loader`: Handles locating and loading JSON configuration files

pub mod loader;

use crate::error::ConfigError;
use crate::models::{FailurePolicy, Placement};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

static ENV_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid env key regex")
});

/// Linker script rendered before each unit's build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkerScriptConfig {
    /// Template containing `${VAR}` references (e.g. `src/linker.ld`)
    pub template: PathBuf,
    /// Rendered output consumed by the linker (e.g. `src/tmp-linker.ld`)
    pub output: PathBuf,
}

/// Assembly manifest embedding every built binary into the kernel image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Directory holding `<name>.bin` images
    pub binary_dir: PathBuf,
    /// Generated assembly file (e.g. `../os/src/link_app.asm`)
    pub output: PathBuf,
}

/// Complete build driver configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Directory containing one source file per binary
    pub source_dir: PathBuf,
    /// Placement scheme for the base address
    pub placement: Placement,
    /// Environment key carrying the placement to the child process
    pub placement_env: String,
    /// Build program
    pub program: String,
    /// Leading arguments before `--bin <name>`
    pub subcommand: Vec<String>,
    /// Append `--release`
    pub release: bool,
    pub failure_policy: FailurePolicy,
    pub linker_script: Option<LinkerScriptConfig>,
    pub bundle: Option<BundleConfig>,
    /// Minimum level echoed to stderr: off, error, warn, info, debug, trace
    pub log_level: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            source_dir: PathBuf::from("src/bin"),
            placement: Placement::default(),
            placement_env: "BASE_ADDRESS".to_string(),
            program: "cargo".to_string(),
            subcommand: vec!["build".to_string()],
            release: true,
            failure_policy: FailurePolicy::Ignore,
            linker_script: None,
            bundle: None,
            log_level: "info".to_string(),
        }
    }
}

impl DriverConfig {
    /// Check field-level invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "source_dir cannot be empty".to_string(),
            ));
        }

        if self.program.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "program cannot be empty".to_string(),
            ));
        }

        if !ENV_KEY_RE.is_match(&self.placement_env) {
            return Err(ConfigError::ValidationFailed(format!(
                "placement_env '{}' is not a valid environment variable name",
                self.placement_env
            )));
        }

        self.level_filter()?;
        Ok(())
    }

    /// Parse `log_level` into a `log` filter.
    pub fn level_filter(&self) -> Result<log::LevelFilter, ConfigError> {
        self.log_level.parse::<log::LevelFilter>().map_err(|_| {
            ConfigError::ValidationFailed(format!("unknown log_level '{}'", self.log_level))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_stock_behavior() {
        let config = DriverConfig::default();
        assert_eq!(config.source_dir, PathBuf::from("src/bin"));
        assert_eq!(config.placement, Placement::SharedAddress { address: 4096 });
        assert_eq!(config.placement_env, "BASE_ADDRESS");
        assert_eq!(config.program, "cargo");
        assert_eq!(config.subcommand, vec!["build".to_string()]);
        assert!(config.release);
        assert_eq!(config.failure_policy, FailurePolicy::Ignore);
        assert!(config.linker_script.is_none());
        assert!(config.bundle.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_yields_defaults() {
        let config: DriverConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DriverConfig::default());
    }

    #[test]
    fn test_invalid_env_key_rejected() {
        let config = DriverConfig {
            placement_env: "BASE-ADDRESS".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn test_empty_program_rejected() {
        let config = DriverConfig {
            program: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let config = DriverConfig {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DriverConfig {
            log_level: "DEBUG".to_string(),
            ..Default::default()
        };
        assert_eq!(config.level_filter().unwrap(), log::LevelFilter::Debug);
    }
}
