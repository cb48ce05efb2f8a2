//! App Builder
//!
//! Sequential multi-binary build driver for a kernel's user-program crate.
//! Every file in the source directory becomes one binary, built with
//! `cargo build --bin <name> --release` and its placement (base address)
//! handed to the child through `BASE_ADDRESS`.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Core data structures and types
//! - **config**: JSON configuration with stock defaults
//! - **orchestrator**: Discovery, process execution and the driver loop
//! - **linker**: Linker script rendering and app bundle generation
//! - **log_collector**: Disk-persisting `log` backend

pub mod config;
pub mod error;
pub mod linker;
pub mod log_collector;
pub mod models;
pub mod orchestrator;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::{LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{BuildError, BundleError, ConfigError, Result, TemplateError};

pub use models::{
    BuildInvocation, BuildReport, FailurePolicy, Placement, ProcessOutput, SourceUnit,
    UnitOutcome, UnitStatus,
};

pub use config::{BundleConfig, DriverConfig, LinkerScriptConfig};

pub use orchestrator::{
    discover_units, runner_from_env, BuildDriver, DriverPhase, DriverState, DryRunRunner,
    ProcessRunner, TokioProcessRunner,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert_eq!(VERSION, "0.1.0");
    }

    #[test]
    fn test_reexports_accessible() {
        let _: Result<i32> = Ok(42);
        let _policy = FailurePolicy::Ignore;
        assert_eq!(DriverPhase::Idle, DriverPhase::Idle);
        assert_eq!(Placement::default(), Placement::SharedAddress { address: 4096 });
    }
}
