//! Build Orchestration: sequential per-unit build driver (Discovery -> Building -> Bundling).
//!
//! One external process is spawned and fully awaited before the next unit
//! starts. The placement value reaches each child through its own
//! environment; the driver's process environment is never modified.

pub mod discovery;
pub mod executor;
pub mod state;

use std::sync::Arc;

pub use discovery::{discover_units, units_from_file_names};
pub use executor::{runner_from_env, DryRunRunner, ProcessRunner, TokioProcessRunner};
pub use state::{DriverPhase, DriverState};

use crate::config::DriverConfig;
use crate::error::BuildError;
use crate::linker::{render_linker_script, write_bundle};
use crate::models::{
    BuildInvocation, BuildReport, FailurePolicy, Placement, SourceUnit, UnitOutcome, UnitStatus,
};

/// Sequential multi-binary build driver.
pub struct BuildDriver {
    config: DriverConfig,
    runner: Arc<dyn ProcessRunner>,
    state: DriverState,
}

impl BuildDriver {
    pub fn new(config: DriverConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        BuildDriver {
            config,
            runner,
            state: DriverState::default(),
        }
    }

    /// Snapshot of the most recent run.
    pub fn state(&self) -> &DriverState {
        &self.state
    }

    /// Build the invocation for one unit at the given placement.
    pub fn invocation_for(&self, unit: &SourceUnit, placement: u64) -> BuildInvocation {
        let mut invocation = BuildInvocation::new(self.config.program.as_str())
            .args(self.config.subcommand.iter().cloned())
            .arg("--bin")
            .arg(unit.name.as_str());
        if self.config.release {
            invocation = invocation.arg("--release");
        }
        invocation.env(self.config.placement_env.as_str(), placement.to_string())
    }

    /// Placement value for every unit, in unit order.
    pub fn placements_for(&self, units: &[SourceUnit]) -> Result<Vec<u64>, BuildError> {
        units
            .iter()
            .map(|unit| {
                self.config.placement.address_for(unit.index).ok_or_else(|| {
                    let (base, step) = match self.config.placement {
                        Placement::SteppedAddress { base, step } => (base, step),
                        Placement::SharedAddress { address } => (address, 0),
                    };
                    BuildError::PlacementOverflow {
                        base,
                        step,
                        index: unit.index,
                    }
                })
            })
            .collect()
    }

    /// Run the driver end-to-end.
    ///
    /// Fails only when the source directory cannot be listed, the placement
    /// overflows, the bundle cannot be written, or a unit fails under
    /// `FailurePolicy::Abort`.
    pub async fn run(&mut self) -> Result<BuildReport, BuildError> {
        self.state = DriverState::default();
        match self.run_phases().await {
            Ok(report) => Ok(report),
            Err(e) => {
                log::error!(target: "parsed", "Build driver failed: {}", e);
                self.state.fail(&e);
                Err(e)
            }
        }
    }

    async fn run_phases(&mut self) -> Result<BuildReport, BuildError> {
        self.state.transition_to(DriverPhase::Discovery)?;
        let units = discover_units(&self.config.source_dir)?;
        let placements = self.placements_for(&units)?;
        self.state.units_total = units.len();
        log::info!(
            target: "parsed",
            "Discovered {} unit(s) in {} [{}]",
            units.len(),
            self.config.source_dir.display(),
            self.config.placement
        );

        self.state.transition_to(DriverPhase::Building)?;
        let mut report = BuildReport::default();
        for (unit, placement) in units.iter().zip(placements) {
            let outcome = self.build_unit(unit, placement).await;
            self.state.record_unit(outcome.succeeded());
            self.handle_outcome(&outcome)?;
            report.outcomes.push(outcome);
        }

        if let Some(bundle) = &self.config.bundle {
            self.state.transition_to(DriverPhase::Bundling)?;
            let path = write_bundle(&units, bundle)?;
            log::info!(target: "parsed", "Wrote app bundle for {} unit(s) to {}", units.len(), path.display());
        }

        self.state.transition_to(DriverPhase::Completed)?;
        log::info!(
            target: "parsed",
            "Build finished: {} unit(s), {} succeeded, {} failed",
            report.outcomes.len(),
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }

    async fn build_unit(&self, unit: &SourceUnit, placement: u64) -> UnitOutcome {
        let invocation = self.invocation_for(unit, placement);
        log::info!(
            target: "parsed",
            "[{}/{}] Building '{}' at {:#x}",
            unit.index + 1,
            self.state.units_total,
            unit.name,
            placement
        );

        if let Some(linker) = &self.config.linker_script {
            if let Err(e) = render_linker_script(linker, &invocation.env) {
                return UnitOutcome {
                    unit: unit.clone(),
                    placement,
                    status: UnitStatus::NotStarted(format!("linker script: {}", e)),
                };
            }
        }

        let status = match self.runner.run(&invocation).await {
            Ok(output) => UnitStatus::Finished(output),
            Err(e) => UnitStatus::NotStarted(e.to_string()),
        };

        UnitOutcome {
            unit: unit.clone(),
            placement,
            status,
        }
    }

    /// Apply the failure policy to one outcome.
    fn handle_outcome(&self, outcome: &UnitOutcome) -> Result<(), BuildError> {
        let Some(reason) = outcome.failure_reason() else {
            return Ok(());
        };

        match self.config.failure_policy {
            FailurePolicy::Ignore => {
                log::warn!("Unit '{}' {} (ignored, continuing)", outcome.unit.name, reason);
                Ok(())
            }
            FailurePolicy::Abort => Err(BuildError::UnitFailed {
                unit: outcome.unit.name.clone(),
                reason,
            }),
        }
    }
}
