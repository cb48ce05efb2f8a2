//! Core data types for App Builder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default placement address shared by every unit (0x1000).
pub const DEFAULT_BASE_ADDRESS: u64 = 0x1000;

/// One buildable binary target, derived from one source file's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Binary name (filename truncated at the first '.')
    pub name: String,
    /// Raw filename the unit was discovered from
    pub file_name: String,
    /// Position in the sorted unit list
    pub index: usize,
}

impl SourceUnit {
    /// Derive a unit from a filename and its sorted position.
    pub fn from_file_name(file_name: &str, index: usize) -> Self {
        SourceUnit {
            name: unit_name(file_name).to_string(),
            file_name: file_name.to_string(),
            index,
        }
    }
}

impl fmt::Display for SourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Truncate a filename at its first '.'. A name without '.' is returned whole.
pub fn unit_name(file_name: &str) -> &str {
    match file_name.find('.') {
        Some(dot) => &file_name[..dot],
        None => file_name,
    }
}

/// How the placement (base address) is chosen for each unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum Placement {
    /// Every unit is linked at the same address.
    SharedAddress { address: u64 },
    /// Unit `i` is linked at `base + step * i`.
    SteppedAddress { base: u64, step: u64 },
}

impl Default for Placement {
    fn default() -> Self {
        Placement::SharedAddress {
            address: DEFAULT_BASE_ADDRESS,
        }
    }
}

impl Placement {
    /// Placement value for the unit at `index`, `None` on overflow.
    pub fn address_for(&self, index: usize) -> Option<u64> {
        match *self {
            Placement::SharedAddress { address } => Some(address),
            Placement::SteppedAddress { base, step } => {
                let index = u64::try_from(index).ok()?;
                step.checked_mul(index)?.checked_add(base)
            }
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::SharedAddress { address } => write!(f, "shared-address({:#x})", address),
            Placement::SteppedAddress { base, step } => {
                write!(f, "stepped-address(base={:#x}, step={:#x})", base, step)
            }
        }
    }
}

/// What the driver does when a unit fails to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Keep going; the outcome is only recorded.
    #[default]
    Ignore,
    /// Stop at the first failed unit.
    Abort,
}

/// One external process to run: program, arguments and environment overrides.
///
/// The environment overrides apply to the child only; the driver's own
/// environment is never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl BuildInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        BuildInvocation {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for BuildInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key, value)?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// How a single unit's build ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// The process ran to completion (with any exit code).
    Finished(ProcessOutput),
    /// The process could not be started, or a pre-build step failed.
    NotStarted(String),
}

/// Outcome of one unit's build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutcome {
    pub unit: SourceUnit,
    pub placement: u64,
    pub status: UnitStatus,
}

impl UnitOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(&self.status, UnitStatus::Finished(output) if output.success())
    }

    /// Human-readable failure reason, `None` if the unit succeeded.
    pub fn failure_reason(&self) -> Option<String> {
        match &self.status {
            UnitStatus::Finished(output) if output.success() => None,
            UnitStatus::Finished(output) => Some(match output.exit_code {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by signal".to_string(),
            }),
            UnitStatus::NotStarted(reason) => Some(reason.clone()),
        }
    }
}

/// All unit outcomes of one driver run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub outcomes: Vec<UnitOutcome>,
}

impl BuildReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Unit names in the order they were built.
    pub fn unit_names(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.unit.name.as_str()).collect()
    }
}
