//! App bundle generation.
//!
//! Emits the assembly file the kernel links in to locate its user programs:
//! `_num_app` with the start table and end sentinel, the `app_names` string
//! table, and one `.incbin` data section per unit in unit order.

use crate::config::BundleConfig;
use crate::error::BundleError;
use crate::models::SourceUnit;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Render the bundle assembly for `units`, reading images from `binary_dir`.
pub fn render_bundle(units: &[SourceUnit], binary_dir: &Path) -> Result<String, std::fmt::Error> {
    let mut asm = String::new();

    writeln!(asm, "    .align 3")?;
    writeln!(asm, "    .section .data")?;
    writeln!(asm, "    .global _num_app")?;
    writeln!(asm, "_num_app:")?;
    writeln!(asm, "    .quad {}", units.len())?;
    for unit in units {
        writeln!(asm, "    .quad app_{}_start", unit.index)?;
    }
    if let Some(last) = units.last() {
        writeln!(asm, "    .quad app_{}_end", last.index)?;
    }

    writeln!(asm)?;
    writeln!(asm, "    .global app_names")?;
    writeln!(asm, "app_names:")?;
    for unit in units {
        writeln!(asm, "    .string \"{}\"", escape_asm_string(&unit.name))?;
    }

    for unit in units {
        let image = binary_dir.join(format!("{}.bin", unit.name));
        writeln!(asm)?;
        writeln!(asm, "    .section .data")?;
        writeln!(asm, "    .global app_{}_start", unit.index)?;
        writeln!(asm, "    .global app_{}_end", unit.index)?;
        writeln!(asm, "app_{}_start:", unit.index)?;
        writeln!(
            asm,
            "    .incbin \"{}\"",
            escape_asm_string(&image.to_string_lossy())
        )?;
        writeln!(asm, "app_{}_end:", unit.index)?;
    }

    Ok(asm)
}

/// Escape `s` for use inside a double-quoted assembler string.
fn escape_asm_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render and write the bundle described by `config`.
pub fn write_bundle(units: &[SourceUnit], config: &BundleConfig) -> Result<PathBuf, BundleError> {
    let asm = render_bundle(units, &config.binary_dir)?;
    let write_failed = |source| BundleError::WriteFailed {
        path: config.output.clone(),
        source,
    };

    if let Some(parent) = config.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }
    }
    fs::write(&config.output, asm).map_err(write_failed)?;

    Ok(config.output.clone())
}
