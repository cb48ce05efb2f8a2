//! Link-time artifacts produced around the per-unit builds.
//!
//! - `script`: renders the user linker script with the unit's placement
//! - `bundle`: writes the assembly manifest embedding every user binary
//!   into the kernel image

pub mod bundle;
pub mod script;

pub use bundle::{render_bundle, write_bundle};
pub use script::{render_linker_script, substitute};
