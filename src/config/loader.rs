//! Config file location and loading.

use crate::config::DriverConfig;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "APP_BUILDER_CONFIG";

/// Configuration file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "app-builder.json";

/// Locate the configuration file: `$APP_BUILDER_CONFIG`, else
/// `./app-builder.json` if it exists, else none.
pub fn resolve_config_path() -> Option<PathBuf> {
    resolve_config_path_from(std::env::var_os(CONFIG_ENV).map(PathBuf::from), Path::new("."))
}

fn resolve_config_path_from(explicit: Option<PathBuf>, cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path);
    }

    let candidate = cwd.join(DEFAULT_CONFIG_FILE);
    candidate.is_file().then_some(candidate)
}

/// Load the driver configuration from `path`, or the defaults when no file is configured.
pub fn load_driver_config(path: Option<&Path>) -> Result<DriverConfig, ConfigError> {
    match path {
        Some(path) => load_config_from_file(path),
        None => Ok(DriverConfig::default()),
    }
}

/// Load config from JSON file.
pub fn load_config_from_file(path: &Path) -> Result<DriverConfig, ConfigError> {
    validate_config_path(path)?;

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!(
                "Configuration file not found at: {}",
                path.display()
            ))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let config: DriverConfig = serde_json::from_str(&content).map_err(ConfigError::InvalidJson)?;
    config.validate()?;

    Ok(config)
}

/// Validate config path (.json extension required).
pub fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Configuration path cannot be empty".to_string(),
        ));
    }

    match path.extension() {
        Some(ext) if ext == "json" => Ok(()),
        Some(ext) => Err(ConfigError::ValidationFailed(format!(
            "Configuration file must have .json extension, got .{}",
            ext.to_string_lossy()
        ))),
        None => Err(ConfigError::ValidationFailed(
            "Configuration file must have .json extension".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BundleConfig, LinkerScriptConfig};
    use crate::models::{FailurePolicy, Placement};
    use tempfile::TempDir;

    #[test]
    fn test_load_full_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("app-builder.json");

        let original = DriverConfig {
            placement: Placement::SteppedAddress {
                base: 0x8040_0000,
                step: 0x20_0000,
            },
            failure_policy: FailurePolicy::Abort,
            linker_script: Some(LinkerScriptConfig {
                template: PathBuf::from("src/linker.ld"),
                output: PathBuf::from("src/tmp-linker.ld"),
            }),
            bundle: Some(BundleConfig {
                binary_dir: PathBuf::from("target/riscv64gc-unknown-none-elf/release"),
                output: PathBuf::from("../os/src/link_app.asm"),
            }),
            ..Default::default()
        };

        fs::write(&config_path, serde_json::to_string_pretty(&original).unwrap()).unwrap();

        let loaded = load_driver_config(Some(config_path.as_path())).expect("Failed to load config");
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_no_config_file_yields_defaults() {
        assert_eq!(load_driver_config(None).unwrap(), DriverConfig::default());
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.json");
        fs::write(&config_path, r#"{ "source_dir": "apps", "release": false }"#).unwrap();

        let loaded = load_config_from_file(&config_path).unwrap();
        assert_eq!(loaded.source_dir, PathBuf::from("apps"));
        assert!(!loaded.release);
        assert_eq!(loaded.program, "cargo");
        assert_eq!(loaded.placement_env, "BASE_ADDRESS");
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_config_from_file(&temp_dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.json");
        fs::write(&config_path, "{ not json").unwrap();

        let result = load_config_from_file(&config_path);
        assert!(matches!(result, Err(ConfigError::InvalidJson(_))));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.json");
        fs::write(&config_path, r#"{ "placement_env": "1BAD" }"#).unwrap();

        let result = load_config_from_file(&config_path);
        assert!(matches!(result, Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn test_validate_config_path() {
        assert!(validate_config_path(Path::new("app-builder.json")).is_ok());
        assert!(validate_config_path(Path::new("app-builder.toml")).is_err());
        assert!(validate_config_path(Path::new("app-builder")).is_err());
        assert!(validate_config_path(Path::new("")).is_err());
    }

    #[test]
    fn test_resolve_prefers_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(DEFAULT_CONFIG_FILE), "{}").unwrap();

        let explicit = PathBuf::from("/etc/custom.json");
        assert_eq!(
            resolve_config_path_from(Some(explicit.clone()), temp_dir.path()),
            Some(explicit)
        );
    }

    #[test]
    fn test_resolve_falls_back_to_working_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(resolve_config_path_from(None, temp_dir.path()), None);

        fs::write(temp_dir.path().join(DEFAULT_CONFIG_FILE), "{}").unwrap();
        assert_eq!(
            resolve_config_path_from(None, temp_dir.path()),
            Some(temp_dir.path().join(DEFAULT_CONFIG_FILE))
        );
    }
}
