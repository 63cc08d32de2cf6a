//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Loads and validates `strata.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = load_config_from_str(&content)?;
    tracing::debug!(path = %path.display(), project = %config.project.name, "loaded configuration");
    Ok(config)
}

/// Parses and validates a `strata.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are consistent.
///
/// Times and frequencies are checked by [`resolve_simulation`](crate::resolve_simulation),
/// which is run here so that a loaded configuration always resolves.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.top.as_deref() == Some("") {
        return Err(ConfigError::MissingField("project.top".to_string()));
    }
    if config.simulation.max_delta_cycles == 0 {
        return Err(ConfigError::InvalidValue {
            field: "simulation.max_delta_cycles".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    crate::resolve::resolve_simulation(config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WaveformFormat;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "blinky"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "blinky");
        assert!(config.project.top.is_none());
        assert!(config.clocks.is_empty());
        assert_eq!(config.waveform.format, WaveformFormat::Vcd);
        assert!(config.synthesis.script.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "blinky"
top = "top"
description = "LED blinker"
authors = ["Alice", "Bob"]

[simulation]
max_delta_cycles = 500
duration = "1us"
async_reset_applies_immediately = false

[clocks.sync]
frequency = "100MHz"

[clocks.video]
period = "13.5ns"
phase = "2ns"

[waveform]
format = "vcd"
path = "out/trace.vcd"

[synthesis]
tool = "yosys"
script = ["proc", "opt_clean"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.top.as_deref(), Some("top"));
        assert_eq!(config.project.authors.len(), 2);
        assert_eq!(config.simulation.max_delta_cycles, 500);
        assert!(!config.simulation.async_reset_applies_immediately);
        assert_eq!(config.clocks.len(), 2);
        assert_eq!(config.clocks["video"].phase.as_deref(), Some("2ns"));
        assert_eq!(config.waveform.path.as_deref(), Some("out/trace.vcd"));
        assert_eq!(config.synthesis.script.len(), 2);
    }

    #[test]
    fn missing_name_errors() {
        let toml = r#"
[project]
name = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn empty_top_errors() {
        let toml = r#"
[project]
name = "test"
top = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(f) if f == "project.top"));
    }

    #[test]
    fn zero_delta_bound_errors() {
        let toml = r#"
[project]
name = "test"

[simulation]
max_delta_cycles = 0
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn clock_with_both_frequency_and_period_errors() {
        let toml = r#"
[project]
name = "test"

[clocks.sync]
frequency = "50MHz"
period = "20ns"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::AmbiguousClock(d) if d == "sync"));
    }

    #[test]
    fn bad_duration_errors() {
        let toml = r#"
[project]
name = "test"

[simulation]
duration = "forever"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "simulation.duration"));
    }

    #[test]
    fn invalid_toml_errors() {
        let toml = "this is not valid toml {{{}}}";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[project]\nname = \"disk\"\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.name, "disk");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
