//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `strata.toml`
/// configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A clock table names neither or both of `frequency` and `period`.
    #[error("clock '{0}' must set exactly one of 'frequency' or 'period'")]
    AmbiguousClock(String),

    /// A configuration value failed validation.
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("project.name".to_string());
        assert_eq!(format!("{err}"), "missing required field: project.name");
    }

    #[test]
    fn display_parse_error() {
        let err = ConfigError::ParseError("expected '=' at line 3".to_string());
        assert_eq!(
            format!("{err}"),
            "failed to parse configuration: expected '=' at line 3"
        );
    }

    #[test]
    fn display_ambiguous_clock() {
        let err = ConfigError::AmbiguousClock("sync".to_string());
        assert_eq!(
            format!("{err}"),
            "clock 'sync' must set exactly one of 'frequency' or 'period'"
        );
    }

    #[test]
    fn display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "clocks.sync.period".to_string(),
            message: "invalid duration '10'".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "invalid value for clocks.sync.period: invalid duration '10'"
        );
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        assert!(format!("{err}").starts_with("failed to read configuration:"));
    }
}
