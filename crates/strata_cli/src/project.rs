//! Optional project configuration lookup.

use std::path::Path;

use strata_config::{load_config_file, ConfigError, ProjectConfig, CONFIG_FILE_NAME};

/// Loads the configuration named on the command line, or `./strata.toml`
/// if present. Running without any configuration is allowed.
pub fn load(explicit: Option<&Path>) -> Result<Option<ProjectConfig>, ConfigError> {
    match explicit {
        Some(path) => load_config_file(path).map(Some),
        None => {
            let default = Path::new(CONFIG_FILE_NAME);
            if default.is_file() {
                load_config_file(default).map(Some)
            } else {
                Ok(None)
            }
        }
    }
}
