//! Very basic functionality to read and write some configuration into a toml configuration file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ConfigToml {
    /// File path and file name of the machine database. The LBA database holds 30 bytes per machine.
    #[serde(default = "default_machine_db_path")]
    machine_db_path: String,

    /// True if the database starts with a 30 byte global header (bbchallenge format).
    #[serde(default)]
    machine_db_has_header: bool,

    /// Directory where the ids of the identified translated cyclers are written to.
    #[serde(default = "default_result_path")]
    result_path: String,
}

impl ConfigToml {
    /// Reads the config.toml in the working directory. If it does not exist, a new one with default values is
    /// created. Errors are logged and the default values are used.
    pub fn read_toml() -> ConfigToml {
        Self::read_toml_from(CONFIG_FILE)
    }

    pub fn read_toml_from(file_path: &str) -> ConfigToml {
        if Path::new(file_path).exists() {
            let config_content = match fs::read_to_string(file_path) {
                Ok(content) => content,
                Err(e) => {
                    log::warn!("Config file {file_path} could not be read: {e}");
                    return ConfigToml::default();
                }
            };
            match toml::from_str(&config_content) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Config file {file_path} could not be parsed: {e}");
                    ConfigToml::default()
                }
            }
        } else {
            log::info!(
                "Config file {file_path} not found, creating a new one with default values."
            );
            let default_config = ConfigToml::default();
            match toml::to_string_pretty(&default_config) {
                Ok(toml_string) => {
                    if let Err(e) = fs::write(file_path, toml_string) {
                        log::warn!(
                            "Config file {file_path} was not found and could not be written ({e}). Using default values."
                        );
                    }
                }
                Err(e) => log::warn!("Failed to serialize default config: {e}"),
            }
            default_config
        }
    }

    pub fn machine_db_path(&self) -> &str {
        &self.machine_db_path
    }

    pub fn machine_db_has_header(&self) -> bool {
        self.machine_db_has_header
    }

    pub fn result_path(&self) -> &str {
        &self.result_path
    }
}

impl Default for ConfigToml {
    fn default() -> Self {
        ConfigToml {
            machine_db_path: default_machine_db_path(),
            machine_db_has_header: false,
            result_path: default_result_path(),
        }
    }
}

fn default_machine_db_path() -> String {
    "../res/lba_5_states_30_cells_undecided".to_string()
}

fn default_result_path() -> String {
    crate::config::PATH_RESULT_DEFAULT.to_string()
}
