use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::WorkbenchError;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_CONFIG_FILE: &str = "workbench.toml";

/// Settings for both modes. Loaded from an optional `workbench.toml`,
/// then overridden field-by-field by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkbenchConfig {
    /// Base URL of the agent backend.
    pub backend_url: String,
    /// Port the web UI server binds on localhost.
    pub port: u16,
    /// Open the system browser when the web UI starts.
    pub open_browser: bool,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        WorkbenchConfig {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            port: DEFAULT_PORT,
            open_browser: true,
        }
    }
}

impl WorkbenchConfig {
    /// Load configuration. An explicitly given path must exist; the
    /// default `workbench.toml` is optional and its absence yields the
    /// built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, WorkbenchError> {
        match path {
            Some(p) => Self::load_path(p, true),
            None => Self::load_path(Path::new(DEFAULT_CONFIG_FILE), false),
        }
    }

    fn load_path(path: &Path, required: bool) -> Result<Self, WorkbenchError> {
        if !path.exists() {
            if required {
                return Err(WorkbenchError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| WorkbenchError::Config(format!("{}: {}", path.display(), e)))
    }
}
