//! Pipeline configuration.
//!
//! Defaults reproduce a stock FSL 5.0 install driven through a condor-backed
//! queue. A JSON file at `~/.config/dtipipe/dtipipe.json` (or `--config`)
//! overrides any subset of fields.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the FSL tool binaries.
    pub fsl_bin_dir: String,

    /// Value exported as FSLDIR.
    pub fsl_dir: String,

    /// Value exported as FSLOUTPUTTYPE.
    pub output_type: String,

    /// Queue backend bedpostx submits its workers to (FSLPARALLEL).
    pub parallel_backend: String,

    /// Standard-space template volume used as the registration target.
    pub std_space: String,

    /// Directory holding seed masks and waypoint lists. Tilde-expanded on load.
    pub templates_dir: String,

    /// Seconds between completion polls of the bedpostx job.
    pub poll_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fsl_bin_dir: "/usr/lib/fsl/5.0".to_string(),
            fsl_dir: "/usr/share/fsl/5.0".to_string(),
            output_type: "NIFTI_GZ".to_string(),
            parallel_backend: "condor".to_string(),
            std_space: "/usr/share/fsl/data/standard/MNI152_T1_2mm_brain".to_string(),
            templates_dir: "/home/brain/fsl/templates".to_string(),
            poll_interval_secs: 60,
        }
    }
}

impl Config {
    /// Absolute path of an FSL binary.
    pub fn tool(&self, name: &str) -> String {
        format!("{}/{}", self.fsl_bin_dir, name)
    }

    /// Absolute path of a mask or waypoint file under the templates directory.
    pub fn template(&self, name: &str) -> String {
        format!("{}/{}", self.templates_dir, name)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Export the FSL environment the external tools expect. The FSL bin
    /// directory is prepended to PATH rather than replacing it.
    pub fn apply_env(&self) {
        env::set_var("FSLDIR", &self.fsl_dir);
        env::set_var("FSLOUTPUTTYPE", &self.output_type);
        env::set_var("FSLPARALLEL", &self.parallel_backend);
        env::set_var("LD_LIBRARY_PATH", &self.fsl_bin_dir);

        let path = env::var("PATH").unwrap_or_default();
        env::set_var("PATH", format!("{}:{}", self.fsl_bin_dir, path));
    }
}

/// Config file path (universal ~/.config/dtipipe/ on all platforms).
pub fn config_path() -> Result<PathBuf> {
    let home = env::var("HOME")
        .map_err(|_| Error::Config("HOME environment variable not set".to_string()))?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("dtipipe")
        .join("dtipipe.json"))
}

/// Load the user config, falling back to defaults when no file exists.
pub fn load() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(Config::default());
    }
    load_from(&path)
}

/// Load config from an explicit file.
pub fn load_from(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let mut config: Config = serde_json::from_str(&raw)?;
    config.templates_dir = shellexpand::tilde(&config.templates_dir).to_string();
    Ok(config)
}
