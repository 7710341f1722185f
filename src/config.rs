use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::driver::DEFAULT_NUM_THREADS;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub campaign: CampaignConfig,
    pub engine: EngineConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CampaignConfig {
    /// JSON campaign definition: states, rosters, dates, assumed margins.
    pub campaign_file: PathBuf,
    /// JSON normalized poll feed.
    pub feed_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Where the exported history lands (and is re-imported from).
    pub data_dir: PathBuf,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
}

fn default_num_threads() -> usize {
    DEFAULT_NUM_THREADS
}

impl AppConfig {
    /// Load configuration from a TOML settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}
