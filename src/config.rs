use serde::Deserialize;
use simplelog::LevelFilter;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use strata_runtime::{StartOptions, StreamingConfig};
use strata_world::{WorldGenConfig, WorldGenParams};

/// Contents of `strata.toml`. World and streaming sections sit at the top level
/// next to the driver's own keys.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_seed")]
    pub seed: i32,
    #[serde(default)]
    pub save_dir: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(flatten)]
    pub streaming: StreamingConfig,
    #[serde(flatten)]
    pub worldgen: WorldGenConfig,
}
fn default_seed() -> i32 {
    1337
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            save_dir: None,
            log_level: default_log_level(),
            streaming: StreamingConfig::default(),
            worldgen: WorldGenConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn level(&self) -> Option<LevelFilter> {
        self.log_level.parse().ok()
    }

    pub fn start_options(&self) -> StartOptions {
        let mut opts = StartOptions::new(self.seed);
        opts.worldgen = WorldGenParams::from_config(&self.worldgen);
        opts.streaming = self.streaming.clone();
        opts.save_dir = self.save_dir.clone();
        opts
    }
}

pub fn load_app_config(path: &Path) -> Result<AppConfig, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    Ok(AppConfig::from_toml_str(&s)?)
}
