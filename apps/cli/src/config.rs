//! YAML run configuration.

use anyhow::{Context, Result};
use loot_core::ModelConfig;
use loot_econ::{default_scenarios, EconomicParams, EconomicScenario};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Everything a run needs besides the draw count. Missing sections fall back
/// to the reference model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub economics: EconomicParams,
    pub scenarios: Vec<EconomicScenario>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            economics: EconomicParams::default(),
            scenarios: default_scenarios(),
        }
    }
}

/// Load from `path`, or the defaults when no path is given.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: AppConfig = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    info!(path = %path.display(), tiers = cfg.model.rarities.len(), "loaded config");
    Ok(cfg)
}
