use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_SEED: u32 = 42042;

/// Scales provider error rates uniformly (section 6, "fault profile: scale
/// provider error rates").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FaultProfile {
    Quiet,
    Normal,
    Chaotic,
}

impl FaultProfile {
    pub fn multiplier(self) -> f64 {
        match self {
            FaultProfile::Quiet => 0.25,
            FaultProfile::Normal => 1.0,
            FaultProfile::Chaotic => 3.0,
        }
    }
}

impl Default for FaultProfile {
    fn default() -> Self {
        FaultProfile::Normal
    }
}

fn default_seed() -> u32 {
    DEFAULT_SEED
}

fn default_base_error_rate() -> f64 {
    0.05
}

/// Every runtime knob, consolidated into one record built once and
/// passed by value into `Router::new`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_seed")]
    pub seed: u32,
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
    #[serde(default)]
    pub fault_profile: FaultProfile,
    #[serde(default)]
    pub drift_mode: String,
    #[serde(default)]
    pub drift_seed: Option<u32>,
    #[serde(default)]
    pub monitors: Vec<String>,
    #[serde(default)]
    pub scenario_path: Option<PathBuf>,
    #[serde(default)]
    pub alias_packs: Vec<String>,
    #[serde(default = "default_base_error_rate")]
    pub erp_error_rate: f64,
    #[serde(default = "default_base_error_rate")]
    pub crm_error_rate: f64,
    #[serde(default)]
    pub policy_overrides: Vec<String>,
    #[serde(default)]
    pub trace_stream_endpoint: Option<String>,
    /// Permission tags denied at dispatch time (section 4.7, "Check
    /// permission overrides (see section 6); deny -> `permission_denied`").
    #[serde(default)]
    pub denied_permissions: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            artifacts_dir: None,
            state_dir: None,
            fault_profile: FaultProfile::default(),
            drift_mode: "off".to_string(),
            drift_seed: None,
            monitors: Vec::new(),
            scenario_path: None,
            alias_packs: Vec::new(),
            erp_error_rate: default_base_error_rate(),
            crm_error_rate: default_base_error_rate(),
            policy_overrides: Vec::new(),
            trace_stream_endpoint: None,
            denied_permissions: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Resolved error rate after applying the fault profile's multiplier,
    /// clamped to `[0, 1]`.
    pub fn scaled_erp_error_rate(&self) -> f64 {
        (self.erp_error_rate * self.fault_profile.multiplier()).clamp(0.0, 1.0)
    }

    pub fn scaled_crm_error_rate(&self) -> f64 {
        (self.crm_error_rate * self.fault_profile.multiplier()).clamp(0.0, 1.0)
    }

    /// Falls back to the main seed when no independent drift seed is
    /// configured (section 6, "drift seed: ... falls back to main seed").
    pub fn resolved_drift_seed(&self) -> u32 {
        self.drift_seed.unwrap_or(self.seed)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The XDG-resolved default config path: `dirs::data_dir()/vei/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("vei").join("config.toml")).ok_or_else(|| Error::Config("could not determine a data directory for the default config path".to_string()))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_the_documented_default_seed() {
        assert_eq!(EngineConfig::default().seed, DEFAULT_SEED);
    }

    #[test]
    fn drift_seed_falls_back_to_main_seed_when_unset() {
        let config = EngineConfig { seed: 4242, drift_seed: None, ..Default::default() };
        assert_eq!(config.resolved_drift_seed(), 4242);
    }

    #[test]
    fn chaotic_profile_scales_error_rate_up_and_clamps_at_one() {
        let config = EngineConfig { erp_error_rate: 0.5, fault_profile: FaultProfile::Chaotic, ..Default::default() };
        assert_eq!(config.scaled_erp_error_rate(), 1.0);
    }

    #[test]
    fn save_and_load_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = EngineConfig { seed: 7, alias_packs: vec!["xero".to_string()], ..Default::default() };
        config.save_to(&path).unwrap();
        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.seed, 7);
        assert_eq!(loaded.alias_packs, vec!["xero".to_string()]);
    }

    #[test]
    fn loading_a_nonexistent_path_returns_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let config = EngineConfig::load_from(&path).unwrap();
        assert_eq!(config.seed, DEFAULT_SEED);
    }
}
