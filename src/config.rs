//! Run configuration loaded from TOML

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::carbon_aware::CarbonIntensityConfig;
use crate::energy::EnergyConfig;
use crate::error::{Error, Result};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FootprintConfig {
    pub carbon: CarbonIntensityConfig,
    pub energy: EnergyConfig,
}

impl FootprintConfig {
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: FootprintConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.carbon.default_intensity.is_finite() || self.carbon.default_intensity < 0.0 {
            return Err(Error::ConfigError(format!(
                "default_intensity must be a non-negative number, got {}",
                self.carbon.default_intensity
            )));
        }
        if self.carbon.timeout_secs == 0 {
            return Err(Error::ConfigError("timeout_secs must be positive".to_string()));
        }
        if self.carbon.base_url.is_empty() {
            return Err(Error::ConfigError("base_url must not be empty".to_string()));
        }
        if !self.energy.memory_power_per_gb.is_finite() || self.energy.memory_power_per_gb < 0.0 {
            return Err(Error::ConfigError(format!(
                "memory_power_per_gb must be a non-negative number, got {}",
                self.energy.memory_power_per_gb
            )));
        }
        Ok(())
    }
}
