//! Cluster capability table

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::job::PartitionConstraint;

/// Rated power draw of one partition's hardware
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PartitionPower {
    /// CPU thermal design power per core, watts
    #[serde(alias = "CPU_TDP")]
    pub cpu_tdp: f64,
    /// GPU thermal design power per device, watts
    #[serde(alias = "TDP", default)]
    pub gpu_tdp: f64,
}

/// Partitions of a cluster and their power characteristics
///
/// Partition keys may be written bare (`a100_80`) or prefixed with the
/// cluster name (`baskerville-a100_80`); prefixes are stripped on load.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ClusterInfo {
    pub name: String,
    /// Partition used by jobs without a constraint
    #[serde(default = "default_partition")]
    pub default_partition: String,
    pub partitions: HashMap<String, PartitionPower>,
}

fn default_partition() -> String {
    "all".to_string()
}

impl ClusterInfo {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let mut info: ClusterInfo = serde_yaml::from_str(contents)?;
        info.strip_name_prefixes();
        info.validate()?;
        Ok(info)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    fn strip_name_prefixes(&mut self) {
        let prefix = format!("{}-", self.name);
        self.partitions = std::mem::take(&mut self.partitions)
            .into_iter()
            .map(|(key, power)| match key.strip_prefix(&prefix) {
                Some(bare) => (bare.to_string(), power),
                None => (key, power),
            })
            .collect();
        if let Some(bare) = self.default_partition.strip_prefix(&prefix) {
            self.default_partition = bare.to_string();
        }
    }

    fn validate(&self) -> Result<()> {
        for (key, power) in &self.partitions {
            let valid = |tdp: f64| tdp.is_finite() && tdp >= 0.0;
            if !valid(power.cpu_tdp) || !valid(power.gpu_tdp) {
                return Err(Error::ConfigError(format!(
                    "partition '{key}' TDPs must be non-negative numbers"
                )));
            }
        }
        Ok(())
    }

    /// Power figures for a job's partition constraint
    pub fn partition(&self, constraint: &PartitionConstraint) -> Result<&PartitionPower> {
        let key = match constraint {
            PartitionConstraint::Any => self.default_partition.as_str(),
            PartitionConstraint::Named(label) => label.as_str(),
        };
        self.partitions
            .get(key)
            .ok_or_else(|| Error::MissingPartition(key.to_string()))
    }
}
