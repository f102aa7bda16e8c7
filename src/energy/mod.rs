//! Job energy estimation from cluster hardware ratings

pub mod cluster;
pub mod formulas;

use serde::{Deserialize, Serialize};

pub use cluster::{ClusterInfo, PartitionPower};
pub use formulas::{
    energy_cpu, energy_gpu, energy_memory, energy_memory_at, job_energy, JobEnergy,
    MEMORY_POWER_PER_GB,
};

/// Energy model configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Memory power draw, W/GB
    pub memory_power_per_gb: f64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            memory_power_per_gb: MEMORY_POWER_PER_GB,
        }
    }
}
