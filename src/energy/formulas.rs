//! Energy formulas: runtime × quantity × rated power

use serde::{Deserialize, Serialize};

use crate::energy::cluster::ClusterInfo;
use crate::error::Result;
use crate::job::JobRecord;

/// Memory power draw, W/GB
/// (GreenAlgorithms4HPC fixed parameters)
pub const MEMORY_POWER_PER_GB: f64 = 0.3725;

/// CPU energy in kWh
pub fn energy_cpu(job: &JobRecord, cluster: &ClusterInfo) -> Result<f64> {
    let tdp_w = cluster.partition(&job.constraint)?.cpu_tdp;
    Ok(job.runtime_hours() * f64::from(job.cores) * (tdp_w / 1000.0))
}

/// GPU energy in kWh
pub fn energy_gpu(job: &JobRecord, cluster: &ClusterInfo) -> Result<f64> {
    let tdp_w = cluster.partition(&job.constraint)?.gpu_tdp;
    Ok(job.runtime_hours() * f64::from(job.gpus) * (tdp_w / 1000.0))
}

/// Memory energy in kWh at the standard per-GB draw
pub fn energy_memory(job: &JobRecord) -> f64 {
    energy_memory_at(job, MEMORY_POWER_PER_GB)
}

pub fn energy_memory_at(job: &JobRecord, watts_per_gb: f64) -> f64 {
    job.runtime_hours() * job.memory_gb * (watts_per_gb / 1000.0)
}

/// Per-component energy of one job, kWh
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobEnergy {
    pub cpu_kwh: f64,
    pub gpu_kwh: f64,
    pub memory_kwh: f64,
}

impl JobEnergy {
    pub fn total_kwh(&self) -> f64 {
        self.cpu_kwh + self.gpu_kwh + self.memory_kwh
    }
}

/// All components for one job
pub fn job_energy(job: &JobRecord, cluster: &ClusterInfo, memory_watts_per_gb: f64) -> Result<JobEnergy> {
    Ok(JobEnergy {
        cpu_kwh: energy_cpu(job, cluster)?,
        gpu_kwh: energy_gpu(job, cluster)?,
        memory_kwh: energy_memory_at(job, memory_watts_per_gb),
    })
}
