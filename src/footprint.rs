//! Per-job energy and emissions

use serde::Serialize;
use tracing::info;

use crate::carbon_aware::{CarbonIntensityResolver, IntensityProvider, SubmissionTimestamp};
use crate::energy::{job_energy, ClusterInfo, JobEnergy};
use crate::error::{Error, Result};
use crate::job::JobRecord;

/// Energy, grid intensity and resulting emissions for one job
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobFootprint {
    pub job_id: Option<String>,
    pub submission_time: SubmissionTimestamp,
    #[serde(flatten)]
    pub energy: JobEnergy,
    pub total_kwh: f64,
    /// gCO2e/kWh
    pub carbon_intensity: f64,
    /// gCO2e
    pub emissions_g: f64,
}

/// Combine precomputed intensities with each job's energy
///
/// `intensities` must be in job order, one per job.
pub fn assemble(
    jobs: &[JobRecord],
    cluster: &ClusterInfo,
    memory_watts_per_gb: f64,
    intensities: &[f64],
) -> Result<Vec<JobFootprint>> {
    if jobs.len() != intensities.len() {
        return Err(Error::ConfigError(format!(
            "{} jobs but {} intensity values",
            jobs.len(),
            intensities.len()
        )));
    }

    let energies = energies(jobs, cluster, memory_watts_per_gb)?;
    Ok(combine(jobs, energies, intensities))
}

fn energies(
    jobs: &[JobRecord],
    cluster: &ClusterInfo,
    memory_watts_per_gb: f64,
) -> Result<Vec<JobEnergy>> {
    jobs.iter()
        .map(|job| job_energy(job, cluster, memory_watts_per_gb))
        .collect()
}

fn combine(jobs: &[JobRecord], energies: Vec<JobEnergy>, intensities: &[f64]) -> Vec<JobFootprint> {
    jobs.iter()
        .zip(energies)
        .zip(intensities)
        .map(|((job, energy), &intensity)| {
            let total_kwh = energy.total_kwh();
            JobFootprint {
                job_id: job.job_id.clone(),
                submission_time: job.submission_time.clone(),
                energy,
                total_kwh,
                carbon_intensity: intensity,
                emissions_g: total_kwh * intensity,
            }
        })
        .collect()
}

/// Estimate footprints, resolving intensities through `resolver`
///
/// Energy is computed first so a cluster configuration error aborts before
/// any provider traffic.
pub async fn estimate<P: IntensityProvider>(
    jobs: &[JobRecord],
    cluster: &ClusterInfo,
    memory_watts_per_gb: f64,
    resolver: &mut CarbonIntensityResolver<P>,
) -> Result<Vec<JobFootprint>> {
    let energies = energies(jobs, cluster, memory_watts_per_gb)?;

    let times: Vec<SubmissionTimestamp> =
        jobs.iter().map(|j| j.submission_time.clone()).collect();
    let intensities = resolver.resolve(&times).await;

    info!(
        "Resolved carbon intensity for {} jobs ({} distinct days cached)",
        jobs.len(),
        resolver.cache().len()
    );

    Ok(combine(jobs, energies, &intensities))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carbon_aware::{IntensityError, QueryWindow};
    use crate::energy::MEMORY_POWER_PER_GB;
    use crate::job::PartitionConstraint;
    use async_trait::async_trait;

    struct Flat(f64);

    #[async_trait]
    impl IntensityProvider for Flat {
        async fn forecast(&self, _window: QueryWindow) -> std::result::Result<f64, IntensityError> {
            Ok(self.0)
        }
    }

    fn cluster() -> ClusterInfo {
        ClusterInfo::from_yaml("name: c\npartitions:\n  all: {cpu_tdp: 100, gpu_tdp: 300}\n")
            .unwrap()
    }

    fn job(id: &str, constraint: PartitionConstraint) -> JobRecord {
        JobRecord {
            job_id: Some(id.to_string()),
            run_time_sec: 3600.0,
            cores: 10,
            gpus: 1,
            memory_gb: 0.0,
            constraint,
            submission_time: "2025-03-01T10:00:00Z".into(),
        }
    }

    #[test]
    fn test_assemble_emissions() {
        let rows = assemble(
            &[job("a", PartitionConstraint::Any)],
            &cluster(),
            MEMORY_POWER_PER_GB,
            &[100.0],
        )
        .unwrap();
        // 1 kWh CPU + 0.3 kWh GPU at 100 g/kWh
        assert!((rows[0].total_kwh - 1.3).abs() < 1e-9);
        assert!((rows[0].emissions_g - 130.0).abs() < 1e-9);
    }

    #[test]
    fn test_assemble_length_mismatch() {
        let result = assemble(
            &[job("a", PartitionConstraint::Any)],
            &cluster(),
            MEMORY_POWER_PER_GB,
            &[],
        );
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_estimate_preserves_job_order() {
        let mut resolver = CarbonIntensityResolver::new(Flat(50.0), 124.0);
        let jobs = vec![
            job("first", PartitionConstraint::Any),
            job("second", PartitionConstraint::Any),
        ];
        let rows = estimate(&jobs, &cluster(), MEMORY_POWER_PER_GB, &mut resolver)
            .await
            .unwrap();

        let ids: Vec<_> = rows.iter().map(|r| r.job_id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert!(rows.iter().all(|r| r.carbon_intensity == 50.0));
        assert_eq!(resolver.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_configuration_error_before_lookup() {
        let mut resolver = CarbonIntensityResolver::new(Flat(50.0), 124.0);
        let jobs = vec![job("x", PartitionConstraint::Named("missing".to_string()))];
        let result = estimate(&jobs, &cluster(), MEMORY_POWER_PER_GB, &mut resolver).await;

        assert!(matches!(result, Err(Error::MissingPartition(_))));
        assert!(resolver.cache().is_empty());
    }
}
