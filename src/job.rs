//! Job records as exported from the cluster's accounting table

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::carbon_aware::SubmissionTimestamp;
use crate::error::Result;

/// Partition a job was constrained to, if any
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum PartitionConstraint {
    /// No constraint; the cluster's default partition applies
    #[default]
    Any,
    Named(String),
}

impl From<Option<String>> for PartitionConstraint {
    fn from(label: Option<String>) -> Self {
        match label {
            Some(l) if !l.trim().is_empty() => Self::Named(l.trim().to_string()),
            _ => Self::Any,
        }
    }
}

impl From<PartitionConstraint> for Option<String> {
    fn from(constraint: PartitionConstraint) -> Self {
        match constraint {
            PartitionConstraint::Any => None,
            PartitionConstraint::Named(l) => Some(l),
        }
    }
}

/// One row of the job table
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct JobRecord {
    #[serde(rename = "JobID", alias = "job_id", default)]
    pub job_id: Option<String>,

    #[serde(rename = "Run Time (sec)", alias = "run_time_sec")]
    pub run_time_sec: f64,

    #[serde(rename = "Number of cores", alias = "cores", default)]
    pub cores: u32,

    #[serde(rename = "Number of GPU", alias = "gpus", default)]
    pub gpus: u32,

    #[serde(rename = "Memory (GB)", alias = "memory_gb", default)]
    pub memory_gb: f64,

    #[serde(rename = "Constraints", alias = "constraint", default)]
    pub constraint: PartitionConstraint,

    #[serde(rename = "SubmissionTime", alias = "submission_time")]
    pub submission_time: SubmissionTimestamp,
}

impl JobRecord {
    pub fn runtime_hours(&self) -> f64 {
        self.run_time_sec / 3600.0
    }
}

/// Load a JSON array of job records
pub fn load_jobs(path: impl AsRef<Path>) -> Result<Vec<JobRecord>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
