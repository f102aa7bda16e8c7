//! Job Footprint: energy and carbon estimation for shared cluster jobs
//!
//! This crate computes per-job CPU, GPU and memory energy from a cluster
//! capability table and converts it into emissions using the regional grid
//! carbon intensity on the day each job was submitted.

pub mod carbon_aware;
pub mod config;
pub mod energy;
pub mod error;
pub mod footprint;
pub mod job;

pub use crate::error::{Error, Result};
