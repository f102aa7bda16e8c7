//! Carbon intensity lookup for job submissions
//!
//! This module maps job submission times to the regional grid carbon
//! intensity for the UTC day they fall on, caching one provider lookup per
//! day and falling back to a fixed default whenever live data is unavailable.

pub mod api;
pub mod error;
pub mod resolver;
pub mod types;

pub use api::{CarbonIntensityApi, IntensityProvider};
pub use error::IntensityError;
pub use resolver::CarbonIntensityResolver;
pub use types::{CarbonIntensityConfig, DayKey, IntensityCache, QueryWindow, SubmissionTimestamp};
