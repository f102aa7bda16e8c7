//! Submission time to carbon intensity resolution with a per-day cache

use tracing::{debug, warn};

use crate::carbon_aware::api::{CarbonIntensityApi, IntensityProvider};
use crate::carbon_aware::error::IntensityError;
use crate::carbon_aware::types::{
    CarbonIntensityConfig, DayKey, IntensityCache, SubmissionTimestamp,
};
use crate::error::Result;

/// Maps job submission times to grid carbon intensity (gCO2e/kWh)
///
/// Lookups are sequential with at most one provider request per uncached UTC
/// day. Failures of any kind fall back to the default intensity and are
/// never cached, so a later call retries the provider for that day.
pub struct CarbonIntensityResolver<P> {
    provider: P,
    default_intensity: f64,
    cache: IntensityCache,
}

impl CarbonIntensityResolver<CarbonIntensityApi> {
    /// Resolver backed by the HTTP provider described by `config`
    pub fn from_config(config: &CarbonIntensityConfig) -> Result<Self> {
        let api = CarbonIntensityApi::new(config)?;
        Ok(Self::new(api, config.default_intensity))
    }
}

impl<P: IntensityProvider> CarbonIntensityResolver<P> {
    pub fn new(provider: P, default_intensity: f64) -> Self {
        Self::with_cache(provider, default_intensity, IntensityCache::new())
    }

    /// Start from a cache produced by an earlier resolver
    pub fn with_cache(provider: P, default_intensity: f64, cache: IntensityCache) -> Self {
        Self {
            provider,
            default_intensity,
            cache,
        }
    }

    pub fn cache(&self) -> &IntensityCache {
        &self.cache
    }

    pub fn into_cache(self) -> IntensityCache {
        self.cache
    }

    /// One intensity per input, in input order. Never fails.
    pub async fn resolve(&mut self, timestamps: &[SubmissionTimestamp]) -> Vec<f64> {
        let mut values = Vec::with_capacity(timestamps.len());
        for ts in timestamps {
            values.push(self.resolve_one(ts).await);
        }
        values
    }

    /// Intensity for a single submission time, falling back on any failure
    pub async fn resolve_one(&mut self, ts: &SubmissionTimestamp) -> f64 {
        match self.lookup(ts).await {
            Ok(value) => value,
            Err(e) => {
                warn!("{}", fallback_message(ts, &e, self.default_intensity));
                self.default_intensity
            }
        }
    }

    async fn lookup(&mut self, ts: &SubmissionTimestamp) -> std::result::Result<f64, IntensityError> {
        let day = DayKey::from_utc(ts.normalize()?);

        if let Some(cached) = self.cache.get(&day) {
            debug!("Carbon intensity for {} served from cache: {}", day, cached);
            return Ok(cached);
        }

        let value = self.provider.forecast(day.window()?).await?;
        debug!("Fetched carbon intensity for {}: {} gCO2e/kWh", day, value);
        self.cache.insert(day, value);
        Ok(value)
    }
}

/// Diagnostic logged when a submission falls back to the default intensity
fn fallback_message(ts: &SubmissionTimestamp, error: &IntensityError, default: f64) -> String {
    match error {
        IntensityError::TimestampNormalization { reason, .. } => format!(
            "Error converting datetime {ts} to UTC: {reason}. Using default: {default} gCO2e/kWh"
        ),
        other => format!(
            "Failed to get carbon intensity for {ts} from the provider. Using default: {default} gCO2e/kWh. Error: {other}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carbon_aware::types::QueryWindow;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Provider answering from a fixed day table, counting calls
    struct FakeProvider {
        by_day: HashMap<String, f64>,
        calls: AtomicUsize,
        requested: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        fn new(entries: &[(&str, f64)]) -> Self {
            Self {
                by_day: entries.iter().map(|(d, v)| (d.to_string(), *v)).collect(),
                calls: AtomicUsize::new(0),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<'a> IntensityProvider for &'a FakeProvider {
        async fn forecast(&self, window: QueryWindow) -> std::result::Result<f64, IntensityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let day = window.from.format("%Y-%m-%d").to_string();
            self.requested.lock().unwrap().push(window.api_bounds().0);
            self.by_day.get(&day).copied().ok_or_else(|| {
                IntensityError::ProviderResponseFormat(format!("no forecast for {day}"))
            })
        }
    }

    fn stamps(raw: &[&str]) -> Vec<SubmissionTimestamp> {
        raw.iter().map(|s| SubmissionTimestamp::from(*s)).collect()
    }

    #[tokio::test]
    async fn test_empty_input() {
        let provider = FakeProvider::new(&[]);
        let mut resolver = CarbonIntensityResolver::new(&provider, 124.0);
        assert!(resolver.resolve(&[]).await.is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_same_day_resolved_once() {
        let provider = FakeProvider::new(&[("2025-03-01", 150.0), ("2025-03-02", 80.0)]);
        let mut resolver = CarbonIntensityResolver::new(&provider, 124.0);

        let values = resolver
            .resolve(&stamps(&[
                "2025-03-01T10:00:00Z",
                "2025-03-01T23:00:00Z",
                "2025-03-02T01:00:00Z",
            ]))
            .await;

        assert_eq!(values, vec![150.0, 150.0, 80.0]);
        assert_eq!(provider.calls(), 2);
        assert_eq!(
            *provider.requested.lock().unwrap(),
            vec!["2025-03-01T00:00Z", "2025-03-02T00:00Z"]
        );
    }

    #[tokio::test]
    async fn test_order_and_duplicates_preserved() {
        let provider = FakeProvider::new(&[("2025-03-01", 150.0), ("2025-03-02", 80.0)]);
        let mut resolver = CarbonIntensityResolver::new(&provider, 124.0);

        let values = resolver
            .resolve(&stamps(&[
                "2025-03-02T05:00:00Z",
                "2025-03-01T05:00:00Z",
                "2025-03-02T05:00:00Z",
                "2025-03-01T05:00:00Z",
            ]))
            .await;

        assert_eq!(values, vec![80.0, 150.0, 80.0, 150.0]);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_malformed_timestamp_falls_back_without_call() {
        let provider = FakeProvider::new(&[("2025-03-01", 150.0)]);
        let mut resolver = CarbonIntensityResolver::new(&provider, 124.0);

        let values = resolver
            .resolve(&stamps(&["yesterday", "2025-03-01T09:00:00"]))
            .await;

        assert_eq!(values, vec![124.0, 150.0]);
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_normalization_message_names_timestamp_once() {
        let ts = SubmissionTimestamp::from("yesterday");
        let err = ts.normalize().unwrap_err();
        let message = fallback_message(&ts, &err, 124.0);

        assert_eq!(message.matches("yesterday").count(), 1);
        assert!(message.starts_with("Error converting datetime yesterday to UTC: "));
        assert!(message.ends_with("Using default: 124 gCO2e/kWh"));
    }

    #[test]
    fn test_provider_message_includes_cause() {
        let ts = SubmissionTimestamp::from("2025-03-01T10:00:00Z");
        let err = IntensityError::ProviderResponseFormat("forecast list is empty".to_string());
        let message = fallback_message(&ts, &err, 124.0);

        assert!(message.contains("2025-03-01T10:00:00Z"));
        assert!(message.contains("Using default: 124 gCO2e/kWh"));
        assert!(message.contains("forecast list is empty"));
    }

    #[tokio::test]
    async fn test_out_of_range_day_falls_back_without_call() {
        let provider = FakeProvider::new(&[]);
        let mut resolver = CarbonIntensityResolver::new(&provider, 124.0);

        let values = resolver
            .resolve(&[SubmissionTimestamp::from(NaiveDateTime::MAX)])
            .await;
        assert_eq!(values, vec![124.0]);

        let values = resolver
            .resolve(&stamps(&["+262142-12-31T10:00:00"]))
            .await;
        assert_eq!(values, vec![124.0]);

        assert_eq!(provider.calls(), 0);
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn test_failures_not_cached_and_retried() {
        let provider = FakeProvider::new(&[]);
        let mut resolver = CarbonIntensityResolver::new(&provider, 124.0);

        let values = resolver
            .resolve(&stamps(&["2025-03-01T10:00:00Z", "2025-03-01T11:00:00Z"]))
            .await;

        assert_eq!(values, vec![124.0, 124.0]);
        assert!(resolver.cache().is_empty());
        // each uncached element asks again
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_naive_and_aware_values_match() {
        let provider = FakeProvider::new(&[("2025-01-01", 201.0)]);
        let mut resolver = CarbonIntensityResolver::new(&provider, 124.0);

        let naive = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let values = resolver
            .resolve(&[
                SubmissionTimestamp::from(naive),
                SubmissionTimestamp::from("2025-01-01T00:00:00+00:00"),
            ])
            .await;

        assert_eq!(values, vec![201.0, 201.0]);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_shared_cache_skips_provider() {
        let first = FakeProvider::new(&[("2025-03-01", 150.0)]);
        let mut resolver = CarbonIntensityResolver::new(&first, 124.0);
        resolver.resolve(&stamps(&["2025-03-01T10:00:00Z"])).await;
        let cache = resolver.into_cache();

        // second provider knows nothing; the cache must answer
        let second = FakeProvider::new(&[]);
        let mut resolver = CarbonIntensityResolver::with_cache(&second, 124.0, cache);
        let values = resolver.resolve(&stamps(&["2025-03-01T18:30:00Z"])).await;

        assert_eq!(values, vec![150.0]);
        assert_eq!(second.calls(), 0);
    }
}
