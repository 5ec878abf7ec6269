//! The two operations an external scheduler invokes once per period:
//! ingest (fetch + append) and summary (aggregate + report).
//!
//! Neither step retries; failures are returned as-is so the caller can apply
//! its own retry policy.

use anyhow::Result;
use chrono::{NaiveDate, Utc};

use crate::{
    Config,
    error::{PipelineError, StorageError},
    model::{Observation, SummaryOutcome},
    provider::{WeatherProvider, provider_from_config},
    store::ObservationStore,
};

#[derive(Debug)]
pub struct Pipeline {
    provider: Box<dyn WeatherProvider>,
    store: ObservationStore,
    location: String,
}

impl Pipeline {
    pub fn new(
        provider: Box<dyn WeatherProvider>,
        store: ObservationStore,
        location: impl Into<String>,
    ) -> Self {
        Self { provider, store, location: location.into() }
    }

    /// Wire the OpenWeather provider and the on-disk store from config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = provider_from_config(config)?;
        let store = ObservationStore::open(config.database_path()?, config.timeout())?;
        Ok(Self::new(provider, store, config.location.clone()))
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn store(&self) -> &ObservationStore {
        &self.store
    }

    /// Fetch the configured location and append the observation.
    ///
    /// On any failure nothing is written.
    pub async fn run_ingest(&mut self) -> Result<Observation, PipelineError> {
        let observation = match self.provider.fetch(&self.location).await {
            Ok(observation) => observation,
            Err(e) => {
                tracing::warn!(location = %self.location, error = %e, "fetch failed");
                return Err(e.into());
            }
        };

        if let Err(e) = self.store.append(&observation) {
            tracing::warn!(error = %e, "failed to store observation");
            return Err(e.into());
        }

        tracing::info!(
            location = %observation.location,
            observed_at = %observation.observed_at_text(),
            temperature = observation.temperature_celsius,
            humidity = observation.humidity_percent,
            "stored observation"
        );
        Ok(observation)
    }

    /// Aggregate the observations recorded on `date` (UTC).
    pub fn run_summary(&self, date: NaiveDate) -> Result<SummaryOutcome, StorageError> {
        summarize(&self.store, date)
    }
}

/// Summary step on its own; needs only the store, not API credentials.
pub fn summarize(store: &ObservationStore, date: NaiveDate) -> Result<SummaryOutcome, StorageError> {
    let outcome = match store.daily_average(date)? {
        Some(summary) => SummaryOutcome::Summary(summary),
        None => SummaryOutcome::NoData { date },
    };

    if outcome.is_no_data() {
        tracing::info!(%date, "no observations to summarize");
    } else {
        tracing::info!(%date, "daily summary computed");
    }
    Ok(outcome)
}

/// Current calendar day in UTC.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use chrono::DateTime;
    use reqwest::StatusCode;
    use std::time::Duration;

    #[derive(Debug)]
    struct FakeProvider {
        observation: Option<Observation>,
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn fetch(&self, _location: &str) -> Result<Observation, FetchError> {
            self.observation.clone().ok_or(FetchError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "boom".into(),
            })
        }
    }

    fn sample() -> Observation {
        Observation {
            location: "Düsseldorf".into(),
            observed_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            temperature_celsius: 5.2,
            humidity_percent: 80.0,
            description: "clear sky".into(),
        }
    }

    fn pipeline(observation: Option<Observation>) -> Pipeline {
        Pipeline::new(
            Box::new(FakeProvider { observation }),
            ObservationStore::open_in_memory().unwrap(),
            "Düsseldorf",
        )
    }

    #[tokio::test]
    async fn ingest_appends_fetched_observation() {
        let mut p = pipeline(Some(sample()));

        let stored = p.run_ingest().await.unwrap();

        assert_eq!(stored, sample());
        assert_eq!(p.store().all().unwrap(), vec![sample()]);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_store_untouched() {
        let mut p = pipeline(None);

        let err = p.run_ingest().await.unwrap_err();

        assert!(matches!(err, PipelineError::Fetch(FetchError::Status { .. })));
        assert!(err.is_retryable());
        assert_eq!(p.store().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_append_is_reported_as_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather_data.db");
        let store = ObservationStore::open(&path, Duration::from_secs(1)).unwrap();

        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_inserts BEFORE INSERT ON weather_observations
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )
            .unwrap();

        let mut p =
            Pipeline::new(Box::new(FakeProvider { observation: Some(sample()) }), store, "Düsseldorf");

        let err = p.run_ingest().await.unwrap_err();

        assert!(matches!(err, PipelineError::Storage(StorageError::Sqlite(_))));
        assert!(!err.is_retryable());
        assert_eq!(p.store().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn summary_reflects_ingested_day() {
        let mut p = pipeline(Some(sample()));
        p.run_ingest().await.unwrap();

        let day = sample().observed_at.date_naive();
        let outcome = p.run_summary(day).unwrap();

        let summary = outcome.summary().unwrap();
        assert_eq!(summary.observation_count, 1);
        assert!(outcome.report().contains("Average Temperature: 5.20°C"));

        let next = day.succ_opt().unwrap();
        assert_eq!(p.run_summary(next).unwrap(), SummaryOutcome::NoData { date: next });
    }
}
