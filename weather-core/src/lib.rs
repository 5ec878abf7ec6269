//! Core library for the weather pipeline.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather fetcher behind the `WeatherProvider` trait
//! - The SQLite observation store and its daily aggregate
//! - The `Pipeline` operations an external scheduler invokes: ingest and summary
//!
//! It is used by `weather-cli`, but can also be driven by any other scheduler.

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod store;

pub use config::Config;
pub use error::{FetchError, PipelineError, StorageError};
pub use model::{DailySummary, Observation, SummaryOutcome};
pub use pipeline::{Pipeline, summarize, today_utc};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider};
pub use store::ObservationStore;
