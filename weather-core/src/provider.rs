use crate::{Config, Observation, error::FetchError, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Source of current weather observations.
///
/// Implementations perform the outbound call and parsing only; persisting the
/// result is the caller's job.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Fetch the current observation for `location`.
    ///
    /// Returns a fully populated `Observation` or an error; never a partial one.
    async fn fetch(&self, location: &str) -> Result<Observation, FetchError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let provider = OpenWeatherProvider::from_config(config)?;
    Ok(Box::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = provider_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
    }

    #[test]
    fn provider_from_config_works_when_configured() {
        let cfg = Config { api_key: Some("KEY".to_string()), ..Config::default() };

        let provider = provider_from_config(&cfg);
        assert!(provider.is_ok());
    }
}
