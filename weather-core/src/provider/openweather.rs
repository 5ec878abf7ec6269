use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt, time::Duration};

use crate::{
    Config,
    error::FetchError,
    model::{Observation, unix_to_utc},
};

use super::WeatherProvider;

/// Current-conditions client for the OpenWeather API, metric units.
#[derive(Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    verify_location: bool,
    http: Client,
}

impl fmt::Debug for OpenWeatherProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherProvider")
            .field("base_url", &self.base_url)
            .field("verify_location", &self.verify_location)
            .finish_non_exhaustive()
    }
}

impl OpenWeatherProvider {
    pub fn new(
        api_key: String,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build().map_err(FetchError::Transport)?;

        Ok(Self { api_key, base_url: base_url.into(), verify_location: true, http })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let provider =
            Self::new(config.api_key()?.to_owned(), config.base_url.clone(), config.timeout())?
                .verify_location(config.verify_location);
        Ok(provider)
    }

    /// Toggle the check that the response is for the requested city.
    pub fn verify_location(mut self, verify: bool) -> Self {
        self.verify_location = verify;
        self
    }

    async fn fetch_current(&self, location: &str) -> Result<Observation, FetchError> {
        let url = format!("{}/weather", self.base_url.trim_end_matches('/'));

        tracing::debug!(%url, location, "requesting current weather");

        let res = self
            .http
            .get(&url)
            .query(&[("q", location), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = res.status();
        if !status.is_success() {
            let body = match res.text().await {
                Ok(body) => truncate_body(&body),
                Err(e) => format!("<body unavailable: {e}>"),
            };
            return Err(FetchError::Status { status, body });
        }

        let body = res.text().await.map_err(FetchError::from_reqwest)?;

        let expected = self.verify_location.then_some(location);
        parse_current(&body, expected)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch(&self, location: &str) -> Result<Observation, FetchError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(FetchError::EmptyLocation);
        }

        self.fetch_current(location).await
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: Option<String>,
    dt: Option<i64>,
    main: Option<OwMain>,
    weather: Option<Vec<OwWeather>>,
}

/// Turn a current-weather body into an `Observation`, rejecting it whole if
/// any consumed field is absent.
pub(crate) fn parse_current(body: &str, expected: Option<&str>) -> Result<Observation, FetchError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body).map_err(FetchError::Malformed)?;

    let name = parsed.name.filter(|n| !n.trim().is_empty()).ok_or(FetchError::MissingField("name"))?;
    let dt = parsed.dt.ok_or(FetchError::MissingField("dt"))?;
    let main = parsed.main.ok_or(FetchError::MissingField("main"))?;
    let temperature_celsius = main.temp.ok_or(FetchError::MissingField("main.temp"))?;
    let humidity_percent = main.humidity.ok_or(FetchError::MissingField("main.humidity"))?;
    let description = parsed
        .weather
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or(FetchError::MissingField("weather[0]"))?
        .description
        .ok_or(FetchError::MissingField("weather[0].description"))?;

    let observed_at = unix_to_utc(dt).ok_or(FetchError::InvalidTimestamp(dt))?;

    if let Some(expected) = expected {
        if !location_matches(expected, &name) {
            return Err(FetchError::UnexpectedLocation {
                expected: expected.to_string(),
                actual: name,
            });
        }
    }

    Ok(Observation { location: name, observed_at, temperature_celsius, humidity_percent, description })
}

/// "Düsseldorf,DE" matches a response named "düsseldorf".
fn location_matches(requested: &str, returned: &str) -> bool {
    let city = requested.split(',').next().unwrap_or(requested).trim();
    city.to_lowercase() == returned.trim().to_lowercase()
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
