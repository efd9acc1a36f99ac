//! `OpenWeatherMap` current-conditions client

use async_trait::async_trait;
use serde::Deserialize;

use super::{WeatherProvider, WeatherReport};
use crate::{Error, Result};

const BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Current weather client
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    #[serde(default)]
    weather: Vec<WeatherCondition>,
    main: Option<WeatherMain>,
}

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct WeatherMain {
    temp: f64,
}

impl WeatherResponse {
    fn into_report(self) -> Option<WeatherReport> {
        let description = self.weather.into_iter().next()?.description;
        let temperature_c = self.main?.temp;
        Some(WeatherReport {
            description,
            temperature_c,
        })
    }
}

impl OpenWeatherClient {
    /// Create a new weather client
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, city: &str) -> Result<Option<WeatherReport>> {
        tracing::info!(city, "fetching weather");

        let response = self
            .client
            .get(BASE_URL)
            .query(&[("q", city), ("appid", &self.api_key), ("units", "metric")])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!(city, "weather data not found");
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Provider(format!("weather API error {status}")));
        }

        let parsed: WeatherResponse = response.json().await?;
        Ok(parsed.into_report())
    }
}
