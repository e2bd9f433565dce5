//! # Forecast Data Fetching
//!
//! Network side of the weather panel: turns forecast API responses into ordered
//! [`RawSample`]s for [`crate::forecast::aggregate_by_window`].
//!
//! ## Sources
//!
//! ### Open-Meteo (default)
//! - **URL**: `{base}/forecast` with
//!   `hourly=temperature_2m,precipitation,weather_code,wind_speed_10m`
//! - **Resolution**: hourly, starting at local midnight, so 24 samples per day
//! - **Codes**: native WMO weather codes
//!
//! ### OpenWeatherMap
//! - **URL**: `{base}/forecast` (5 day / 3 hour forecast)
//! - **Resolution**: 3-hourly, so 8 samples per day
//! - **Units**: wind arrives in m/s and is converted to km/h; condition ids are
//!   mapped onto the nearest WMO code
//!
//! ## Error Handling
//!
//! Every failure comes back as a [`FetchError`]. Neither client invents data: a missing
//! API key or a failed request is an error, and the caller decides what to draw.

use crate::condition::UNREPORTED_CODE;
use crate::config::{Config, WeatherProvider};
use crate::RawSample;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Errors that can occur while fetching forecast samples.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The provider needs an API key and none is configured
    #[error("no API key configured for {0}")]
    MissingApiKey(&'static str),

    /// HTTP request failed (network, timeout or protocol error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),

    /// Response body did not have the expected shape
    #[error("malformed forecast response: {0}")]
    Parse(String),
}

/// A producer of ordered forecast samples.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Fetch the forecast as consecutive, evenly spaced samples.
    async fn fetch(&self) -> Result<Vec<RawSample>, FetchError>;

    /// How many consecutive samples make up one day.
    fn samples_per_day(&self) -> usize;
}

/// Build the forecast source selected in the configuration.
pub fn source_from_config(config: &Config) -> Result<Box<dyn ForecastSource>, FetchError> {
    let base_url = config.weather_base_url().to_string();
    let timeout = config.weather_timeout();
    let source: Box<dyn ForecastSource> = match config.weather.provider {
        WeatherProvider::OpenMeteo => Box::new(OpenMeteoClient::new(
            base_url,
            config.location.latitude,
            config.location.longitude,
            config.location.timezone.clone(),
            config.weather.forecast_days,
            timeout,
        )?),
        WeatherProvider::OpenWeatherMap => {
            let api_key = config
                .weather
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty())
                .ok_or(FetchError::MissingApiKey("OpenWeatherMap"))?;
            Box::new(OpenWeatherMapClient::new(
                base_url,
                config.location.latitude,
                config.location.longitude,
                api_key,
                timeout,
            )?)
        }
    };
    Ok(source)
}

fn offset_from_seconds(secs: i32) -> Result<FixedOffset, FetchError> {
    FixedOffset::east_opt(secs).ok_or_else(|| FetchError::Parse(format!("bad UTC offset {secs}")))
}

// -- Open-Meteo --

/// Open-Meteo hourly forecast client.
#[derive(Debug)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
    timezone: String,
    forecast_days: usize,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    utc_offset_seconds: i32,
    hourly: OpenMeteoHourly,
}

/// Columnar hourly data; the API reports gaps as `null`.
#[derive(Debug, Deserialize)]
struct OpenMeteoHourly {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    precipitation: Vec<Option<f64>>,
    weather_code: Vec<Option<i32>>,
    wind_speed_10m: Vec<Option<f64>>,
}

impl OpenMeteoClient {
    pub fn new(
        base_url: impl Into<String>,
        latitude: f64,
        longitude: f64,
        timezone: impl Into<String>,
        forecast_days: usize,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            latitude,
            longitude,
            timezone: timezone.into(),
            forecast_days,
        })
    }

    fn parse(body: OpenMeteoResponse) -> Result<Vec<RawSample>, FetchError> {
        let offset = offset_from_seconds(body.utc_offset_seconds)?;
        let hourly = body.hourly;
        let len = hourly.time.len();
        if [
            hourly.temperature_2m.len(),
            hourly.precipitation.len(),
            hourly.weather_code.len(),
            hourly.wind_speed_10m.len(),
        ]
        .iter()
        .any(|&n| n != len)
        {
            return Err(FetchError::Parse("hourly columns differ in length".into()));
        }

        let mut samples = Vec::with_capacity(len);
        for i in 0..len {
            let (Some(temp), Some(precip), Some(code), Some(wind)) = (
                hourly.temperature_2m[i],
                hourly.precipitation[i],
                hourly.weather_code[i],
                hourly.wind_speed_10m[i],
            ) else {
                // Slots must stay contiguous for windowing, so stop at the first gap
                debug!(slot = i, "hourly data incomplete, truncating series");
                break;
            };

            let naive = NaiveDateTime::parse_from_str(&hourly.time[i], "%Y-%m-%dT%H:%M")
                .map_err(|e| FetchError::Parse(format!("bad time {:?}: {e}", hourly.time[i])))?;
            let timestamp = offset
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(|| FetchError::Parse(format!("ambiguous time {naive}")))?;

            samples.push(RawSample::new(
                timestamp,
                temp,
                wind.max(0.0),
                precip.max(0.0),
                code,
            ));
        }

        Ok(samples)
    }
}

#[async_trait]
impl ForecastSource for OpenMeteoClient {
    #[instrument(skip(self), fields(lat = self.latitude, lon = self.longitude))]
    async fn fetch(&self) -> Result<Vec<RawSample>, FetchError> {
        let url = format!("{}/forecast", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", self.latitude.to_string()),
                ("longitude", self.longitude.to_string()),
                (
                    "hourly",
                    "temperature_2m,precipitation,weather_code,wind_speed_10m".to_string(),
                ),
                ("timezone", self.timezone.clone()),
                ("forecast_days", self.forecast_days.to_string()),
                ("wind_speed_unit", "kmh".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Open-Meteo request rejected");
            return Err(FetchError::Status(response.status()));
        }

        let body: OpenMeteoResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        let samples = Self::parse(body)?;
        info!(count = samples.len(), "fetched Open-Meteo forecast");
        Ok(samples)
    }

    fn samples_per_day(&self) -> usize {
        WeatherProvider::OpenMeteo.samples_per_day()
    }
}

// -- OpenWeatherMap --

/// OpenWeatherMap 5 day / 3 hour forecast client.
#[derive(Debug)]
pub struct OpenWeatherMapClient {
    client: Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    list: Vec<OwmSlot>,
    city: OwmCity,
}

#[derive(Debug, Deserialize)]
struct OwmCity {
    /// Shift in seconds from UTC
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwmSlot {
    dt: i64,
    main: OwmMain,
    wind: OwmWind,
    #[serde(default)]
    rain: Option<OwmVolume>,
    #[serde(default)]
    snow: Option<OwmVolume>,
    weather: Vec<OwmCondition>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    /// m/s with `units=metric`
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmVolume {
    #[serde(rename = "3h", default)]
    three_hours: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    id: i32,
}

impl OpenWeatherMapClient {
    pub fn new(
        base_url: impl Into<String>,
        latitude: f64,
        longitude: f64,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            latitude,
            longitude,
            api_key: api_key.into(),
        })
    }

    fn parse(body: OwmResponse) -> Result<Vec<RawSample>, FetchError> {
        let offset = offset_from_seconds(body.city.timezone)?;

        body.list
            .into_iter()
            .map(|slot| {
                let timestamp = DateTime::from_timestamp(slot.dt, 0)
                    .ok_or_else(|| FetchError::Parse(format!("bad timestamp {}", slot.dt)))?
                    .with_timezone(&offset);
                let precipitation = slot.rain.map_or(0.0, |r| r.three_hours)
                    + slot.snow.map_or(0.0, |s| s.three_hours);
                let code = slot
                    .weather
                    .first()
                    .map_or(UNREPORTED_CODE, |condition| owm_to_wmo(condition.id));

                Ok(RawSample::new(
                    timestamp,
                    slot.main.temp,
                    (slot.wind.speed * 3.6).max(0.0),
                    precipitation.max(0.0),
                    code,
                )
                .with_range(slot.main.temp_min, slot.main.temp_max))
            })
            .collect()
    }
}

/// Map an OpenWeatherMap condition id onto the closest WMO weather code.
///
/// Unmapped ids are passed through unchanged so the classifier reports them.
pub fn owm_to_wmo(id: i32) -> i32 {
    match id {
        200..=232 => 95,
        300 | 310 => 51,
        301 | 311 | 313 | 321 => 53,
        302 | 312 | 314 => 55,
        500 => 61,
        501 => 63,
        502..=504 => 65,
        511 => 66,
        520 => 80,
        521 => 81,
        522 | 531 => 82,
        600 => 71,
        601 => 73,
        602 => 75,
        611..=616 => 66,
        620 => 85,
        621 | 622 => 86,
        701 | 711 | 721 | 741 => 45,
        800 => 0,
        801 => 1,
        802 => 2,
        803 | 804 => 3,
        other => other,
    }
}

#[async_trait]
impl ForecastSource for OpenWeatherMapClient {
    #[instrument(skip(self), fields(lat = self.latitude, lon = self.longitude))]
    async fn fetch(&self) -> Result<Vec<RawSample>, FetchError> {
        let url = format!("{}/forecast", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", self.latitude.to_string()),
                ("lon", self.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "OpenWeatherMap request rejected");
            return Err(FetchError::Status(response.status()));
        }

        let body: OwmResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        let samples = Self::parse(body)?;
        info!(count = samples.len(), "fetched OpenWeatherMap forecast");
        Ok(samples)
    }

    fn samples_per_day(&self) -> usize {
        WeatherProvider::OpenWeatherMap.samples_per_day()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::classify;
    use crate::forecast::aggregate_by_window;
    use crate::renderer::format_temps;
    use serde_json::json;

    #[test]
    fn test_open_meteo_parse_applies_offset() {
        let body: OpenMeteoResponse = serde_json::from_value(json!({
            "utc_offset_seconds": 3600,
            "hourly": {
                "time": ["2026-06-01T00:00", "2026-06-01T01:00"],
                "temperature_2m": [12.5, 12.0],
                "precipitation": [0.0, 0.4],
                "weather_code": [3, 61],
                "wind_speed_10m": [14.0, 16.2]
            }
        }))
        .unwrap();

        let samples = OpenMeteoClient::parse(body).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].timestamp.to_rfc3339(), "2026-06-01T00:00:00+01:00");
        assert_eq!(samples[1].condition_code, 61);
        assert_eq!(samples[1].precipitation, 0.4);
        assert_eq!(samples[0].temp_min, samples[0].temp_max);
    }

    #[test]
    fn test_open_meteo_parse_truncates_at_gap() {
        let body: OpenMeteoResponse = serde_json::from_value(json!({
            "utc_offset_seconds": 0,
            "hourly": {
                "time": ["2026-06-01T00:00", "2026-06-01T01:00", "2026-06-01T02:00"],
                "temperature_2m": [12.5, null, 11.0],
                "precipitation": [0.0, 0.0, 0.0],
                "weather_code": [3, 3, 3],
                "wind_speed_10m": [14.0, 14.0, 14.0]
            }
        }))
        .unwrap();

        let samples = OpenMeteoClient::parse(body).unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_open_meteo_parse_rejects_ragged_columns() {
        let body: OpenMeteoResponse = serde_json::from_value(json!({
            "utc_offset_seconds": 0,
            "hourly": {
                "time": ["2026-06-01T00:00", "2026-06-01T01:00"],
                "temperature_2m": [12.5],
                "precipitation": [0.0, 0.0],
                "weather_code": [3, 3],
                "wind_speed_10m": [14.0, 14.0]
            }
        }))
        .unwrap();

        assert!(matches!(
            OpenMeteoClient::parse(body),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn test_owm_parse_converts_units() {
        let body: OwmResponse = serde_json::from_value(json!({
            "list": [
                {
                    "dt": 1_780_272_000,
                    "main": {"temp": 14.0, "temp_min": 12.0, "temp_max": 15.5},
                    "wind": {"speed": 5.0},
                    "rain": {"3h": 1.25},
                    "weather": [{"id": 500, "icon": "10d"}]
                },
                {
                    "dt": 1_780_282_800,
                    "main": {"temp": 13.0, "temp_min": 13.0, "temp_max": 13.0},
                    "wind": {"speed": 2.5},
                    "weather": [{"id": 800, "icon": "01n"}]
                }
            ],
            "city": {"timezone": 3600}
        }))
        .unwrap();

        let samples = OpenWeatherMapClient::parse(body).unwrap();
        assert_eq!(samples.len(), 2);
        assert!((samples[0].wind_speed - 18.0).abs() < 1e-9);
        assert_eq!(samples[0].precipitation, 1.25);
        assert_eq!(samples[0].temp_min, 12.0);
        assert_eq!(samples[0].temp_max, 15.5);
        assert_eq!(samples[0].condition_code, 61);
        assert_eq!(samples[1].precipitation, 0.0);
        assert_eq!(samples[1].condition_code, 0);
        assert_eq!(samples[0].timestamp.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_owm_slot_without_condition_is_still_a_real_day() {
        let list: Vec<_> = (0..8)
            .map(|i| {
                json!({
                    "dt": 1_780_272_000 + i * 10_800,
                    "main": {"temp": 13.0, "temp_min": 10.0, "temp_max": 16.0},
                    "wind": {"speed": 4.0},
                    "weather": []
                })
            })
            .collect();
        let body: OwmResponse =
            serde_json::from_value(json!({"list": list, "city": {"timezone": 0}})).unwrap();

        let samples = OpenWeatherMapClient::parse(body).unwrap();
        assert_eq!(samples[0].condition_code, UNREPORTED_CODE);

        let days = aggregate_by_window(&samples, 8, 1).unwrap();
        assert!(!days[0].is_unavailable());
        assert_eq!(format_temps(&days[0]), "10/16");
        assert_eq!(classify(days[0].condition_code), "Unknown (code: 999)");
    }

    #[test]
    fn test_owm_to_wmo() {
        assert_eq!(owm_to_wmo(211), 95);
        assert_eq!(owm_to_wmo(502), 65);
        assert_eq!(owm_to_wmo(741), 45);
        assert_eq!(owm_to_wmo(804), 3);
        assert_eq!(owm_to_wmo(9999), 9999);
    }

    #[test]
    fn test_owm_source_requires_api_key() {
        let mut config = Config::default();
        config.weather.provider = WeatherProvider::OpenWeatherMap;
        config.weather.api_key = Some("  ".to_string());

        assert!(matches!(
            source_from_config(&config),
            Err(FetchError::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_default_source_is_hourly() {
        let source = source_from_config(&Config::default()).unwrap();
        assert_eq!(source.samples_per_day(), 24);
    }
}
