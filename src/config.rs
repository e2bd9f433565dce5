//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the panel-config.toml file.
//! It provides a centralized way to configure the location, the weather and tide
//! data sources, and display options.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "panel-config.toml";

/// Bounds for HTTP timeouts in seconds
const MIN_TIMEOUT_SECS: u64 = 5;
const MAX_TIMEOUT_SECS: u64 = 15;

/// Application configuration loaded from panel-config.toml
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// The single location shown on the panel
    pub location: LocationConfig,
    /// Forecast source settings
    pub weather: WeatherConfig,
    /// Tide extremes source settings
    pub tide: TideConfig,
    /// Display and UI configuration
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocationConfig {
    /// Human-readable place name for logs
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone name, used by Open-Meteo to align hourly slots to local days
    pub timezone: String,
}

/// Which forecast API to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherProvider {
    /// Open-Meteo hourly forecast, no API key
    OpenMeteo,
    /// OpenWeatherMap 5 day / 3 hour forecast, needs an API key
    OpenWeatherMap,
}

impl WeatherProvider {
    /// Samples per calendar day delivered by this provider
    pub fn samples_per_day(self) -> usize {
        match self {
            WeatherProvider::OpenMeteo => 24,
            WeatherProvider::OpenWeatherMap => 8,
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            WeatherProvider::OpenMeteo => "https://api.open-meteo.com/v1",
            WeatherProvider::OpenWeatherMap => "https://api.openweathermap.org/data/2.5",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeatherConfig {
    pub provider: WeatherProvider,
    /// API key; only OpenWeatherMap needs one
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override of the provider's API base URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Number of day rows to show
    pub forecast_days: usize,
    /// HTTP timeout in seconds (clamped to 5..=15)
    pub timeout_secs: u64,
}

/// Where tide extremes come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TideProvider {
    /// Stormglass extremes API, needs an API key
    #[default]
    Stormglass,
    /// HTML tide table scraped from `page_url`
    TideTable,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TideConfig {
    #[serde(default)]
    pub provider: TideProvider,
    /// Stormglass API key
    #[serde(default)]
    pub api_key: Option<String>,
    pub base_url: String,
    /// Tide table page for the `tide_table` provider
    #[serde(default = "default_tide_page")]
    pub page_url: String,
    /// How far ahead to request extremes
    pub hours_ahead: i64,
    /// HTTP timeout in seconds (clamped to 5..=15)
    pub timeout_secs: u64,
}

/// Display and visualization configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// E-ink display width in pixels
    pub width: u32,
    /// E-ink display height in pixels
    pub height: u32,
    /// Directory holding 40x40 raw 1-bpp icons (`<name>.raw`)
    pub icon_dir: String,
    /// Wiring of the e-paper HAT (only used with the `hardware` feature)
    #[serde(default)]
    pub hardware: HardwareConfig,
}

/// SPI device and GPIO lines (BCM numbering) of the e-paper HAT
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HardwareConfig {
    pub spi_device: String,
    pub gpio_chip: String,
    pub dc_pin: u32,
    pub rst_pin: u32,
    pub busy_pin: u32,
}

fn default_tide_page() -> String {
    "https://tides4fishing.com/ie/munster/limerick".to_string()
}

impl Default for HardwareConfig {
    fn default() -> Self {
        HardwareConfig {
            spi_device: "/dev/spidev0.0".to_string(),
            gpio_chip: "/dev/gpiochip0".to_string(),
            dc_pin: 25,
            rst_pin: 17,
            busy_pin: 24,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            location: LocationConfig {
                name: "Limerick".to_string(),
                latitude: 52.66,
                longitude: -8.62,
                timezone: "Europe/Dublin".to_string(),
            },
            weather: WeatherConfig {
                provider: WeatherProvider::OpenMeteo,
                api_key: None,
                base_url: None,
                forecast_days: 3,
                timeout_secs: 10,
            },
            tide: TideConfig {
                provider: TideProvider::Stormglass,
                api_key: None,
                base_url: "https://api.stormglass.io/v2".to_string(),
                page_url: default_tide_page(),
                hours_ahead: 48,
                timeout_secs: 10,
            },
            display: DisplayConfig {
                width: 400,  // Inky wHAT / Waveshare 4.2"
                height: 300, // Inky wHAT / Waveshare 4.2"
                icon_dir: "./icons".to_string(),
                hardware: HardwareConfig::default(),
            },
        }
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(location = %config.location.name, "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), "invalid config file format: {e}");
                    warn!("using default configuration (Limerick)");
                    Self::default()
                }
            },
            Err(_) => {
                info!(
                    path = %path.display(),
                    "no config file found, using default configuration (Limerick)"
                );
                Self::default()
            }
        }
    }

    pub fn weather_base_url(&self) -> &str {
        self.weather
            .base_url
            .as_deref()
            .unwrap_or_else(|| self.weather.provider.default_base_url())
    }

    pub fn weather_timeout(&self) -> Duration {
        clamp_timeout(self.weather.timeout_secs)
    }

    pub fn tide_timeout(&self) -> Duration {
        clamp_timeout(self.tide.timeout_secs)
    }
}

fn clamp_timeout(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS))
}
