//! # Weather & Tide Panel Core Library
//!
//! This library provides the data structures and pure transformations behind the
//! weather/tide status panel, plus the collaborators (HTTP sources, frame buffer,
//! renderer) that the `weather-panel` binary wires together.
//!
//! ## Data Flow
//! 1. **Fetch**: a [`weather_data::ForecastSource`] yields ordered [`RawSample`]s and a
//!    [`tide_data::TideSource`] yields sorted [`TideExtreme`]s
//! 2. **Aggregate**: [`forecast::aggregate_by_window`] folds samples into one
//!    [`DaySummary`] per day
//! 3. **Select**: [`tide::select_tide_turns`] picks the last/next tide turn around "now"
//! 4. **Render**: [`renderer::draw_panel`] lays everything into four fixed regions of a
//!    [`canvas::PanelCanvas`], which is then pushed to the e-paper display
//!
//! The aggregation, classification and tide selection steps are pure functions with no
//! I/O, so they can be tested without a network or a display.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

// Module declarations
pub mod canvas;
pub mod condition;
pub mod config;
#[cfg(all(target_os = "linux", feature = "hardware"))]
pub mod epaper;
pub mod forecast;
pub mod icons;
pub mod renderer;
pub mod tide;
pub mod tide_data;
pub mod weather_data;

/// One weather observation/forecast slot at a point in time.
///
/// Produced by a data source and never mutated afterwards. The per-sample
/// temperature range (`temp_min`/`temp_max`) is what day aggregation uses; sources
/// that only provide a point temperature set both to `temperature`.
///
/// # Example
/// ```
/// use chrono::DateTime;
/// use weather_panel_lib::RawSample;
///
/// let ts = DateTime::parse_from_rfc3339("2026-02-16T09:00:00+00:00").unwrap();
/// let sample = RawSample::new(ts, 11.5, 18.0, 0.4, 61);
/// assert_eq!(sample.temp_min, sample.temp_max);
///
/// let ranged = sample.with_range(10.0, 12.5);
/// assert_eq!(ranged.temp_min, 10.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Slot time with the location's UTC offset
    pub timestamp: DateTime<FixedOffset>,
    /// Point temperature in °C
    pub temperature: f64,
    /// Lowest temperature reported for this slot in °C
    pub temp_min: f64,
    /// Highest temperature reported for this slot in °C
    pub temp_max: f64,
    /// Wind speed in km/h
    pub wind_speed: f64,
    /// Precipitation in mm
    pub precipitation: f64,
    /// WMO weather code
    pub condition_code: i32,
}

impl RawSample {
    /// Build a sample from a point temperature; the range collapses onto it.
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        temperature: f64,
        wind_speed: f64,
        precipitation: f64,
        condition_code: i32,
    ) -> Self {
        Self {
            timestamp,
            temperature,
            temp_min: temperature,
            temp_max: temperature,
            wind_speed,
            precipitation,
            condition_code,
        }
    }

    /// Attach the slot's reported temperature range.
    pub fn with_range(mut self, temp_min: f64, temp_max: f64) -> Self {
        self.temp_min = temp_min;
        self.temp_max = temp_max;
        self
    }
}

/// Per-day summary drawn as one row of the weather panel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    /// Short day name ("Mon", "Tue", ...)
    pub label: String,
    /// Lowest temperature in the window (°C)
    pub temp_min: f64,
    /// Highest temperature in the window (°C)
    pub temp_max: f64,
    /// Wind speed of the window's representative (first) sample, km/h
    pub wind_representative: f64,
    /// Total precipitation over the window, mm
    pub precipitation_total: f64,
    /// WMO code of the window's representative (first) sample
    pub condition_code: i32,
    /// False only for the placeholder row drawn when no forecast could be used
    pub available: bool,
}

impl DaySummary {
    /// Condition code carried by the placeholder row.
    pub const UNAVAILABLE_CODE: i32 = -1;

    /// Placeholder row shown when the forecast could not be fetched.
    pub fn unavailable() -> Self {
        Self {
            label: "Err".to_string(),
            temp_min: 0.0,
            temp_max: 0.0,
            wind_representative: 0.0,
            precipitation_total: 0.0,
            condition_code: Self::UNAVAILABLE_CODE,
            available: false,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        !self.available
    }
}

/// Whether a tide extreme is high or low water.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TideKind {
    High,
    Low,
}

/// One tide turning point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideExtreme {
    pub time_utc: DateTime<Utc>,
    pub kind: TideKind,
    /// Height in metres, when the source reports it
    pub height_meters: Option<f64>,
}

/// Direction the water is moving, derived from the next extreme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TideDirection {
    Incoming,
    Outgoing,
    Unknown,
}

impl TideDirection {
    pub fn label(self) -> &'static str {
        match self {
            TideDirection::Incoming => "Incoming",
            TideDirection::Outgoing => "Outgoing",
            TideDirection::Unknown => "Unknown",
        }
    }
}
