//! # Forecast Aggregation
//!
//! Folds an ordered series of forecast slots into one [`DaySummary`] per window.
//!
//! Sources deliver fixed-interval slots (hourly from Open-Meteo, 3-hourly from
//! OpenWeatherMap), so a "day" is simply a run of `window_size` consecutive samples
//! (24 or 8). Temperatures and precipitation aggregate across the window; wind and
//! weather code come from the window's first sample, since neither averages into
//! anything meaningful.

use crate::{DaySummary, RawSample};
use thiserror::Error;

/// Errors raised by [`aggregate_by_window`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ForecastError {
    /// No samples were supplied; the data source broke its contract
    #[error("no forecast samples to aggregate")]
    EmptyInput,

    /// A window must contain at least one sample
    #[error("window size must be positive")]
    InvalidWindowSize,
}

/// Group `samples` into consecutive windows of `window_size` and summarise each.
///
/// A trailing partial window is dropped. At most `max_windows` summaries are
/// produced; `max_windows == 0` yields an empty list rather than an error.
///
/// # Example
/// ```
/// use chrono::{DateTime, Duration};
/// use weather_panel_lib::{forecast::aggregate_by_window, RawSample};
///
/// let start = DateTime::parse_from_rfc3339("2026-02-16T00:00:00+00:00").unwrap();
/// let samples: Vec<RawSample> = (0..16)
///     .map(|i| RawSample::new(start + Duration::hours(3 * i), i as f64, 10.0, 0.5, 3))
///     .collect();
///
/// let days = aggregate_by_window(&samples, 8, 3).unwrap();
/// assert_eq!(days.len(), 2);
/// assert_eq!(days[0].label, "Mon");
/// assert_eq!(days[1].temp_min, 8.0);
/// ```
pub fn aggregate_by_window(
    samples: &[RawSample],
    window_size: usize,
    max_windows: usize,
) -> Result<Vec<DaySummary>, ForecastError> {
    if samples.is_empty() {
        return Err(ForecastError::EmptyInput);
    }
    if window_size == 0 {
        return Err(ForecastError::InvalidWindowSize);
    }

    Ok(samples
        .chunks_exact(window_size)
        .take(max_windows)
        .map(summarize_window)
        .collect())
}

/// Summarise one non-empty window; `chunks_exact` never yields an empty slice.
fn summarize_window(window: &[RawSample]) -> DaySummary {
    let first = &window[0];

    let (temp_min, temp_max) = window
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), sample| {
            (min.min(sample.temp_min), max.max(sample.temp_max))
        });

    let precipitation_total = window.iter().map(|s| s.precipitation).sum();

    DaySummary {
        label: first.timestamp.format("%a").to_string(),
        temp_min,
        temp_max,
        wind_representative: first.wind_speed,
        precipitation_total,
        condition_code: first.condition_code,
        available: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, FixedOffset};

    fn start() -> DateTime<FixedOffset> {
        // Monday
        DateTime::parse_from_rfc3339("2026-02-16T00:00:00+00:00").unwrap()
    }

    /// Three-hourly samples with a temperature ramp and a fixed rain pattern.
    fn three_hourly(count: usize) -> Vec<RawSample> {
        (0..count)
            .map(|i| {
                let ts = start() + Duration::hours(3 * i as i64);
                let temp = 5.0 + (i % 8) as f64;
                RawSample::new(ts, temp, 10.0 + i as f64, 0.1 * (i % 3) as f64, i as i32)
                    .with_range(temp - 1.0, temp + 1.5)
            })
            .collect()
    }

    #[test]
    fn test_full_windows_produce_one_summary_each() {
        let samples = three_hourly(24);
        let days = aggregate_by_window(&samples, 8, 3).unwrap();

        assert_eq!(days.len(), 3);
        assert_eq!(days[0].label, "Mon");
        assert_eq!(days[1].label, "Tue");
        assert_eq!(days[2].label, "Wed");
    }

    #[test]
    fn test_min_max_use_range_fields() {
        let samples = three_hourly(8);
        let days = aggregate_by_window(&samples, 8, 1).unwrap();

        // Point temps run 5..=12, ranges widen that by -1/+1.5
        assert_eq!(days[0].temp_min, 4.0);
        assert_eq!(days[0].temp_max, 13.5);
        assert!(days[0].temp_min <= days[0].temp_max);
    }

    #[test]
    fn test_point_temperatures_degenerate_to_same_extremes() {
        let ts = start();
        let samples = vec![RawSample::new(ts, 7.25, 3.0, 0.0, 0)];
        let days = aggregate_by_window(&samples, 1, 5).unwrap();

        assert_eq!(days[0].temp_min, 7.25);
        assert_eq!(days[0].temp_max, 7.25);
    }

    #[test]
    fn test_precipitation_is_ordered_sum() {
        let samples = three_hourly(8);
        let expected: f64 = samples.iter().map(|s| s.precipitation).sum();
        let days = aggregate_by_window(&samples, 8, 1).unwrap();

        assert_eq!(days[0].precipitation_total, expected);
    }

    #[test]
    fn test_wind_and_code_come_from_first_sample() {
        let samples = three_hourly(16);
        let days = aggregate_by_window(&samples, 8, 2).unwrap();

        assert_eq!(days[0].wind_representative, 10.0);
        assert_eq!(days[0].condition_code, 0);
        assert_eq!(days[1].wind_representative, 18.0);
        assert_eq!(days[1].condition_code, 8);
    }

    #[test]
    fn test_aggregated_day_is_never_the_placeholder() {
        // Even a code that collides with the placeholder's
        let samples = vec![RawSample::new(start(), 9.0, 5.0, 0.0, DaySummary::UNAVAILABLE_CODE)];
        let days = aggregate_by_window(&samples, 1, 1).unwrap();

        assert!(days[0].available);
        assert!(!days[0].is_unavailable());
        assert!(DaySummary::unavailable().is_unavailable());
    }

    #[test]
    fn test_trailing_partial_window_is_dropped() {
        let samples = three_hourly(21);
        let days = aggregate_by_window(&samples, 8, 5).unwrap();
        assert_eq!(days.len(), 2);
    }

    #[test]
    fn test_max_windows_caps_output() {
        let samples = three_hourly(40);
        let days = aggregate_by_window(&samples, 8, 3).unwrap();
        assert_eq!(days.len(), 3);
    }

    #[test]
    fn test_fewer_samples_than_one_window() {
        let samples = three_hourly(5);
        let days = aggregate_by_window(&samples, 8, 3).unwrap();
        assert!(days.is_empty());
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert_eq!(
            aggregate_by_window(&[], 8, 3),
            Err(ForecastError::EmptyInput)
        );
    }

    #[test]
    fn test_zero_max_windows_returns_empty() {
        let samples = three_hourly(16);
        assert_eq!(aggregate_by_window(&samples, 8, 0), Ok(vec![]));
    }

    #[test]
    fn test_zero_window_size_is_rejected() {
        let samples = three_hourly(4);
        assert_eq!(
            aggregate_by_window(&samples, 0, 3),
            Err(ForecastError::InvalidWindowSize)
        );
    }

    #[test]
    fn test_label_uses_sample_offset() {
        // 23:00 UTC Sunday is already Monday at +02:00
        let ts = DateTime::parse_from_rfc3339("2026-02-16T01:00:00+02:00").unwrap();
        let samples = vec![RawSample::new(ts, 1.0, 1.0, 0.0, 0)];
        let days = aggregate_by_window(&samples, 1, 1).unwrap();
        assert_eq!(days[0].label, "Mon");
    }
}
