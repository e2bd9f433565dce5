//! # Weather & Tide Panel Entry Point
//!
//! Fetches the forecast and tide extremes, reduces them to panel content and pushes
//! one frame to the e-paper display. Meant to run from cron or a systemd timer; each
//! run is a single refresh.
//!
//! ```text
//! weather-panel [--stdout] [--config PATH]
//! ```
//!
//! `--stdout` prints an ASCII rendering instead of touching the hardware.

#[cfg(test)]
mod tests;

use chrono::{DateTime, FixedOffset, Local, Utc};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use weather_panel_lib::{
    canvas::PanelCanvas,
    config::{Config, DEFAULT_CONFIG_PATH},
    forecast::aggregate_by_window,
    renderer::{draw_ascii, draw_panel, PanelData},
    tide::select_tide_turns,
    tide_data::{self, TideSource},
    weather_data::{source_from_config, ForecastSource},
    DaySummary, RawSample, TideExtreme,
};

/// Weather & tide e-paper panel, one refresh per run
#[derive(Parser, Debug, PartialEq)]
#[command(name = "weather-panel")]
#[command(version, about, long_about = None)]
struct Args {
    /// Print an ASCII rendering instead of driving the display
    #[arg(long)]
    stdout: bool,

    /// Configuration file
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config_path: PathBuf,
}

/// Forecast samples plus the per-day rows derived from them.
///
/// A failed fetch or an unusable series yields `forecast_days` sentinel rows so the
/// panel layout stays stable.
async fn fetch_forecast(
    source: Option<&dyn ForecastSource>,
    forecast_days: usize,
) -> (Vec<RawSample>, Vec<DaySummary>) {
    let unavailable = || vec![DaySummary::unavailable(); forecast_days];
    let Some(source) = source else {
        return (Vec::new(), unavailable());
    };

    let samples = match source.fetch().await {
        Ok(samples) => samples,
        Err(e) => {
            warn!("forecast fetch failed: {e}");
            return (Vec::new(), unavailable());
        }
    };

    match aggregate_by_window(&samples, source.samples_per_day(), forecast_days) {
        Ok(days) => (samples, days),
        Err(e) => {
            warn!(samples = samples.len(), "forecast aggregation failed: {e}");
            (samples, unavailable())
        }
    }
}

async fn fetch_tides(source: Option<&dyn TideSource>, now: DateTime<Utc>) -> Vec<TideExtreme> {
    let Some(source) = source else {
        return Vec::new();
    };
    source.fetch(now).await.unwrap_or_else(|e| {
        warn!("tide fetch failed: {e}");
        Vec::new()
    })
}

/// Display offset: the forecast's own offset, else the host's.
fn display_offset(samples: &[RawSample]) -> FixedOffset {
    samples
        .first()
        .map(|s| *s.timestamp.offset())
        .unwrap_or_else(|| *Local::now().offset())
}

/// Run both fetches concurrently and assemble everything one refresh draws.
async fn collect_panel_data(
    forecast: Option<&dyn ForecastSource>,
    tides: Option<&dyn TideSource>,
    forecast_days: usize,
    now: DateTime<Utc>,
) -> PanelData {
    let ((samples, days), extremes) = tokio::join!(
        fetch_forecast(forecast, forecast_days),
        fetch_tides(tides, now)
    );

    let turns = select_tide_turns(&extremes, now);
    let local_now = now.with_timezone(&display_offset(&samples));
    PanelData::new(days, &samples, turns, local_now)
}

#[cfg(all(target_os = "linux", feature = "hardware"))]
fn show(canvas: &PanelCanvas, config: &Config, data: &PanelData) {
    if let Err(e) = weather_panel_lib::epaper::push_to_panel(&config.display.hardware, canvas) {
        warn!("e-paper update failed: {e}");
        warn!("showing ASCII output instead");
        draw_ascii(data);
    }
}

#[cfg(not(all(target_os = "linux", feature = "hardware")))]
fn show(canvas: &PanelCanvas, _config: &Config, data: &PanelData) {
    warn!(
        ink = canvas.ink_count(),
        "e-paper support not enabled, rebuild with --features hardware on Linux"
    );
    draw_ascii(data);
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load_from_path(&args.config_path);

    let forecast = source_from_config(&config)
        .inspect_err(|e| warn!("forecast source unavailable: {e}"))
        .ok();
    let tides = tide_data::source_from_config(&config)
        .inspect_err(|e| warn!("tide source unavailable: {e}"))
        .ok();

    let rt = tokio::runtime::Runtime::new()?;
    let data = rt.block_on(collect_panel_data(
        forecast.as_deref(),
        tides.as_deref(),
        config.weather.forecast_days,
        Utc::now(),
    ));
    info!(
        days = data.days.len(),
        rain_slots = data.rain.len(),
        direction = data.tide.direction.label(),
        "panel data ready"
    );

    if args.stdout {
        draw_ascii(&data);
        return Ok(());
    }

    let mut canvas = PanelCanvas::new(config.display.width, config.display.height);
    let icon_dir = Path::new(&config.display.icon_dir);
    draw_panel(&mut canvas, &data, icon_dir).unwrap_or_else(|e| match e {});
    show(&canvas, &config, &data);

    Ok(())
}
