//! # Panel Rendering
//!
//! This module lays the weather/tide data into the four fixed regions of the
//! 400x300 e-paper panel, and provides an ASCII rendering of the same content for
//! development without hardware.
//!
//! ```text
//! +-------------------+-------------------+
//! | day rows          | rain next slots   |
//! | icon  Mon  12/18  | + today's outlook |
//! +-------------------+-------------------+
//! | tide icon         | date              |
//! | last / next turn  | updated time      |
//! +-------------------+-------------------+
//! ```

use crate::condition::{classify, icon_for_code};
use crate::icons::draw_icon_or_placeholder;
use crate::tide::TideTurns;
use crate::{DaySummary, RawSample, TideDirection, TideExtreme, TideKind};
use chrono::{DateTime, Duration, FixedOffset};
use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_6X10, FONT_7X13, FONT_9X15_BOLD},
        MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use std::path::Path;

/// Number of upcoming precipitation slots listed in the rain region
pub const RAIN_SLOTS: usize = 3;

/// Height of one day row in the weather region
const DAY_ROW_HEIGHT: i32 = 45;

/// One line of the rain region.
#[derive(Clone, Debug, PartialEq)]
pub struct RainSlot {
    /// Local slot start, "HH:MM"
    pub label: String,
    pub millimetres: f64,
}

/// Everything one render pass draws.
#[derive(Clone, Debug)]
pub struct PanelData {
    pub days: Vec<DaySummary>,
    pub rain: Vec<RainSlot>,
    pub tide: TideTurns,
    /// Render time in the location's offset
    pub now: DateTime<FixedOffset>,
}

impl PanelData {
    /// Assemble panel content; the rain region takes the first slots still in
    /// progress at `now`.
    pub fn new(
        days: Vec<DaySummary>,
        samples: &[RawSample],
        tide: TideTurns,
        now: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            days,
            rain: upcoming_rain(samples, now),
            tide,
            now,
        }
    }
}

fn upcoming_rain(samples: &[RawSample], now: DateTime<FixedOffset>) -> Vec<RainSlot> {
    let slot_len = match samples {
        [first, second, ..] => second.timestamp - first.timestamp,
        _ => Duration::hours(1),
    };
    samples
        .iter()
        .filter(|s| s.timestamp + slot_len > now)
        .take(RAIN_SLOTS)
        .map(|s| RainSlot {
            label: s.timestamp.format("%H:%M").to_string(),
            millimetres: s.precipitation,
        })
        .collect()
}

/// "12/18" style temperature pair, "--/--" for the sentinel row.
pub fn format_temps(day: &DaySummary) -> String {
    if day.is_unavailable() {
        "--/--".to_string()
    } else {
        format!("{:.0}/{:.0}", day.temp_min, day.temp_max)
    }
}

/// "08:00 Low 0.6m" for a tide turn shown in the given offset, "N/A" when absent.
pub fn format_turn(turn: Option<&TideExtreme>, offset: &FixedOffset) -> String {
    let Some(turn) = turn else {
        return "N/A".to_string();
    };
    let kind = match turn.kind {
        TideKind::High => "High",
        TideKind::Low => "Low",
    };
    let time = turn.time_utc.with_timezone(offset).format("%H:%M");
    match turn.height_meters {
        Some(h) => format!("{time} {kind} {h:.1}m"),
        None => format!("{time} {kind}"),
    }
}

fn tide_icon(direction: TideDirection) -> &'static str {
    match direction {
        TideDirection::Incoming => "tide_incoming",
        TideDirection::Outgoing => "tide_outgoing",
        TideDirection::Unknown => "unknown",
    }
}

/// Truncate to at most `max` characters.
fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn top_left_text<'a>(
    text: &'a str,
    x: i32,
    y: i32,
    style: MonoTextStyle<'a, BinaryColor>,
) -> Text<'a, MonoTextStyle<'a, BinaryColor>> {
    Text::with_baseline(text, Point::new(x, y), style, Baseline::Top)
}

fn centered_text<'a>(
    text: &'a str,
    x: i32,
    y: i32,
    style: MonoTextStyle<'a, BinaryColor>,
) -> Text<'a, MonoTextStyle<'a, BinaryColor>> {
    let text_style = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Top)
        .build();
    Text::with_text_style(text, Point::new(x, y), style, text_style)
}

/// Render the whole panel onto `display`.
///
/// Region boundaries scale with the display size; the fixed offsets inside each
/// region are tuned for 400x300.
pub fn draw_panel<D>(display: &mut D, data: &PanelData, icon_dir: &Path) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let size = display.bounding_box().size;
    let (width, height) = (size.width as i32, size.height as i32);
    let mid_x = width / 2;
    let mid_y = height * 160 / 300;

    // Grid
    Line::new(Point::new(mid_x, 20), Point::new(mid_x, height - 21))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 2))
        .draw(display)?;
    Line::new(Point::new(20, mid_y), Point::new(width - 21, mid_y))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(display)?;

    draw_weather_region(display, &data.days, icon_dir)?;
    draw_rain_region(display, data, icon_dir, mid_x)?;
    draw_tide_region(display, &data.tide, data.now.offset(), icon_dir, mid_y)?;
    draw_date_region(display, data.now, mid_x, width, mid_y)?;

    Ok(())
}

fn draw_weather_region<D>(
    display: &mut D,
    days: &[DaySummary],
    icon_dir: &Path,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let label_style = MonoTextStyle::new(&FONT_9X15_BOLD, BinaryColor::On);
    let temp_style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
    let small_style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);

    for (i, day) in days.iter().take(3).enumerate() {
        let y = 22 + i as i32 * DAY_ROW_HEIGHT;

        let icon = icon_for_code(day.condition_code);
        draw_icon_or_placeholder(display, icon_dir, icon, Point::new(22, y))?;

        top_left_text(&day.label, 68, y, label_style).draw(display)?;

        let temps = format_temps(day);
        top_left_text(&temps, 110, y, temp_style).draw(display)?;

        let extras = format!(
            "W{:.0} R{:.0}",
            day.wind_representative, day.precipitation_total
        );
        top_left_text(&extras, 68, y + 24, small_style).draw(display)?;
    }
    Ok(())
}

fn draw_rain_region<D>(
    display: &mut D,
    data: &PanelData,
    icon_dir: &Path,
    left: i32,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let header_style = MonoTextStyle::new(&FONT_9X15_BOLD, BinaryColor::On);
    let row_style = MonoTextStyle::new(&FONT_7X13, BinaryColor::On);
    let small_style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    let x = left + 22;

    top_left_text("Rain", x + 48, 25, header_style).draw(display)?;
    draw_icon_or_placeholder(display, icon_dir, "rain", Point::new(x, 22))?;

    if data.rain.is_empty() {
        top_left_text("No data", x, 70, row_style).draw(display)?;
    }
    for (i, slot) in data.rain.iter().enumerate() {
        let line = format!("{} {:.1}mm", slot.label, slot.millimetres);
        top_left_text(&line, x, 70 + i as i32 * 18, row_style).draw(display)?;
    }

    // Today's outlook in words, clipped to the region width
    if let Some(today) = data.days.first().filter(|d| !d.is_unavailable()) {
        let outlook = clip(&classify(today.condition_code), 28);
        top_left_text(&outlook, x, 130, small_style).draw(display)?;
    }
    Ok(())
}

fn draw_tide_region<D>(
    display: &mut D,
    tide: &TideTurns,
    offset: &FixedOffset,
    icon_dir: &Path,
    top: i32,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let row_style = MonoTextStyle::new(&FONT_7X13, BinaryColor::On);
    let label_style = MonoTextStyle::new(&FONT_9X15_BOLD, BinaryColor::On);

    let icon = tide_icon(tide.direction);
    draw_icon_or_placeholder(display, icon_dir, icon, Point::new(22, top + 8))?;

    let last = format!("Last: {}", format_turn(tide.last.as_ref(), offset));
    let next = format!("Next: {}", format_turn(tide.next.as_ref(), offset));
    // 7px glyphs; keep clear of the vertical divider
    top_left_text(&clip(&last, 18), 68, top + 10, row_style).draw(display)?;
    top_left_text(&clip(&next, 18), 68, top + 30, row_style).draw(display)?;

    top_left_text(tide.direction.label(), 22, top + 58, label_style).draw(display)?;
    Ok(())
}

fn draw_date_region<D>(
    display: &mut D,
    now: DateTime<FixedOffset>,
    left: i32,
    right: i32,
    top: i32,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let big_style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
    let small_style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    let center = (left + right) / 2;

    let date = now.format("%a %d/%m/%y").to_string();
    centered_text(&date, center, top + 12, big_style).draw(display)?;

    let updated = format!("Updated: {}", now.format("%H:%M"));
    centered_text(&updated, center, top + 45, small_style).draw(display)?;
    Ok(())
}

/// Build the ASCII version of the panel.
pub fn format_ascii(data: &PanelData) -> String {
    let offset = data.now.offset();
    let mut out = String::new();

    out.push_str(&format!("{}\n", data.now.format("%a %d/%m/%y  Updated: %H:%M")));
    out.push_str(&"─".repeat(40));
    out.push('\n');

    for day in &data.days {
        out.push_str(&format!(
            "{:<4} {:>7}  W{:<3.0} R{:<4.1} {}\n",
            day.label,
            format_temps(day),
            day.wind_representative,
            day.precipitation_total,
            if day.is_unavailable() {
                "unavailable".to_string()
            } else {
                classify(day.condition_code)
            }
        ));
    }

    out.push_str(&"─".repeat(40));
    out.push('\n');
    out.push_str("Rain:");
    if data.rain.is_empty() {
        out.push_str(" no data");
    }
    for slot in &data.rain {
        out.push_str(&format!("  {} {:.1}mm", slot.label, slot.millimetres));
    }
    out.push('\n');

    out.push_str(&"─".repeat(40));
    out.push('\n');
    out.push_str(&format!("Tide: {}\n", data.tide.direction.label()));
    out.push_str(&format!("  Last: {}\n", format_turn(data.tide.last.as_ref(), offset)));
    out.push_str(&format!("  Next: {}\n", format_turn(data.tide.next.as_ref(), offset)));
    out
}

/// Render the panel to the terminal.
pub fn draw_ascii(data: &PanelData) {
    print!("{}", format_ascii(data));
}
