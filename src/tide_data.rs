//! # Tide Extremes Fetching
//!
//! Pulls upcoming high/low water times from the Stormglass tide API or a tide table web
//! page, and hands them to
//! [`crate::tide::select_tide_turns`] as a clean, time-sorted list.
//!
//! ## Data Source
//!
//! ### Stormglass
//! - **URL**: `{base}/tide/extremes/point?lat=..&lng=..&start=..&end=..`
//! - **Auth**: API key in the `Authorization` header
//! - **Format**: JSON `data` array of `{time, type, height}` with ISO 8601 UTC times
//!
//! The request window starts a little before "now" so the panel can show the most
//! recent turn as well as the next one.
//!
//! ### Tide table page (e.g. tides4fishing)
//! - **URL**: configured `page_url`, plain GET
//! - **Format**: HTML table, one `<tr>` per extreme with the local clock time in a
//!   `td.hora` cell. The row itself names the extreme (class or cell text such as
//!   `pleamar`/`high`, `bajamar`/`low`); rows that don't are skipped
//! - **Times**: today's date in the configured offset
//!
//! ## Error Handling
//!
//! Transport and status failures propagate as [`TideError`]. Individual entries with
//! an unparseable time or an unrecognized type are dropped here, so the core never
//! sees malformed extremes.

use crate::config::{Config, TideProvider};
use crate::{TideExtreme, TideKind};
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Errors that can occur during tide data fetching.
#[derive(Error, Debug)]
pub enum TideError {
    /// No Stormglass API key configured
    #[error("no tide API key configured")]
    MissingApiKey,

    /// HTTP request failed (network, server, or protocol error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),

    /// Response body did not have the expected shape
    #[error("malformed tide response: {0}")]
    Parse(String),
}

/// How far back the request window reaches, so the last turn is known
const LOOKBACK_HOURS: i64 = 12;

/// Sent with page scrapes; some tide sites refuse the default client string
const USER_AGENT: &str = "Mozilla/5.0 (compatible; weather-panel/0.1)";

/// Words a table row uses to name high water
const HIGH_WORDS: &[&str] = &["high", "pleamar", "alta"];
/// Words a table row uses to name low water
const LOW_WORDS: &[&str] = &["low", "bajamar", "baja"];

/// A producer of tide extremes sorted ascending by time.
#[async_trait]
pub trait TideSource: Send + Sync {
    async fn fetch(&self, now: DateTime<Utc>) -> Result<Vec<TideExtreme>, TideError>;
}

/// Build the tide source selected in the configuration.
pub fn source_from_config(config: &Config) -> Result<Box<dyn TideSource>, TideError> {
    let source: Box<dyn TideSource> = match config.tide.provider {
        TideProvider::Stormglass => Box::new(StormglassClient::from_config(config)?),
        TideProvider::TideTable => Box::new(TideTableClient::new(
            config.tide.page_url.clone(),
            *Local::now().offset(),
            config.tide_timeout(),
        )?),
    };
    Ok(source)
}

/// Stormglass tide extremes client.
#[derive(Debug)]
pub struct StormglassClient {
    client: Client,
    base_url: String,
    api_key: String,
    latitude: f64,
    longitude: f64,
    hours_ahead: i64,
}

#[derive(Debug, Deserialize)]
struct ExtremesResponse {
    #[serde(default)]
    data: Vec<RawExtreme>,
}

#[derive(Debug, Deserialize)]
struct RawExtreme {
    time: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    height: Option<f64>,
}

impl StormglassClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        latitude: f64,
        longitude: f64,
        hours_ahead: i64,
        timeout: std::time::Duration,
    ) -> Result<Self, TideError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            latitude,
            longitude,
            hours_ahead,
        })
    }

    /// Build a client from the `[tide]` and `[location]` configuration sections.
    pub fn from_config(config: &Config) -> Result<Self, TideError> {
        let api_key = config
            .tide
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(TideError::MissingApiKey)?;
        Self::new(
            config.tide.base_url.clone(),
            api_key,
            config.location.latitude,
            config.location.longitude,
            config.tide.hours_ahead,
            config.tide_timeout(),
        )
    }
}

/// Keep well-formed extremes and sort them by time.
fn clean_extremes(raw: Vec<RawExtreme>) -> Vec<TideExtreme> {
    let mut extremes: Vec<TideExtreme> = raw
        .into_iter()
        .filter_map(|entry| {
            let kind = match entry.kind.to_ascii_lowercase().as_str() {
                "high" => TideKind::High,
                "low" => TideKind::Low,
                other => {
                    debug!(kind = other, "skipping tide entry with unknown type");
                    return None;
                }
            };
            let time_utc = match DateTime::parse_from_rfc3339(&entry.time) {
                Ok(time) => time.with_timezone(&Utc),
                Err(e) => {
                    debug!(time = %entry.time, "skipping tide entry with bad time: {e}");
                    return None;
                }
            };
            Some(TideExtreme {
                time_utc,
                kind,
                height_meters: entry.height,
            })
        })
        .collect();

    extremes.sort_by_key(|e| e.time_utc);
    extremes
}

#[async_trait]
impl TideSource for StormglassClient {
    #[instrument(skip(self), fields(lat = self.latitude, lng = self.longitude))]
    async fn fetch(&self, now: DateTime<Utc>) -> Result<Vec<TideExtreme>, TideError> {
        let start = now - Duration::hours(LOOKBACK_HOURS);
        let end = now + Duration::hours(self.hours_ahead);
        let url = format!("{}/tide/extremes/point", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.api_key)
            .query(&[
                ("lat", self.latitude.to_string()),
                ("lng", self.longitude.to_string()),
                ("start", start.timestamp().to_string()),
                ("end", end.timestamp().to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Stormglass request rejected");
            return Err(TideError::Status(response.status()));
        }

        let body: ExtremesResponse = response
            .json()
            .await
            .map_err(|e| TideError::Parse(e.to_string()))?;
        let extremes = clean_extremes(body.data);
        info!(count = extremes.len(), "fetched tide extremes");
        Ok(extremes)
    }
}

// -- Tide table page --

/// Tide table scraper for sites that publish the day's extremes as an HTML table.
#[derive(Debug)]
pub struct TideTableClient {
    client: Client,
    page_url: String,
    /// Offset the page's clock times are in
    offset: FixedOffset,
}

impl TideTableClient {
    pub fn new(
        page_url: impl Into<String>,
        offset: FixedOffset,
        timeout: std::time::Duration,
    ) -> Result<Self, TideError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            page_url: page_url.into(),
            offset,
        })
    }
}

fn selector(css: &str) -> Result<Selector, TideError> {
    Selector::parse(css).map_err(|e| TideError::Parse(format!("selector {css:?}: {e:?}")))
}

/// Lowercase alphabetic words, splitting on everything else.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// High or low, judged only from this row's class and cells.
fn row_kind<'a>(row: ElementRef<'a>, cells: &[ElementRef<'a>]) -> Option<TideKind> {
    let class = row.value().attr("class").unwrap_or_default();
    let cell_text = cells.iter().flat_map(|cell| cell.text());
    let tokens: Vec<String> = std::iter::once(class)
        .chain(cell_text)
        .flat_map(words)
        .collect();

    let high = tokens.iter().any(|t| HIGH_WORDS.contains(&t.as_str()));
    let low = tokens.iter().any(|t| LOW_WORDS.contains(&t.as_str()));
    match (high, low) {
        (true, false) => Some(TideKind::High),
        (false, true) => Some(TideKind::Low),
        _ => None,
    }
}

/// "4.6 m" / "4.6m" / "4.6"
fn parse_height(text: &str) -> Option<f64> {
    text.trim().trim_end_matches('m').trim().parse().ok()
}

/// Extract the extremes of a tide table page for `date`, times read in `offset`.
///
/// Rows without a `td.hora` cell are layout and are ignored; rows whose time or kind
/// can't be read are dropped. A page with no time cells at all is an error.
pub fn parse_tide_table(
    html: &str,
    date: NaiveDate,
    offset: FixedOffset,
) -> Result<Vec<TideExtreme>, TideError> {
    let doc = Html::parse_document(html);
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let time_sel = selector("td.hora")?;

    let mut saw_time_cell = false;
    let mut extremes = Vec::new();
    for row in doc.select(&row_sel) {
        let Some(time_cell) = row.select(&time_sel).next() else {
            continue;
        };
        saw_time_cell = true;

        let time_text: String = time_cell.text().collect();
        let clock = time_text.split_whitespace().next().unwrap_or_default();
        let Ok(time) = NaiveTime::parse_from_str(clock, "%H:%M") else {
            debug!(time = %time_text.trim(), "skipping tide row with bad time");
            continue;
        };

        let others: Vec<ElementRef> = row
            .select(&cell_sel)
            .filter(|cell| cell.id() != time_cell.id())
            .collect();
        let Some(kind) = row_kind(row, &others) else {
            debug!(%time, "skipping tide row without a high/low marker");
            continue;
        };

        let Some(local) = offset.from_local_datetime(&date.and_time(time)).single() else {
            continue;
        };
        let height_meters = others
            .iter()
            .find_map(|cell| parse_height(&cell.text().collect::<String>()));

        extremes.push(TideExtreme {
            time_utc: local.with_timezone(&Utc),
            kind,
            height_meters,
        });
    }

    if !saw_time_cell {
        return Err(TideError::Parse("no tide table rows found".into()));
    }
    extremes.sort_by_key(|e| e.time_utc);
    Ok(extremes)
}

#[async_trait]
impl TideSource for TideTableClient {
    #[instrument(skip(self), fields(url = %self.page_url))]
    async fn fetch(&self, now: DateTime<Utc>) -> Result<Vec<TideExtreme>, TideError> {
        let response = self.client.get(&self.page_url).send().await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "tide table request rejected");
            return Err(TideError::Status(response.status()));
        }

        let html = response.text().await?;
        let today = now.with_timezone(&self.offset).date_naive();
        let extremes = parse_tide_table(&html, today, self.offset)?;
        info!(count = extremes.len(), "scraped tide table");
        Ok(extremes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(time: &str, kind: &str, height: Option<f64>) -> RawExtreme {
        RawExtreme {
            time: time.to_string(),
            kind: kind.to_string(),
            height,
        }
    }

    #[test]
    fn test_clean_extremes_sorts_and_filters() {
        let cleaned = clean_extremes(vec![
            raw("2026-02-16T14:30:00+00:00", "high", Some(4.1)),
            raw("not a time", "low", None),
            raw("2026-02-16T08:00:00+00:00", "LOW", Some(0.6)),
            raw("2026-02-16T11:00:00+00:00", "slack", None),
            raw("2026-02-16T20:15:00Z", "low", None),
        ]);

        assert_eq!(cleaned.len(), 3);
        assert_eq!(cleaned[0].kind, TideKind::Low);
        assert_eq!(cleaned[0].height_meters, Some(0.6));
        assert_eq!(cleaned[1].kind, TideKind::High);
        assert_eq!(cleaned[2].height_meters, None);
        assert!(cleaned.windows(2).all(|w| w[0].time_utc <= w[1].time_utc));
    }

    const TABLE_PAGE: &str = r#"
<html><body>
  <p>Marea alta y baja en Limerick</p>
  <table class="tabla_mareas">
    <tr><th>Tide</th><th>Time</th><th>Height</th></tr>
    <tr class="marea bajamar">
      <td>Low tide</td><td class="hora">02:10</td><td class="altura">0.9 m</td>
    </tr>
    <tr class="marea pleamar">
      <td>High tide</td><td class="hora">08:25</td><td class="altura">4.6 m</td>
    </tr>
    <tr class="marea"><td>Coefficient</td><td class="hora">--</td><td>78</td></tr>
    <tr><td>Pleamar</td><td class="hora">20:55 h</td><td>4.4m</td></tr>
    <tr><td>Bajamar</td><td class="hora">14:40</td><td>1.1 m</td></tr>
    <tr><td>Sunset</td><td class="hora">18:02</td><td></td></tr>
  </table>
</body></html>"#;

    fn feb16() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 16).unwrap()
    }

    #[test]
    fn test_tide_table_kinds_come_from_each_row() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let extremes = parse_tide_table(TABLE_PAGE, feb16(), utc).unwrap();

        let summary: Vec<_> = extremes
            .iter()
            .map(|e| (e.time_utc.format("%H:%M").to_string(), e.kind, e.height_meters))
            .collect();
        assert_eq!(
            summary,
            [
                ("02:10".to_string(), TideKind::Low, Some(0.9)),
                ("08:25".to_string(), TideKind::High, Some(4.6)),
                ("14:40".to_string(), TideKind::Low, Some(1.1)),
                ("20:55".to_string(), TideKind::High, Some(4.4)),
            ]
        );
    }

    #[test]
    fn test_tide_table_times_use_page_offset() {
        let plus_one = FixedOffset::east_opt(3600).unwrap();
        let extremes = parse_tide_table(TABLE_PAGE, feb16(), plus_one).unwrap();
        assert_eq!(extremes[0].time_utc.to_rfc3339(), "2026-02-16T01:10:00+00:00");
    }

    #[test]
    fn test_tide_table_drops_ambiguous_rows() {
        let page = r#"<table>
            <tr><td>High/Low</td><td class="hora">09:00</td></tr>
            <tr class="pleamar"><td class="hora">15:00</td></tr>
        </table>"#;
        let extremes = parse_tide_table(page, feb16(), FixedOffset::east_opt(0).unwrap()).unwrap();

        assert_eq!(extremes.len(), 1);
        assert_eq!(extremes[0].kind, TideKind::High);
        assert_eq!(extremes[0].height_meters, None);
    }

    #[test]
    fn test_page_without_table_is_an_error() {
        let result = parse_tide_table(
            "<html><body>Service unavailable</body></html>",
            feb16(),
            FixedOffset::east_opt(0).unwrap(),
        );
        assert!(matches!(result, Err(TideError::Parse(_))));
    }

    #[test]
    fn test_source_from_config_picks_provider() {
        let mut config = Config::default();
        assert!(matches!(
            source_from_config(&config),
            Err(TideError::MissingApiKey)
        ));

        config.tide.provider = TideProvider::TideTable;
        assert!(source_from_config(&config).is_ok());
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = Config::default();
        assert!(matches!(
            StormglassClient::from_config(&config),
            Err(TideError::MissingApiKey)
        ));
    }
}
