//! Tide turn selection around the current instant.

use crate::{TideDirection, TideExtreme, TideKind};
use chrono::{DateTime, Utc};

/// The tide extremes either side of "now".
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TideTurns {
    /// Latest extreme at or before now
    pub last: Option<TideExtreme>,
    /// Earliest extreme strictly after now
    pub next: Option<TideExtreme>,
    pub direction: TideDirection,
}

/// Pick the last and next tide turns from extremes sorted ascending by time.
///
/// The direction follows the upcoming extreme: heading to high water is incoming,
/// heading to low water is outgoing.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use weather_panel_lib::{tide::select_tide_turns, TideDirection};
///
/// let turns = select_tide_turns(&[], Utc.with_ymd_and_hms(2026, 2, 16, 10, 0, 0).unwrap());
/// assert!(turns.last.is_none() && turns.next.is_none());
/// assert_eq!(turns.direction, TideDirection::Unknown);
/// ```
pub fn select_tide_turns(extremes: &[TideExtreme], now: DateTime<Utc>) -> TideTurns {
    let split = extremes.partition_point(|e| e.time_utc <= now);

    let last = split.checked_sub(1).map(|idx| extremes[idx]);
    let next = extremes.get(split).copied();

    let direction = match next.map(|e| e.kind) {
        Some(TideKind::High) => TideDirection::Incoming,
        Some(TideKind::Low) => TideDirection::Outgoing,
        None => TideDirection::Unknown,
    };

    TideTurns {
        last,
        next,
        direction,
    }
}
