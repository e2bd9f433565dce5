//! WMO weather code interpretation.
//!
//! See <https://open-meteo.com/en/docs> for the code reference.

/// Known WMO codes and their descriptions, ordered by code.
const WMO_CODES: &[(i32, &str)] = &[
    (0, "Clear sky"),
    (1, "Mainly clear"),
    (2, "Partly cloudy"),
    (3, "Overcast"),
    (45, "Fog"),
    (48, "Depositing rime fog"),
    (51, "Light drizzle"),
    (53, "Moderate drizzle"),
    (55, "Dense drizzle"),
    (56, "Light freezing drizzle"),
    (57, "Dense freezing drizzle"),
    (61, "Slight rain"),
    (63, "Moderate rain"),
    (65, "Heavy rain"),
    (66, "Light freezing rain"),
    (67, "Heavy freezing rain"),
    (71, "Slight snow"),
    (73, "Moderate snow"),
    (75, "Heavy snow"),
    (77, "Snow grains"),
    (80, "Slight rain showers"),
    (81, "Moderate rain showers"),
    (82, "Violent rain showers"),
    (85, "Slight snow showers"),
    (86, "Heavy snow showers"),
    (95, "Thunderstorm"),
    (96, "Thunderstorm with slight hail"),
    (99, "Thunderstorm with heavy hail"),
];

/// Code used for a slot that reported no condition at all. Outside the WMO range,
/// so it classifies as unknown.
pub const UNREPORTED_CODE: i32 = 999;

/// Human-readable description for a WMO code.
///
/// Unknown codes keep the number in the text so they show up in logs and on screen.
///
/// # Example
/// ```
/// use weather_panel_lib::condition::classify;
///
/// assert_eq!(classify(95), "Thunderstorm");
/// assert_eq!(classify(12345), "Unknown (code: 12345)");
/// ```
pub fn classify(code: i32) -> String {
    WMO_CODES
        .binary_search_by_key(&code, |&(known, _)| known)
        .map(|idx| WMO_CODES[idx].1.to_string())
        .unwrap_or_else(|_| format!("Unknown (code: {code})"))
}

/// Icon file stem (under the configured icon directory) for a WMO code.
pub fn icon_for_code(code: i32) -> &'static str {
    match code {
        0 | 1 => "sunny",
        2 => "partly",
        3 => "cloudy",
        45 | 48 => "fog",
        51..=67 | 80..=82 => "rain",
        71..=77 | 85 | 86 => "snow",
        95..=99 => "storm",
        _ => "cloudy",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_for_binary_search() {
        assert!(WMO_CODES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(classify(0), "Clear sky");
        assert_eq!(classify(48), "Depositing rime fog");
        assert_eq!(classify(65), "Heavy rain");
        assert_eq!(classify(95), "Thunderstorm");
        assert_eq!(classify(99), "Thunderstorm with heavy hail");
    }

    #[test]
    fn test_unknown_code_keeps_number() {
        let text = classify(12345);
        assert!(text.contains("12345"), "got {text}");
        assert!(classify(-1).contains("-1"));
    }

    #[test]
    fn test_classify_is_total_at_extremes() {
        assert!(classify(i32::MIN).contains(&i32::MIN.to_string()));
        assert!(classify(i32::MAX).contains(&i32::MAX.to_string()));
    }

    #[test]
    fn test_icon_mapping() {
        assert_eq!(icon_for_code(0), "sunny");
        assert_eq!(icon_for_code(2), "partly");
        assert_eq!(icon_for_code(45), "fog");
        assert_eq!(icon_for_code(63), "rain");
        assert_eq!(icon_for_code(81), "rain");
        assert_eq!(icon_for_code(86), "snow");
        assert_eq!(icon_for_code(96), "storm");
        assert_eq!(icon_for_code(-1), "cloudy");
    }
}
