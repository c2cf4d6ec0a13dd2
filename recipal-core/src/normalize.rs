//! Small normalization helpers shared by the scraper, the provider mapping
//! and the bulk importer.

use std::sync::LazyLock;

use regex::Regex;

/// ISO-8601 duration as used by schema.org (`PT1H30M`, `P0DT0H45M`, `PT90S`).
static ISO_DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^P(?:(\d+)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$")
        .expect("Invalid ISO duration regex")
});

/// Human-written durations ("1 hour 20 mins", "45 min", "2 hrs").
static HUMAN_DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(hours?|hrs?|h|minutes?|mins?|m)\b")
        .expect("Invalid human duration regex")
});

static FIRST_INTEGER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Invalid integer regex"));

/// Trim a string and drop it if nothing is left.
pub fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Like [`non_blank`] but for an optional owned value.
pub fn non_blank_opt(value: Option<String>) -> Option<String> {
    value.as_deref().and_then(non_blank)
}

/// Parse a duration into whole minutes.
///
/// Accepts ISO-8601 (`PT1H30M`) and loose human text (`1 hour 30 mins`).
/// Returns `None` for anything unparseable or for a zero duration.
pub fn parse_duration_minutes(value: &str) -> Option<i32> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let minutes = if let Some(cap) = ISO_DURATION_REGEX.captures(value) {
        let part = |i: usize| {
            cap.get(i)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0)
        };
        part(1) * 24.0 * 60.0 + part(2) * 60.0 + part(3) + part(4) / 60.0
    } else {
        let mut total = 0.0;
        for cap in HUMAN_DURATION_REGEX.captures_iter(value) {
            let amount: f64 = cap[1].parse().unwrap_or(0.0);
            let unit = cap[2].to_ascii_lowercase();
            if unit.starts_with('h') {
                total += amount * 60.0;
            } else {
                total += amount;
            }
        }
        if total == 0.0 {
            // Bare number means minutes ("45")
            value.parse::<f64>().unwrap_or(0.0)
        } else {
            total
        }
    };

    let rounded = minutes.round();
    if rounded >= 1.0 && rounded <= i32::MAX as f64 {
        Some(rounded as i32)
    } else {
        None
    }
}

/// Pull a serving count out of a yield string: the first integer wins
/// (`"4-6 servings"` -> 4, `"Makes 12 cookies"` -> 12).
pub fn extract_servings(value: &str) -> Option<i32> {
    FIRST_INTEGER_REGEX
        .find(value)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .filter(|n| *n > 0)
}

/// Total ready time: an explicit total wins, otherwise prep + cook when
/// at least one of them is known. A sum that overflows is dropped.
pub fn ready_in_minutes(total: Option<i32>, prep: Option<i32>, cook: Option<i32>) -> Option<i32> {
    total.or_else(|| match (prep, cook) {
        (None, None) => None,
        (p, c) => p.unwrap_or(0).checked_add(c.unwrap_or(0)),
    })
}

/// True for absolute http(s) URLs.
pub fn is_http_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}
