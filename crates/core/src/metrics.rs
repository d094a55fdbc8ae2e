//! Parsing of loosely formatted performance figures scraped from the
//! registration lookup site.
//!
//! Scraped text arrives as `"510 bhp"`, `"55 kW / 75 HP / 99 BHP"`,
//! `"156 mph"` or `"3.8 seconds"`. A parse failure is never an error: the
//! `parse_*` functions return `None`, and the `*_rank` helpers resolve
//! failures to a fallback that ranks the value last in a superlative.

// ---------------------------------------------------------------------------
// Ranking fallbacks
// ---------------------------------------------------------------------------

/// Rank used for a missing or unparseable top speed. Sorts as the slowest.
pub const TOP_SPEED_FALLBACK: u32 = 0;

/// Rank used for a missing or unparseable 0-60 time. Sorts as the slowest.
pub const ZERO_TO_SIXTY_FALLBACK: f64 = 999.0;

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

/// Parse a power figure in brake horsepower.
///
/// Multi-unit strings are slash separated and the last segment is taken
/// as the BHP figure.
///
/// ```
/// use spotted_core::metrics::parse_power;
///
/// assert_eq!(parse_power("55 kW / 75 HP / 99 BHP"), Some(99));
/// assert_eq!(parse_power("510 bhp"), Some(510));
/// assert_eq!(parse_power("abc"), None);
/// ```
pub fn parse_power(text: &str) -> Option<u32> {
    let segment = text.rsplit('/').next().unwrap_or(text).trim();
    let number = segment
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .trim()
        .replace(',', "");
    number.parse::<u32>().ok()
}

/// Parse a top speed in mph, e.g. `"156 mph"`.
pub fn parse_top_speed(text: &str) -> Option<u32> {
    strip_unit(text, "mph").parse::<u32>().ok()
}

/// Parse a 0-60 mph time in seconds, e.g. `"3.8 seconds"`.
pub fn parse_zero_to_sixty(text: &str) -> Option<f64> {
    strip_unit(text, "seconds")
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
}

// ---------------------------------------------------------------------------
// Ranking keys
// ---------------------------------------------------------------------------

/// Top speed ranking key. Missing or unparseable values rank as
/// [`TOP_SPEED_FALLBACK`].
pub fn top_speed_rank(text: Option<&str>) -> u32 {
    text.and_then(parse_top_speed).unwrap_or(TOP_SPEED_FALLBACK)
}

/// 0-60 ranking key. Missing or unparseable values rank as
/// [`ZERO_TO_SIXTY_FALLBACK`].
pub fn zero_to_sixty_rank(text: Option<&str>) -> f64 {
    text.and_then(parse_zero_to_sixty)
        .unwrap_or(ZERO_TO_SIXTY_FALLBACK)
}

/// Trim `text` and remove a trailing `unit`, compared case-insensitively.
fn strip_unit<'a>(text: &'a str, unit: &str) -> &'a str {
    let trimmed = text.trim();
    let Some(split) = trimmed.len().checked_sub(unit.len()) else {
        return trimmed;
    };
    if trimmed.is_char_boundary(split) && trimmed[split..].eq_ignore_ascii_case(unit) {
        trimmed[..split].trim_end()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- parse_power --

    #[test]
    fn power_takes_last_segment_of_multi_unit_string() {
        assert_eq!(parse_power("55 kW / 75 HP / 99 BHP"), Some(99));
    }

    #[test]
    fn power_single_value_any_case() {
        assert_eq!(parse_power("510 bhp"), Some(510));
        assert_eq!(parse_power("700 BHP"), Some(700));
        assert_eq!(parse_power("  620bhp "), Some(620));
    }

    #[test]
    fn power_accepts_thousands_separator() {
        assert_eq!(parse_power("1,001 bhp"), Some(1001));
    }

    #[test]
    fn power_unparseable_is_none() {
        assert_eq!(parse_power("abc"), None);
        assert_eq!(parse_power(""), None);
        assert_eq!(parse_power("55 kW / n/a"), None);
    }

    // -- parse_top_speed --

    #[test]
    fn top_speed_strips_mph_case_insensitively() {
        assert_eq!(parse_top_speed("156 mph"), Some(156));
        assert_eq!(parse_top_speed("205 MPH"), Some(205));
        assert_eq!(parse_top_speed("99"), Some(99));
    }

    #[test]
    fn top_speed_unparseable_is_none() {
        assert_eq!(parse_top_speed("fast"), None);
        assert_eq!(parse_top_speed("mph"), None);
    }

    #[test]
    fn top_speed_does_not_panic_on_multibyte_text() {
        assert_eq!(parse_top_speed("ünknöwn"), None);
        assert_eq!(parse_top_speed("é"), None);
    }

    // -- parse_zero_to_sixty --

    #[test]
    fn zero_to_sixty_parses_decimal_seconds() {
        assert_eq!(parse_zero_to_sixty("3.8 seconds"), Some(3.8));
        assert_eq!(parse_zero_to_sixty("10 Seconds"), Some(10.0));
    }

    #[test]
    fn zero_to_sixty_rejects_garbage_and_non_finite() {
        assert_eq!(parse_zero_to_sixty("quick"), None);
        assert_eq!(parse_zero_to_sixty("inf seconds"), None);
        assert_eq!(parse_zero_to_sixty("NaN"), None);
    }

    // -- ranking fallbacks --

    #[test]
    fn speed_failure_ranks_as_smallest() {
        assert_eq!(top_speed_rank(None), TOP_SPEED_FALLBACK);
        assert_eq!(top_speed_rank(Some("n/a")), TOP_SPEED_FALLBACK);
        assert_eq!(top_speed_rank(Some("155 mph")), 155);
    }

    #[test]
    fn acceleration_failure_ranks_as_largest() {
        assert_eq!(zero_to_sixty_rank(None), ZERO_TO_SIXTY_FALLBACK);
        assert_eq!(zero_to_sixty_rank(Some("n/a")), ZERO_TO_SIXTY_FALLBACK);
        assert_eq!(zero_to_sixty_rank(Some("4.1 seconds")), 4.1);
    }
}
