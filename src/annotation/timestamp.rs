//! Time reference resolution for audio citations
//!
//! Backend citations refer to positions in recordings in a few loose
//! formats (`"02:30"`, `"Time: 45s"`, `"1:02:03"`). Resolution never
//! fails: anything unrecognizable resolves to 0 seconds so rendering can
//! always continue.

/// Literal prefix used by the pipe citation form (`Time: 45s`)
pub const TIME_PREFIX: &str = "Time:";

/// Resolve a textual time reference to whole seconds
///
/// Accepted forms:
/// - `"MM:SS"` → `minutes * 60 + seconds`
/// - `"HH:MM:SS"` → `hours * 3600 + minutes * 60 + seconds`
/// - `"Time: Ns"` → `N` (also `"Time: MM:SS"`)
/// - `"N"` / `"Ns"` → `N`
///
/// # Returns
/// * Seconds, or 0 if the input is not a recognizable time reference
pub fn resolve(raw: &str) -> u64 {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix(TIME_PREFIX)
        .map(str::trim)
        .unwrap_or(trimmed);

    if body.contains(':') {
        return parse_clock(body).unwrap_or(0);
    }

    parse_seconds(body)
}

/// Parse `N` or `Ns` (surrounding whitespace allowed)
fn parse_seconds(s: &str) -> u64 {
    let s = s.trim();
    let s = s.strip_suffix('s').unwrap_or(s).trim();
    parse_digits(s).unwrap_or(0)
}

/// Parse `MM:SS` or `HH:MM:SS`
///
/// Returns `None` when the total does not fit in a `u64`.
fn parse_clock(s: &str) -> Option<u64> {
    let parts: Vec<&str> = s.split(':').collect();

    let (h, m, sec) = match parts.as_slice() {
        [m, sec] => (0, parse_digits(m)?, parse_digits(sec)?),
        [h, m, sec] => (parse_digits(h)?, parse_digits(m)?, parse_digits(sec)?),
        _ => return None,
    };

    h.checked_mul(3600)?
        .checked_add(m.checked_mul(60)?)?
        .checked_add(sec)
}

/// Parse a non-empty run of ASCII digits (no sign, no whitespace inside)
fn parse_digits(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Check if a token looks like a clock time (MM:SS or HH:MM:SS)
///
/// The leading part may have any number of digits (`100:00`); the parts
/// after it are capped at two.
fn is_clock_token(s: &str) -> bool {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return false;
    }
    let is_digits = |p: &str| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit());
    is_digits(parts[0]) && parts[1..].iter().all(|&p| p.len() <= 2 && is_digits(p))
}

/// Find a recognizable time token inside free text
///
/// Looks for a `Time:` reference first (the token runs to the end of the
/// text), then for the first whitespace-delimited clock token. Trailing
/// punctuation on a clock token is ignored.
///
/// # Returns
/// * The token slice, suitable for [`resolve`], or `None`
pub fn find_time_token(text: &str) -> Option<&str> {
    if let Some(pos) = text.find(TIME_PREFIX) {
        return Some(text[pos..].trim());
    }

    text.split_whitespace()
        .map(|word| word.trim_end_matches(|c: char| matches!(c, ',' | '.' | ';' | ')')))
        .find(|word| is_clock_token(word))
}

/// Format seconds as `M:SS` for display
pub fn format_timestamp(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_clock() {
        assert_eq!(resolve("02:30"), 150);
        assert_eq!(resolve("0:05"), 5);
        assert_eq!(resolve("1:02:03"), 3723);
    }

    #[test]
    fn test_resolve_time_prefix() {
        assert_eq!(resolve("Time: 45s"), 45);
        assert_eq!(resolve("Time:12s"), 12);
        assert_eq!(resolve("  Time: 7 s "), 7);
        assert_eq!(resolve("Time: 02:30"), 150);
    }

    #[test]
    fn test_resolve_plain_seconds() {
        assert_eq!(resolve("45"), 45);
        assert_eq!(resolve("45s"), 45);
    }

    #[test]
    fn test_resolve_garbage_is_zero() {
        assert_eq!(resolve("garbage"), 0);
        assert_eq!(resolve(""), 0);
        assert_eq!(resolve("ab:cd"), 0);
        assert_eq!(resolve("Time: soon"), 0);
        assert_eq!(resolve("-5"), 0);
        assert_eq!(resolve("1:2:3:4"), 0);
    }

    #[test]
    fn test_resolve_overflow_is_zero() {
        assert_eq!(resolve("999999999999999999:00"), 0);
        assert_eq!(resolve("Time: 999999999999999999:00"), 0);
        assert_eq!(resolve("9999999999999999:00:00"), 0);
        assert_eq!(resolve("18446744073709551615"), u64::MAX);
        assert_eq!(resolve("18446744073709551616"), 0);
    }

    #[test]
    fn test_find_time_token() {
        assert_eq!(find_time_token("Time: 45s"), Some("Time: 45s"));
        assert_eq!(find_time_token("said at 02:30, then"), Some("02:30"));
        assert_eq!(find_time_token("rec.mp3 at 100:00"), Some("100:00"));
        assert_eq!(find_time_token("at 1:100"), None);
        assert_eq!(find_time_token("Page: 3"), None);
        assert_eq!(find_time_token(""), None);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "0:00");
        assert_eq!(format_timestamp(45), "0:45");
        assert_eq!(format_timestamp(150), "2:30");
        assert_eq!(format_timestamp(3723), "62:03");
    }
}
