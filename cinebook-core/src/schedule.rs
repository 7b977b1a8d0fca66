use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::movie::Showtime;

/// Tolerance window for instant-based showtime matching.
///
/// Showtime labels cross several serialization boundaries (URL encoding,
/// Date stringification, locale formatting), so a small skew between the
/// client's token and the stored label is normal. The window is one
/// explicit configuration value; 60 seconds is the default policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchTolerance(Duration);

impl MatchTolerance {
    pub fn from_seconds(seconds: u64) -> Self {
        Self(Duration::seconds(seconds.min(i64::MAX as u64) as i64))
    }

    pub fn window(&self) -> Duration {
        self.0
    }
}

impl Default for MatchTolerance {
    fn default() -> Self {
        Self::from_seconds(60)
    }
}

/// Parse a showtime label as a timestamp, tolerating the formats clients
/// actually send: RFC 3339 with an offset or `Z` marker, and the naive
/// `YYYY-MM-DDTHH:MM:SS` form (taken as UTC). Humanized labels like
/// `7:30 PM` do not parse and only match exactly.
pub fn parse_instant(label: &str) -> Option<DateTime<Utc>> {
    let s = label.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    None
}

/// Find the showtime a client-supplied token refers to.
///
/// 1. Exact string match against the stored label.
/// 2. If both sides parse as timestamps, equal UTC instants match.
/// 3. Otherwise a stored label within `tolerance` of the token matches.
///
/// Returns `None` when nothing matches; callers surface the list of valid
/// labels so the client can self-correct.
pub fn resolve_showtime<'a>(
    showtimes: &'a [Showtime],
    token: &str,
    tolerance: MatchTolerance,
) -> Option<&'a Showtime> {
    let key = token.trim();

    if let Some(showtime) = showtimes.iter().find(|st| st.label.trim() == key) {
        return Some(showtime);
    }

    let target = parse_instant(key)?;

    if let Some(showtime) = showtimes
        .iter()
        .find(|st| parse_instant(&st.label) == Some(target))
    {
        return Some(showtime);
    }

    showtimes.iter().find(|st| {
        parse_instant(&st.label)
            .map(|instant| (instant - target).abs() <= tolerance.window())
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn showtimes(labels: &[&str]) -> Vec<Showtime> {
        labels.iter().map(|l| Showtime::new(*l)).collect()
    }

    #[test]
    fn test_exact_label_match() {
        let sts = showtimes(&["7:30 PM", "9:45 PM"]);
        let found = resolve_showtime(&sts, "  7:30 PM ", MatchTolerance::default()).unwrap();
        assert_eq!(found.label, "7:30 PM");
    }

    #[test]
    fn test_humanized_label_never_matches_by_instant() {
        let sts = showtimes(&["7:30 PM"]);
        assert!(resolve_showtime(&sts, "2025-10-28T19:30:00", MatchTolerance::default()).is_none());
    }

    #[test]
    fn test_equal_instants_match_across_zone_markers() {
        let sts = showtimes(&["2025-10-28T13:30:00"]);
        let found =
            resolve_showtime(&sts, "2025-10-28T13:30:00Z", MatchTolerance::default()).unwrap();
        assert_eq!(found.label, "2025-10-28T13:30:00");

        let offset = resolve_showtime(&sts, "2025-10-28T15:30:00+02:00", MatchTolerance::default())
            .unwrap();
        assert_eq!(offset.label, "2025-10-28T13:30:00");
    }

    #[test]
    fn test_thirty_second_skew_within_default_tolerance() {
        let sts = showtimes(&["2025-10-28T13:30:00"]);
        let found =
            resolve_showtime(&sts, "2025-10-28T13:30:30", MatchTolerance::default()).unwrap();
        assert_eq!(found.label, "2025-10-28T13:30:00");
    }

    #[test]
    fn test_ninety_second_skew_rejected_by_default_tolerance() {
        let sts = showtimes(&["2025-10-28T13:30:00"]);
        assert!(resolve_showtime(&sts, "2025-10-28T13:31:30", MatchTolerance::default()).is_none());
    }

    #[test]
    fn test_tolerance_is_configurable() {
        let sts = showtimes(&["2025-10-28T13:30:00"]);
        let wide = MatchTolerance::from_seconds(120);
        assert!(resolve_showtime(&sts, "2025-10-28T13:31:30", wide).is_some());

        let none = MatchTolerance::from_seconds(0);
        assert!(resolve_showtime(&sts, "2025-10-28T13:30:01", none).is_none());
        // Zero tolerance still matches equal instants.
        assert!(resolve_showtime(&sts, "2025-10-28T13:30:00Z", none).is_some());
    }

    #[test]
    fn test_unparseable_token_with_no_exact_match() {
        let sts = showtimes(&["2025-10-28T13:30:00"]);
        assert!(resolve_showtime(&sts, "half past seven", MatchTolerance::default()).is_none());
    }
}
