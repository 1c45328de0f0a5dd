//! Time and timestamp helpers.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// UTC timestamp used for `last_seen`, event times, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Whether something last observed at `seen` is older than `timeout` at `now`.
///
/// Observations from the future (clock skew) are never stale.
#[must_use]
pub fn is_stale(seen: Timestamp, now: Timestamp, timeout: Duration) -> bool {
    (now - seen).to_std().is_ok_and(|age| age > timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_report_stale_when_age_exceeds_timeout() {
        let now = now();
        let seen = now - chrono::Duration::seconds(61);
        assert!(is_stale(seen, now, Duration::from_secs(60)));
    }

    #[test]
    fn should_not_report_stale_at_exact_timeout() {
        let now = now();
        let seen = now - chrono::Duration::seconds(60);
        assert!(!is_stale(seen, now, Duration::from_secs(60)));
    }

    #[test]
    fn should_not_report_stale_when_seen_in_the_future() {
        let now = now();
        let seen = now + chrono::Duration::seconds(5);
        assert!(!is_stale(seen, now, Duration::ZERO));
    }
}
