use std::ops::RangeInclusive;

use chrono::Duration;

/// The number of days a session may be configured to last
pub const SESSION_DAYS: RangeInclusive<i64> = 1..=3650;

/// The configuration of the ledger
#[derive(Debug, Clone)]
pub struct Config {
    /// How many days a login session stays valid, kept within [SESSION_DAYS]
    pub session_duration_in_days: i64,
    /// Seats given to an event when none, or something that isn't a number, is supplied
    pub default_max_seats: i64,
}

impl Config {
    pub fn session_duration(&self) -> Duration {
        let days = self
            .session_duration_in_days
            .clamp(*SESSION_DAYS.start(), *SESSION_DAYS.end());

        Duration::days(days)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_duration_in_days: 7,
            default_max_seats: 100,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn with_days(session_duration_in_days: i64) -> Config {
        Config {
            session_duration_in_days,
            ..Config::default()
        }
    }

    #[test]
    fn session_duration_stays_in_range() {
        assert_eq!(with_days(7).session_duration(), Duration::days(7));
        assert_eq!(with_days(0).session_duration(), Duration::days(1));
        assert_eq!(with_days(-30).session_duration(), Duration::days(1));
        assert_eq!(
            with_days(1_000_000_000_000).session_duration(),
            Duration::days(3650)
        );
    }
}
