//! Simulated track-local time.

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime, Timelike, Utc};
use tokio::time::Instant;

const MILLIS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// Track-local date and time, advanced at `multiplier` times real time.
#[derive(Debug, Clone)]
pub struct SessionClock {
    start: NaiveDateTime,
    started_at: Instant,
    multiplier: f64,
    utc_offset: ChronoDuration,
}

impl SessionClock {
    pub fn new(start: NaiveDateTime, utc_offset_hours: f64, multiplier: f64, now: Instant) -> Self {
        SessionClock {
            start,
            started_at: now,
            multiplier: multiplier.max(0.0),
            utc_offset: ChronoDuration::milliseconds((utc_offset_hours * 3_600_000.0) as i64),
        }
    }

    /// Start at `seconds` past midnight of `date`, or of today at the track.
    pub fn fixed(
        date: Option<NaiveDate>,
        seconds: u32,
        utc_offset_hours: f64,
        multiplier: f64,
        now: Instant,
    ) -> Self {
        let offset = ChronoDuration::milliseconds((utc_offset_hours * 3_600_000.0) as i64);
        let date = date.unwrap_or_else(|| (Utc::now().naive_utc() + offset).date());
        let start = date.and_time(chrono::NaiveTime::MIN) + ChronoDuration::seconds(i64::from(seconds));
        Self::new(start, utc_offset_hours, multiplier, now)
    }

    /// Start at the current track-local time shifted by `offset_secs`.
    pub fn live(offset_secs: i64, utc_offset_hours: f64, multiplier: f64, now: Instant) -> Self {
        let offset = ChronoDuration::milliseconds((utc_offset_hours * 3_600_000.0) as i64);
        let track_now = Utc::now().naive_utc() + offset;
        let start = ChronoDuration::try_seconds(offset_secs)
            .and_then(|shift| track_now.checked_add_signed(shift))
            .unwrap_or(track_now);
        Self::new(start, utc_offset_hours, multiplier, now)
    }

    pub fn date_time(&self, now: Instant) -> NaiveDateTime {
        let real = now.saturating_duration_since(self.started_at).as_secs_f64();
        let millis = real * self.multiplier * 1000.0;
        let advanced = if millis.is_finite() && millis < i64::MAX as f64 {
            ChronoDuration::try_milliseconds(millis as i64)
                .and_then(|simulated| self.start.checked_add_signed(simulated))
        } else {
            None
        };
        // Past the calendar range only the time of day is kept.
        advanced.unwrap_or_else(|| {
            let wrapped = if millis.is_finite() {
                millis.rem_euclid(MILLIS_PER_DAY)
            } else {
                0.0
            };
            ChronoDuration::try_milliseconds(wrapped as i64)
                .and_then(|simulated| self.start.checked_add_signed(simulated))
                .unwrap_or(self.start)
        })
    }

    /// Seconds since the Unix epoch, in UTC.
    pub fn unix_timestamp(&self, now: Instant) -> u64 {
        self.date_time(now)
            .checked_sub_signed(self.utc_offset)
            .map_or(0, |utc| utc.and_utc().timestamp().max(0) as u64)
    }

    /// Track-local seconds past midnight, rounded to whole seconds.
    pub fn seconds_of_day(&self, now: Instant) -> f64 {
        let time = self.date_time(now).time();
        let fraction = f64::from(time.nanosecond()) / 1e9;
        (f64::from(time.num_seconds_from_midnight()) + fraction).round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn advances_with_multiplier() {
        let t0 = Instant::now();
        let clock = SessionClock::new(noon(), 0.0, 4.0, t0);
        let later = clock.date_time(t0 + Duration::from_secs(900));
        assert_eq!(later, noon() + ChronoDuration::hours(1));
        assert_eq!(clock.seconds_of_day(t0 + Duration::from_secs(900)), 13.0 * 3600.0);
    }

    #[test]
    fn timestamp_is_utc() {
        let t0 = Instant::now();
        let local = SessionClock::new(noon(), 2.0, 1.0, t0);
        let utc = SessionClock::new(noon(), 0.0, 1.0, t0);
        assert_eq!(utc.unix_timestamp(t0) - local.unix_timestamp(t0), 7200);
        assert_eq!(utc.unix_timestamp(t0), 1_718_452_800);
    }

    #[test]
    fn fixed_start_uses_seconds_of_day() {
        let t0 = Instant::now();
        let date = NaiveDate::from_ymd_opt(2024, 6, 15);
        let clock = SessionClock::fixed(date, 8 * 3600 + 30 * 60, 1.0, 1.0, t0);
        assert_eq!(clock.seconds_of_day(t0), 8.5 * 3600.0);
        assert_eq!(clock.date_time(t0).date(), NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
    }

    #[test]
    fn wraps_past_midnight() {
        let t0 = Instant::now();
        let date = NaiveDate::from_ymd_opt(2024, 6, 15);
        let clock = SessionClock::fixed(date, 23 * 3600, 0.0, 60.0, t0);
        // One real minute is one simulated hour.
        assert_eq!(clock.seconds_of_day(t0 + Duration::from_secs(90)), 30.0 * 60.0);
    }

    #[test]
    fn seconds_of_day_rounds() {
        let t0 = Instant::now();
        let clock = SessionClock::new(noon(), 0.0, 1.0, t0);
        assert_eq!(clock.seconds_of_day(t0 + Duration::from_millis(1600)), 12.0 * 3600.0 + 2.0);
        assert_eq!(clock.seconds_of_day(t0 + Duration::from_millis(1400)), 12.0 * 3600.0 + 1.0);
    }

    #[test]
    fn huge_multiplier_does_not_overflow() {
        let t0 = Instant::now();
        for multiplier in [1e300, f64::MAX, f64::INFINITY] {
            let clock = SessionClock::new(noon(), 0.0, multiplier, t0);
            let later = t0 + Duration::from_millis(500);
            let seconds = clock.seconds_of_day(later);
            assert!((0.0..=86_400.0).contains(&seconds), "{multiplier}: {seconds}");
            assert!(clock.unix_timestamp(later) > 0);
        }
    }

    #[test]
    fn frozen_clock() {
        let t0 = Instant::now();
        let clock = SessionClock::new(noon(), 0.0, 0.0, t0);
        assert_eq!(clock.date_time(t0 + Duration::from_secs(3600)), noon());
    }
}
