//! Drift-free countdown anchored to an absolute end timestamp.
//!
//! The remaining time is never decremented. Each tick recomputes it from the
//! end timestamp, so delayed, coalesced or skipped ticks (a suspended host, a
//! backgrounded window) cannot make the displayed value drift.

use chrono::{DateTime, Duration, Utc};

/// Result of evaluating a countdown at a point in time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Not armed; nothing to report
    Idle,
    /// Still running with this many whole seconds left
    Running { remaining_secs: u64 },
    /// Reached zero on this tick. Reported exactly once per arming.
    Expired,
}

/// A single-shot countdown
#[derive(Clone, Debug, Default)]
pub struct Countdown {
    end_at: Option<DateTime<Utc>>,
    duration_secs: u64,
    /// Last displayed value. Only ever decreases while armed.
    remaining_secs: u64,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the countdown for `duration_secs` starting at `now`.
    ///
    /// Arming an already armed countdown replaces the pending arming
    /// (last-arm-wins): the previous end timestamp is discarded and will never
    /// report `Expired`. Returns the initial remaining value, which always
    /// equals `duration_secs`.
    ///
    /// A duration past the calendar range saturates at the latest
    /// representable instant instead of overflowing.
    pub fn arm(&mut self, duration_secs: u64, now: DateTime<Utc>) -> u64 {
        if let Some(previous_end) = self.end_at {
            tracing::debug!(
                "Re-arming countdown; discarding pending end at {}",
                previous_end
            );
        }
        let end_at = i64::try_from(duration_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.end_at = Some(end_at);
        self.duration_secs = duration_secs;
        self.remaining_secs = duration_secs;
        duration_secs
    }

    /// Stop recomputation. The last displayed value is kept.
    pub fn cancel(&mut self) {
        self.end_at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.end_at.is_some()
    }

    /// Recompute the remaining time at `now`.
    ///
    /// The first tick that sees `round((end - now) / 1s) <= 0` disarms the
    /// countdown and returns `Expired`. Rearming is the caller's job.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        let Some(end_at) = self.end_at else {
            return Tick::Idle;
        };

        let recomputed = rounded_secs_until(end_at, now);
        if recomputed <= 0 {
            self.end_at = None;
            self.remaining_secs = 0;
            return Tick::Expired;
        }

        let recomputed = recomputed as u64;
        if recomputed > self.remaining_secs {
            // Wall clock moved backwards. Hold the last value instead of
            // showing a countdown that climbs.
            tracing::warn!(
                "Clock regression: remaining {}s exceeds last observed {}s; clamping",
                recomputed,
                self.remaining_secs
            );
        } else {
            self.remaining_secs = recomputed;
        }

        Tick::Running {
            remaining_secs: self.remaining_secs,
        }
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    /// Duration this countdown was last armed with
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn end_at(&self) -> Option<DateTime<Utc>> {
        self.end_at
    }
}

/// Whole seconds until `end_at`, rounded half up
fn rounded_secs_until(end_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (end_at - now).num_milliseconds();
    (millis + 500).div_euclid(1000)
}

/// Format a number of seconds as MM:SS
pub fn format_mmss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use proptest::prelude::*;

    fn step(countdown: &mut Countdown, clock: &ManualClock, millis: i64) -> Tick {
        clock.advance_millis(millis);
        countdown.tick(clock.now())
    }

    #[test]
    fn test_arm_reports_full_duration() {
        let clock = ManualClock::default();
        let mut countdown = Countdown::new();

        assert_eq!(countdown.arm(90, clock.now()), 90);
        assert_eq!(countdown.remaining_secs(), 90);
        assert!(countdown.is_armed());
        assert_eq!(
            countdown.end_at(),
            Some(clock.now() + Duration::seconds(90))
        );
    }

    #[test]
    fn test_arm_saturates_huge_durations() {
        let clock = ManualClock::default();
        let mut countdown = Countdown::new();

        assert_eq!(countdown.arm(u64::MAX, clock.now()), u64::MAX);
        assert_eq!(countdown.end_at(), Some(DateTime::<Utc>::MAX_UTC));
        assert!(matches!(step(&mut countdown, &clock, 1_000), Tick::Running { .. }));

        countdown.arm(100_000_000_000_000, clock.now());
        assert_eq!(countdown.end_at(), Some(DateTime::<Utc>::MAX_UTC));
        assert!(matches!(step(&mut countdown, &clock, 1_000), Tick::Running { .. }));
    }

    #[test]
    fn test_remaining_is_recomputed_after_a_stall() {
        let clock = ManualClock::default();
        let mut countdown = Countdown::new();
        countdown.arm(60, clock.now());

        // One late tick after 25 seconds of silence
        let tick = step(&mut countdown, &clock, 25_000);
        assert_eq!(tick, Tick::Running { remaining_secs: 35 });
    }

    #[test]
    fn test_expires_once_and_stays_disarmed() {
        let clock = ManualClock::default();
        let mut countdown = Countdown::new();
        countdown.arm(2, clock.now());

        assert_eq!(step(&mut countdown, &clock, 1_000), Tick::Running { remaining_secs: 1 });
        assert_eq!(step(&mut countdown, &clock, 1_000), Tick::Expired);
        assert_eq!(step(&mut countdown, &clock, 1_000), Tick::Idle);
        assert!(!countdown.is_armed());
        assert_eq!(countdown.remaining_secs(), 0);
    }

    #[test]
    fn test_rounds_half_up() {
        let clock = ManualClock::default();
        let mut countdown = Countdown::new();
        countdown.arm(1, clock.now());

        // 500ms left still shows one second
        assert_eq!(step(&mut countdown, &clock, 500), Tick::Running { remaining_secs: 1 });
        // 499ms left rounds to zero and expires
        assert_eq!(step(&mut countdown, &clock, 1), Tick::Expired);
    }

    #[test]
    fn test_rearm_discards_previous_arming() {
        let clock = ManualClock::default();
        let mut countdown = Countdown::new();
        countdown.arm(5, clock.now());
        clock.advance_secs(3);
        countdown.arm(10, clock.now());

        // The first arming would have expired here
        assert_eq!(step(&mut countdown, &clock, 2_000), Tick::Running { remaining_secs: 8 });
        assert_eq!(countdown.duration_secs(), 10);
    }

    #[test]
    fn test_cancel_prevents_expiry() {
        let clock = ManualClock::default();
        let mut countdown = Countdown::new();
        countdown.arm(3, clock.now());
        step(&mut countdown, &clock, 1_000);

        countdown.cancel();

        assert_eq!(step(&mut countdown, &clock, 10_000), Tick::Idle);
        assert_eq!(countdown.remaining_secs(), 2);
    }

    #[test]
    fn test_clock_regression_is_clamped() {
        let clock = ManualClock::default();
        let mut countdown = Countdown::new();
        countdown.arm(60, clock.now());
        step(&mut countdown, &clock, 30_000);

        // System clock set back by two minutes
        let tick = step(&mut countdown, &clock, -120_000);
        assert_eq!(tick, Tick::Running { remaining_secs: 30 });

        // Once real time catches up the display moves again
        let tick = step(&mut countdown, &clock, 125_000);
        assert_eq!(tick, Tick::Running { remaining_secs: 25 });
    }

    #[test]
    fn test_format_mmss() {
        assert_eq!(format_mmss(0), "00:00");
        assert_eq!(format_mmss(59), "00:59");
        assert_eq!(format_mmss(600), "10:00");
        assert_eq!(format_mmss(7199), "119:59");
    }

    proptest! {
        #[test]
        fn prop_exactly_one_expiry_after_duration(duration in 1u64..=900) {
            let clock = ManualClock::default();
            let mut countdown = Countdown::new();
            countdown.arm(duration, clock.now());

            let mut expiries = 0;
            let mut expired_at_ms = None;
            // Run half a minute past the end at a 500ms cadence
            let steps = (duration as i64 + 30) * 2;
            for i in 1..=steps {
                if step(&mut countdown, &clock, 500) == Tick::Expired {
                    expiries += 1;
                    expired_at_ms = Some(i * 500);
                }
            }

            prop_assert_eq!(expiries, 1);
            prop_assert_eq!(expired_at_ms, Some(duration as i64 * 1000));
        }
    }
}
