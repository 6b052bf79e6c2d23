//! Score - Wall-clock score accrual
//!
//! One unit per elapsed period of unpaused time. Time is measured against
//! the clock, never against frame deltas, so the frame rate has no effect
//! on the score.

use std::time::Duration;
use tokio::time::Instant;

/// Accrues score while running
#[derive(Debug, Clone)]
pub struct ScoreKeeper {
    score: u32,
    period: Duration,
    /// Running time not yet converted into whole units
    banked: Duration,
    running_since: Option<Instant>,
}

impl ScoreKeeper {
    pub fn new(period: Duration) -> Self {
        Self {
            score: 0,
            period,
            banked: Duration::ZERO,
            running_since: None,
        }
    }

    /// Start (or resume) accrual at `now`. No-op if already running.
    pub fn start(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    /// Suspend accrual. The partial period is kept for the next `start`.
    pub fn pause(&mut self, now: Instant) {
        self.accrue(now);
        self.running_since = None;
    }

    /// Convert elapsed running time into score. Returns units added.
    pub fn accrue(&mut self, now: Instant) -> u32 {
        let Some(since) = self.running_since else {
            return 0;
        };
        if self.period.is_zero() {
            return 0;
        }

        self.banked += now.saturating_duration_since(since);
        self.running_since = Some(now);

        let units = (self.banked.as_nanos() / self.period.as_nanos()) as u32;
        self.banked -= self.period * units;
        self.score = self.score.saturating_add(units);
        units
    }

    /// When the next whole unit completes, if running
    pub fn next_due(&self) -> Option<Instant> {
        self.running_since
            .map(|since| since + self.period.saturating_sub(self.banked))
    }

    /// Zero the score and stop until started again
    pub fn reset(&mut self) {
        self.score = 0;
        self.banked = Duration::ZERO;
        self.running_since = None;
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

/// Format score units (seconds) as `MM:SS`
pub fn format_clock(units: u32) -> String {
    format!("{:02}:{:02}", units / 60, units % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn test_idle_keeper_does_not_accrue() {
        let t0 = Instant::now();
        let mut keeper = ScoreKeeper::new(SECOND);
        assert_eq!(keeper.accrue(t0 + SECOND * 10), 0);
        assert_eq!(keeper.score(), 0);
        assert!(!keeper.is_running());
    }

    #[test]
    fn test_one_unit_per_period() {
        let t0 = Instant::now();
        let mut keeper = ScoreKeeper::new(SECOND);
        keeper.start(t0);
        assert_eq!(keeper.accrue(t0 + Duration::from_millis(999)), 0);
        assert_eq!(keeper.accrue(t0 + SECOND), 1);
        assert_eq!(keeper.accrue(t0 + Duration::from_millis(3500)), 2);
        assert_eq!(keeper.score(), 3);
    }

    #[test]
    fn test_pause_freezes_and_resume_continues() {
        let t0 = Instant::now();
        let mut keeper = ScoreKeeper::new(SECOND);
        keeper.start(t0);
        keeper.pause(t0 + Duration::from_millis(2500));
        assert_eq!(keeper.score(), 2);

        // Paused for a long time
        assert_eq!(keeper.accrue(t0 + SECOND * 60), 0);
        assert_eq!(keeper.score(), 2);

        // The half period banked before the pause carries over
        keeper.start(t0 + SECOND * 60);
        assert_eq!(keeper.accrue(t0 + Duration::from_millis(60_500)), 1);
        assert_eq!(keeper.score(), 3);
    }

    #[test]
    fn test_start_twice_does_not_restart() {
        let t0 = Instant::now();
        let mut keeper = ScoreKeeper::new(SECOND);
        keeper.start(t0);
        keeper.start(t0 + Duration::from_millis(900));
        assert_eq!(keeper.accrue(t0 + SECOND), 1);
    }

    #[test]
    fn test_reset_then_n_periods() {
        let t0 = Instant::now();
        let mut keeper = ScoreKeeper::new(SECOND);
        keeper.start(t0);
        keeper.accrue(t0 + SECOND * 7);
        keeper.reset();
        assert_eq!(keeper.score(), 0);
        assert!(!keeper.is_running());

        let t1 = t0 + SECOND * 8;
        keeper.start(t1);
        for n in 1..=5u32 {
            keeper.accrue(t1 + SECOND * n);
        }
        assert_eq!(keeper.score(), 5);
    }

    #[test]
    fn test_next_due_follows_start_and_pause() {
        let t0 = Instant::now();
        let mut keeper = ScoreKeeper::new(SECOND);
        assert_eq!(keeper.next_due(), None);

        // Started mid-period of any outside clock
        let started = t0 + Duration::from_millis(500);
        keeper.start(started);
        assert_eq!(keeper.next_due(), Some(started + SECOND));

        keeper.pause(started + Duration::from_millis(300));
        assert_eq!(keeper.next_due(), None);

        // Only the rest of the interrupted period is left after resuming
        let resumed = t0 + SECOND * 10;
        keeper.start(resumed);
        let due = resumed + Duration::from_millis(700);
        assert_eq!(keeper.next_due(), Some(due));
        assert_eq!(keeper.accrue(due), 1);
        assert_eq!(keeper.next_due(), Some(due + SECOND));
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(42), "00:42");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(6000), "100:00");
    }
}
