// src/engine/progress.rs

//! Progress arithmetic for the simulated progress bar.
//!
//! All functions here are pure; the core feeds them elapsed times taken from
//! whatever clock the async shell uses.

use std::time::Duration;

/// Highest percentage reported while the task is still running.
pub const MAX_RUNNING_PERCENT: u8 = 99;

/// Timing knobs of the progress simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSettings {
    /// Tick interval in indeterminate mode.
    pub indeterminate_interval: Duration,
    /// Number of spinner frames; the frame index wraps at this value.
    pub indeterminate_frames: usize,
    /// Cadence of the fast-forward animation.
    pub fast_forward_interval: Duration,
    /// Force-finish a run whose runner has not reported back in this time.
    pub watchdog: Option<Duration>,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            indeterminate_interval: Duration::from_millis(30),
            indeterminate_frames: 32,
            fast_forward_interval: Duration::from_millis(1),
            watchdog: None,
        }
    }
}

/// Expected duration of a run, fixed when the run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedDuration {
    /// No estimate on record: indeterminate mode.
    Unknown,
    Known(Duration),
}

impl ExpectedDuration {
    /// A recorded 0ms estimate is treated as 1ms so the division stays sane.
    pub fn from_estimate(estimate: Option<Duration>) -> Self {
        match estimate {
            None => ExpectedDuration::Unknown,
            Some(d) if d.is_zero() => ExpectedDuration::Known(Duration::from_millis(1)),
            Some(d) => ExpectedDuration::Known(d),
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, ExpectedDuration::Unknown)
    }

    /// Delay between two progress ticks.
    ///
    /// Known durations tick once per percentage point, never faster than
    /// once per millisecond.
    pub fn tick_interval(&self, settings: &ProgressSettings) -> Duration {
        match self {
            ExpectedDuration::Unknown => settings.indeterminate_interval,
            ExpectedDuration::Known(expected) => (*expected / 100).max(Duration::from_millis(1)),
        }
    }
}

/// `floor(elapsed / expected * 100)`, uncapped.
pub fn raw_percent(elapsed: Duration, expected: Duration) -> u128 {
    let expected = expected.as_nanos().max(1);
    elapsed.as_nanos().saturating_mul(100) / expected
}

/// Percentage to display while the task is still running: never 100.
pub fn running_percent(elapsed: Duration, expected: Duration) -> u8 {
    let pct = raw_percent(elapsed, expected).min(u128::from(MAX_RUNNING_PERCENT));
    // Bounded by MAX_RUNNING_PERCENT above.
    pct as u8
}

/// Starting value of the fast-forward animation, or `None` when the bar is
/// already full and the terminal notification can go out directly.
pub fn fast_forward_start(
    last_reported: Option<u8>,
    elapsed: Duration,
    expected: Duration,
) -> Option<u8> {
    let computed = raw_percent(elapsed, expected);
    let start = computed.max(u128::from(last_reported.unwrap_or(0)));
    if start >= 100 {
        None
    } else {
        Some(start as u8)
    }
}

/// Advance the spinner by one frame.
pub fn next_frame(frame: usize, frame_count: usize) -> usize {
    (frame + 1) % frame_count.max(1)
}
