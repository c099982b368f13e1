use std::ops::RangeInclusive;
use std::time::Duration;
use crate::pattern::PATTERN_CAPACITY;

/// Timing and behavior settings of a [Keyboard](crate::Keyboard).
///
/// Every field can be changed between polls.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KbdConfig {
    /// How long a key code must stay unchanged before it is trusted.
    pub bounce_time: Duration,
    /// How long after a release the same key code may be pressed again to count as a repeat.
    pub double_click_time: Duration,
    /// Cadence of the long-press log record while a key is held.
    pub long_press_report: Duration,
    /// Shortest hold of the pattern key that starts or ends a pattern.
    pub pattern_hold_min: Duration,
    /// Longest hold of the pattern key that starts or ends a pattern.
    pub pattern_hold_max: Duration,
    /// Inactivity after which a pattern session is closed with what it has.
    pub pattern_timeout: Duration,
    /// Maximum pattern length in hex characters, capped at [PATTERN_CAPACITY].
    pub max_pattern_len: usize,
    /// Stop polling while an event waits for [acknowledge](crate::Keyboard::acknowledge).
    pub wait_for_ack: bool,
    /// Log a record at every `long_press_report` interval while a key is held.
    pub report_long_press: bool,
    /// Log each pattern transition and appended key code.
    pub report_pattern: bool,
}

impl Default for KbdConfig {
    fn default() -> Self {
        KbdConfig {
            bounce_time: Duration::from_millis(50),
            double_click_time: Duration::from_millis(300),
            long_press_report: Duration::from_millis(500),
            pattern_hold_min: Duration::from_millis(2500),
            pattern_hold_max: Duration::from_millis(5000),
            pattern_timeout: Duration::from_secs(30),
            max_pattern_len: 8,
            wait_for_ack: false,
            report_long_press: true,
            report_pattern: true,
        }
    }
}

impl KbdConfig {
    pub fn with_bounce_time(mut self, bounce_time: Duration) -> Self {
        self.bounce_time = bounce_time;
        self
    }

    pub fn with_double_click_time(mut self, double_click_time: Duration) -> Self {
        self.double_click_time = double_click_time;
        self
    }

    pub fn with_long_press_report(mut self, long_press_report: Duration) -> Self {
        self.long_press_report = long_press_report;
        self
    }

    pub fn with_pattern_hold(mut self, min: Duration, max: Duration) -> Self {
        self.pattern_hold_min = min;
        self.pattern_hold_max = max;
        self
    }

    pub fn with_pattern_timeout(mut self, pattern_timeout: Duration) -> Self {
        self.pattern_timeout = pattern_timeout;
        self
    }

    pub fn with_max_pattern_len(mut self, max_pattern_len: usize) -> Self {
        self.max_pattern_len = max_pattern_len;
        self
    }

    pub fn with_wait_for_ack(mut self, wait_for_ack: bool) -> Self {
        self.wait_for_ack = wait_for_ack;
        self
    }

    pub fn with_reports(mut self, long_press: bool, pattern: bool) -> Self {
        self.report_long_press = long_press;
        self.report_pattern = pattern;
        self
    }

    /// Gets the hold durations, in ms, of the pattern key that count as a start/stop signal.
    pub fn pattern_hold_band(&self) -> RangeInclusive<u32> {
        millis(self.pattern_hold_min)..=millis(self.pattern_hold_max)
    }

    pub(crate) fn pattern_len_limit(&self) -> usize {
        self.max_pattern_len.min(PATTERN_CAPACITY)
    }
}

/// Converts a duration to clock milliseconds, saturating at `u32::MAX`.
pub(crate) fn millis(duration: Duration) -> u32 {
    duration.as_millis().try_into().unwrap_or(u32::MAX)
}
