//! PIR motion sensor and motion event counting

use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};
use embedded_hal::digital::InputPin;

use crate::core::error::DeviceError;
use crate::hardware::BinarySensor;

/// PIR module with a push-pull digital output, high while motion is seen
pub struct MotionSensor<P> {
    pin: P,
}

impl<P: InputPin> MotionSensor<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn motion(&mut self) -> Result<bool, DeviceError> {
        self.pin.is_high().map_err(super::pin_error)
    }
}

impl<P: InputPin + Send> BinarySensor for MotionSensor<P> {
    fn detected(&mut self) -> Result<bool, DeviceError> {
        self.motion()
    }
}

/// Which polls are allowed to count as a new motion event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Every poll that sees motion
    Level,
    /// Only a poll where motion appears after a poll without it
    RisingEdge,
}

/// Counts motion events, ignoring any that follow the previous one too closely
#[derive(Debug, Clone)]
pub struct MotionTracker {
    mode: TriggerMode,
    debounce: TimeDelta,
    count: u32,
    last_event: Option<DateTime<Local>>,
    previous: bool,
}

impl MotionTracker {
    pub fn new(mode: TriggerMode, debounce: Duration) -> Self {
        Self {
            mode,
            debounce: TimeDelta::from_std(debounce).unwrap_or(TimeDelta::zero()),
            count: 0,
            last_event: None,
            previous: false,
        }
    }

    /// Treat `at` as the most recent event without counting it
    pub fn starting_at(mut self, at: DateTime<Local>) -> Self {
        self.last_event = Some(at);
        self
    }

    /// Feed one poll; returns the new total when this poll counts as an event
    pub fn observe(&mut self, now: DateTime<Local>, motion: bool) -> Option<u32> {
        let candidate = match self.mode {
            TriggerMode::Level => motion,
            TriggerMode::RisingEdge => motion && !self.previous,
        };
        self.previous = motion;

        if !candidate {
            return None;
        }

        let settled = self
            .last_event
            .map_or(true, |last| now.signed_duration_since(last) > self.debounce);
        if !settled {
            return None;
        }

        self.count += 1;
        self.last_event = Some(now);
        Some(self.count)
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn last_event(&self) -> Option<DateTime<Local>> {
        self.last_event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Local> {
        Local.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_level_mode_counts_each_settled_poll() {
        let mut tracker = MotionTracker::new(TriggerMode::Level, Duration::from_secs(1));
        assert_eq!(tracker.observe(at(0), true), Some(1));
        // exactly one second later is not enough
        assert_eq!(tracker.observe(at(1), true), None);
        assert_eq!(tracker.observe(at(2), true), Some(2));
        assert_eq!(tracker.observe(at(3), false), None);
        assert_eq!(tracker.count(), 2);
    }

    #[test]
    fn test_rising_edge_mode_ignores_held_motion() {
        let mut tracker = MotionTracker::new(TriggerMode::RisingEdge, Duration::from_secs(1));
        assert_eq!(tracker.observe(at(0), true), Some(1));
        assert_eq!(tracker.observe(at(5), true), None);
        assert_eq!(tracker.observe(at(6), false), None);
        assert_eq!(tracker.observe(at(7), true), Some(2));
        assert_eq!(tracker.last_event(), Some(at(7)));
    }

    #[test]
    fn test_start_time_debounces_first_event() {
        let mut tracker =
            MotionTracker::new(TriggerMode::RisingEdge, Duration::from_secs(1)).starting_at(at(0));
        assert_eq!(tracker.observe(at(1), true), None);
        assert_eq!(tracker.observe(at(2), false), None);
        assert_eq!(tracker.observe(at(3), true), Some(1));
    }

    #[test]
    fn test_rising_edge_swallowed_by_debounce_needs_new_edge() {
        let mut tracker =
            MotionTracker::new(TriggerMode::RisingEdge, Duration::from_secs(1)).starting_at(at(0));
        assert_eq!(tracker.observe(at(0), true), None);
        assert_eq!(tracker.observe(at(3), true), None);
        assert_eq!(tracker.count(), 0);
    }
}
