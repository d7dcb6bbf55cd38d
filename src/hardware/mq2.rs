//! MQ-2 gas/smoke sensor, digital threshold output

use embedded_hal::digital::InputPin;

use crate::core::error::DeviceError;
use crate::hardware::BinarySensor;

/// MQ-2 module read through its comparator output.
///
/// Most breakout boards pull the output low when the gas level crosses the
/// potentiometer threshold, some drive it high; `active_low` picks which.
pub struct GasSensor<P> {
    pin: P,
    active_low: bool,
}

impl<P: InputPin> GasSensor<P> {
    pub fn new(pin: P, active_low: bool) -> Self {
        Self { pin, active_low }
    }

    pub fn gas_detected(&mut self) -> Result<bool, DeviceError> {
        let high = self.pin.is_high().map_err(super::pin_error)?;
        Ok(high != self.active_low)
    }
}

impl<P: InputPin + Send> BinarySensor for GasSensor<P> {
    fn detected(&mut self) -> Result<bool, DeviceError> {
        self.gas_detected()
    }
}

/// What a poll of the gas sensor means for the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasChange {
    /// First poll after warm-up
    Initial(bool),
    /// The sensor flipped since the last poll
    Changed(bool),
}

/// Reports only the polls where the gas state differs from the previous one
#[derive(Debug, Clone, Default)]
pub struct GasTracker {
    last: Option<bool>,
}

impl GasTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, detected: bool) -> Option<GasChange> {
        let change = match self.last {
            None => Some(GasChange::Initial(detected)),
            Some(previous) if previous != detected => Some(GasChange::Changed(detected)),
            Some(_) => None,
        };
        self.last = Some(detected);
        change
    }

    /// True on the poll where gas first appears
    pub fn is_rising(&self, detected: bool) -> bool {
        detected && !self.last.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::{ErrorType, InputPin};
    use std::convert::Infallible;

    struct FixedLevel(bool);

    impl ErrorType for FixedLevel {
        type Error = Infallible;
    }

    impl InputPin for FixedLevel {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.0)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.0)
        }
    }

    #[test]
    fn test_active_low_polarity() {
        assert!(GasSensor::new(FixedLevel(false), true).gas_detected().unwrap());
        assert!(!GasSensor::new(FixedLevel(true), true).gas_detected().unwrap());
    }

    #[test]
    fn test_active_high_polarity() {
        assert!(GasSensor::new(FixedLevel(true), false).gas_detected().unwrap());
        assert!(!GasSensor::new(FixedLevel(false), false).gas_detected().unwrap());
    }

    #[test]
    fn test_tracker_reports_initial_then_changes_only() {
        let mut tracker = GasTracker::new();
        assert_eq!(tracker.observe(false), Some(GasChange::Initial(false)));
        assert_eq!(tracker.observe(false), None);
        assert_eq!(tracker.observe(true), Some(GasChange::Changed(true)));
        assert_eq!(tracker.observe(true), None);
        assert_eq!(tracker.observe(false), Some(GasChange::Changed(false)));
    }

    #[test]
    fn test_rising_edge() {
        let mut tracker = GasTracker::new();
        assert!(tracker.is_rising(true));
        tracker.observe(true);
        assert!(!tracker.is_rising(true));
        tracker.observe(false);
        assert!(tracker.is_rising(true));
    }
}
