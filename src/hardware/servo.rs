//! Hobby servo positioned with 50 Hz software PWM

use std::fmt::Debug;
use std::time::Duration;

use log::debug;

use crate::core::error::DeviceError;
use crate::hardware::VentActuator;

/// 50 Hz frame
pub const PWM_PERIOD: Duration = Duration::from_millis(20);
const PERIOD_US: f64 = 20_000.0;

/// Pulse widths of the extended profile (µs)
const EXT_MIN_PULSE_US: f64 = 450.0;
const EXT_MID_PULSE_US: f64 = 1500.0;
const EXT_MAX_PULSE_US: f64 = 2500.0;

/// A pin that can emit a periodic pulse train
pub trait PwmOutput {
    type Error: Debug;

    fn set_pwm(&mut self, period: Duration, pulse_width: Duration) -> Result<(), Self::Error>;

    /// Stop pulsing and leave the line low
    fn clear_pwm(&mut self) -> Result<(), Self::Error>;
}

/// Angle-to-pulse mapping of a servo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoProfile {
    /// 0..=180°, duty = 2% + angle/18 (400..2400 µs)
    Standard,
    /// -100..=270°, piecewise around 1500 µs at 90°
    Extended,
}

impl ServoProfile {
    /// Inclusive angle limits
    pub fn range(self) -> (i32, i32) {
        match self {
            ServoProfile::Standard => (0, 180),
            ServoProfile::Extended => (-100, 270),
        }
    }

    pub fn contains(self, angle: i32) -> bool {
        let (min, max) = self.range();
        (min..=max).contains(&angle)
    }

    pub fn clamp(self, angle: i32) -> i32 {
        let (min, max) = self.range();
        angle.clamp(min, max)
    }

    /// Pulse width in microseconds for `angle`, clamped to the profile range
    pub fn pulse_width_us(self, angle: i32) -> f64 {
        let angle = f64::from(self.clamp(angle));
        match self {
            ServoProfile::Standard => {
                let duty_percent = 2.0 + angle / 18.0;
                duty_percent / 100.0 * PERIOD_US
            }
            ServoProfile::Extended => {
                if angle < 90.0 {
                    EXT_MID_PULSE_US
                        + (angle - 90.0) * (EXT_MID_PULSE_US - EXT_MIN_PULSE_US) / 190.0
                } else {
                    EXT_MID_PULSE_US
                        + (angle - 90.0) * (EXT_MAX_PULSE_US - EXT_MID_PULSE_US) / 180.0
                }
            }
        }
    }

    pub fn pulse_width(self, angle: i32) -> Duration {
        Duration::from_nanos((self.pulse_width_us(angle) * 1000.0).round() as u64)
    }

    /// Duty cycle in percent of the 20 ms frame
    pub fn duty_cycle(self, angle: i32) -> f64 {
        self.pulse_width_us(angle) / PERIOD_US * 100.0
    }
}

/// Servo on a PWM-capable pin; owns the pin for its whole life
pub struct Servo<P> {
    pin: P,
    profile: ServoProfile,
    angle: Option<i32>,
}

impl<P: PwmOutput> Servo<P> {
    pub fn new(pin: P, profile: ServoProfile) -> Self {
        Self {
            pin,
            profile,
            angle: None,
        }
    }

    pub fn profile(&self) -> ServoProfile {
        self.profile
    }

    /// Last commanded angle, after clamping
    pub fn angle(&self) -> Option<i32> {
        self.angle
    }

    /// Start the pulse train for `angle`; the caller decides how long to hold it
    pub fn set_angle(&mut self, angle: i32) -> Result<Duration, DeviceError> {
        let clamped = self.profile.clamp(angle);
        let pulse = self.profile.pulse_width(clamped);
        debug!(
            "servo -> {}° (duty {:.2}%, pulse {:?})",
            clamped,
            self.profile.duty_cycle(clamped),
            pulse
        );
        self.pin
            .set_pwm(PWM_PERIOD, pulse)
            .map_err(super::pin_error)?;
        self.angle = Some(clamped);
        Ok(pulse)
    }

    pub fn stop(&mut self) -> Result<(), DeviceError> {
        self.pin.clear_pwm().map_err(super::pin_error)
    }
}

impl<P: PwmOutput + Send> VentActuator for Servo<P> {
    fn move_to(&mut self, angle: i32) -> Result<Duration, DeviceError> {
        self.set_angle(angle)
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        self.stop()
    }
}
