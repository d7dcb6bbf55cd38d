//! Device drivers for the sensors, display and servo
//!
//! The drivers are written against the `embedded-hal` 1.0 pin and delay
//! traits. Each one also implements one of the small object-safe traits below,
//! which is what the programs hold on to.

use std::fmt::Debug;
use std::time::Duration;

use crate::core::error::DeviceError;

pub mod dht11;
pub mod lcd;
pub mod mq2;
pub mod pir;
pub mod servo;

#[cfg(feature = "rpi")]
pub mod rpi;

pub use dht11::{ClimateReading, Dht11, OneWirePin};
pub use lcd::{Lcd1602, LcdLine};
pub use mq2::{GasSensor, GasTracker};
pub use pir::{MotionSensor, MotionTracker, TriggerMode};
pub use servo::{PwmOutput, Servo, ServoProfile};

/// Temperature and humidity source
#[cfg_attr(test, mockall::automock)]
pub trait ClimateSensor: Send {
    fn read(&mut self) -> Result<ClimateReading, DeviceError>;
}

/// A sensor with a single digital "detected" output
#[cfg_attr(test, mockall::automock)]
pub trait BinarySensor: Send {
    fn detected(&mut self) -> Result<bool, DeviceError>;
}

/// Two-line character display
#[cfg_attr(test, mockall::automock)]
pub trait TextDisplay: Send {
    /// Replace both lines
    fn show(&mut self, top: &str, bottom: &str) -> Result<(), DeviceError>;

    fn clear(&mut self) -> Result<(), DeviceError>;
}

/// Anything that can be driven to an angle, typically a servo
#[cfg_attr(test, mockall::automock)]
pub trait VentActuator: Send {
    /// Start driving towards `angle`, returning the pulse width applied
    fn move_to(&mut self, angle: i32) -> Result<Duration, DeviceError>;

    /// Stop the drive signal so the actuator holds without jitter
    fn release(&mut self) -> Result<(), DeviceError>;
}

/// Owned handles for every device of the smart vent
pub struct Station {
    pub climate: Box<dyn ClimateSensor>,
    pub motion: Box<dyn BinarySensor>,
    /// Absent when the MQ-2 is not fitted
    pub gas: Option<Box<dyn BinarySensor>>,
    pub display: Box<dyn TextDisplay>,
    pub vent: Box<dyn VentActuator>,
}

/// Map an `embedded-hal` pin error into a driver error
pub(crate) fn pin_error<E: Debug>(err: E) -> DeviceError {
    DeviceError::Pin(format!("{:?}", err))
}
