//! Raspberry Pi GPIO bindings through rppal
//!
//! Pins are claimed by BCM number. rppal resets every pin it handed out
//! when the handle is dropped, so no explicit cleanup pass is needed.

use std::convert::Infallible;
use std::time::Duration;

use log::info;
use rppal::gpio::{Gpio, InputPin, IoPin, Mode, OutputPin, Bias};
use rppal::hal::Delay;

use crate::core::config::{LcdPins, Settings};
use crate::core::error::DeviceError;
use crate::hardware::{
    BinarySensor, Dht11, GasSensor, Lcd1602, MotionSensor, OneWirePin, PwmOutput, Servo,
    ServoProfile, Station,
};

pub type PiDht11 = Dht11<IoPin, Delay>;
pub type PiLcd = Lcd1602<OutputPin, Delay>;
pub type PiMotionSensor = MotionSensor<InputPin>;
pub type PiGasSensor = GasSensor<InputPin>;
pub type PiServo = Servo<OutputPin>;

impl OneWirePin for IoPin {
    type Error = Infallible;

    fn drive_low(&mut self) -> Result<(), Infallible> {
        self.set_mode(Mode::Output);
        self.set_low();
        Ok(())
    }

    fn release(&mut self) -> Result<(), Infallible> {
        self.set_mode(Mode::Input);
        Ok(())
    }

    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(IoPin::is_high(self))
    }
}

impl PwmOutput for OutputPin {
    type Error = rppal::gpio::Error;

    fn set_pwm(&mut self, period: Duration, pulse_width: Duration) -> Result<(), Self::Error> {
        OutputPin::set_pwm(self, period, pulse_width)
    }

    fn clear_pwm(&mut self) -> Result<(), Self::Error> {
        OutputPin::clear_pwm(self)
    }
}

fn setup_error(err: rppal::gpio::Error) -> DeviceError {
    DeviceError::Setup(err.to_string())
}

pub fn open_gpio() -> Result<Gpio, DeviceError> {
    Gpio::new().map_err(setup_error)
}

pub fn open_dht11(gpio: &Gpio, pin: u8) -> Result<PiDht11, DeviceError> {
    let mut line = gpio.get(pin).map_err(setup_error)?.into_io(Mode::Input);
    line.set_bias(Bias::PullUp);
    info!("DHT11 temperature/humidity sensor on GPIO{}", pin);
    Ok(Dht11::new(line, Delay::new()))
}

pub fn open_lcd(gpio: &Gpio, pins: &LcdPins) -> Result<PiLcd, DeviceError> {
    let output = |pin: u8| -> Result<OutputPin, DeviceError> {
        Ok(gpio.get(pin).map_err(setup_error)?.into_output_low())
    };
    let lcd = Lcd1602::new(
        output(pins.rs)?,
        output(pins.enable)?,
        [output(pins.d4)?, output(pins.d5)?, output(pins.d6)?, output(pins.d7)?],
        Delay::new(),
    )?;
    info!("LCD 1602A initialised");
    Ok(lcd)
}

pub fn open_motion_sensor(gpio: &Gpio, pin: u8) -> Result<PiMotionSensor, DeviceError> {
    let input = gpio.get(pin).map_err(setup_error)?.into_input();
    info!("PIR sensor initialised on GPIO{}", pin);
    Ok(MotionSensor::new(input))
}

pub fn open_gas_sensor(gpio: &Gpio, pin: u8, active_low: bool) -> Result<PiGasSensor, DeviceError> {
    let input = gpio.get(pin).map_err(setup_error)?.into_input();
    info!("MQ-2 gas sensor initialised on GPIO{}", pin);
    Ok(GasSensor::new(input, active_low))
}

pub fn open_servo(gpio: &Gpio, pin: u8, profile: ServoProfile) -> Result<PiServo, DeviceError> {
    let output = gpio.get(pin).map_err(setup_error)?.into_output_low();
    info!("Servo initialised on GPIO{} ({:?} profile)", pin, profile);
    Ok(Servo::new(output, profile))
}

/// Claim every device of the smart vent
pub fn open_station(settings: &Settings) -> Result<Station, DeviceError> {
    let gpio = open_gpio()?;
    let pins = &settings.pins;

    let display = open_lcd(&gpio, &pins.lcd)?;
    let climate = open_dht11(&gpio, pins.dht)?;
    let vent = open_servo(&gpio, pins.servo, ServoProfile::Standard)?;
    let motion = open_motion_sensor(&gpio, pins.pir)?;
    let gas = if settings.gas.enabled {
        let sensor = open_gas_sensor(&gpio, pins.mq2, settings.gas.active_low)?;
        Some(Box::new(sensor) as Box<dyn BinarySensor>)
    } else {
        None
    };

    Ok(Station {
        climate: Box::new(climate),
        motion: Box::new(motion),
        gas,
        display: Box::new(display),
        vent: Box::new(vent),
    })
}
