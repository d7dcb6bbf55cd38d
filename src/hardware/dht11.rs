//! DHT11 temperature/humidity sensor over its single-wire timing protocol

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::error::{DeviceError, DhtError};
use crate::hardware::ClimateSensor;

/// High pulses longer than this encode a 1 bit
const ONE_BIT_THRESHOLD: Duration = Duration::from_micros(50);
/// Longest wait for any single edge. Far above the datasheet figures because
/// a Linux process can be descheduled mid-frame.
const EDGE_TIMEOUT: Duration = Duration::from_millis(1);
const START_SIGNAL_MS: u32 = 20;
const FRAME_BITS: usize = 40;

/// Open-drain data line shared with the sensor
pub trait OneWirePin {
    type Error: std::fmt::Debug;

    /// Pull the line low
    fn drive_low(&mut self) -> Result<(), Self::Error>;

    /// Stop driving and let the pull-up take the line high
    fn release(&mut self) -> Result<(), Self::Error>;

    fn is_high(&mut self) -> Result<bool, Self::Error>;
}

/// One temperature/humidity sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateReading {
    /// Degrees Celsius
    pub temperature: f32,
    /// Relative humidity, percent
    pub humidity: f32,
}

/// Blocking DHT11 reader; one read takes about 25 ms
pub struct Dht11<P, D> {
    pin: P,
    delay: D,
}

impl<P: OneWirePin, D: DelayNs> Dht11<P, D> {
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    /// Run one full transaction and decode the frame
    pub fn read_frame(&mut self) -> Result<ClimateReading, DeviceError> {
        self.start_signal()?;
        self.expect_response()?;
        let bits = self.read_bits()?;
        let frame = bits_to_frame(&bits);
        debug!("dht11 frame: {:02x?}", frame);
        Ok(decode_frame(frame)?)
    }

    /// Hold the line low for 20 ms, then hand it back to the sensor
    fn start_signal(&mut self) -> Result<(), DeviceError> {
        self.pin.release().map_err(super::pin_error)?;
        self.delay.delay_ms(1);
        self.pin.drive_low().map_err(super::pin_error)?;
        self.delay.delay_ms(START_SIGNAL_MS);
        self.pin.release().map_err(super::pin_error)?;
        Ok(())
    }

    /// 80 µs low followed by 80 µs high, then the first bit starts low
    fn expect_response(&mut self) -> Result<(), DeviceError> {
        self.wait_for_level(false)?;
        self.wait_for_level(true)?;
        self.wait_for_level(false)?;
        Ok(())
    }

    fn read_bits(&mut self) -> Result<[bool; FRAME_BITS], DeviceError> {
        let mut bits = [false; FRAME_BITS];
        for bit in bits.iter_mut() {
            self.wait_for_level(true)?;
            let high_for = self.wait_for_level(false)?;
            *bit = high_for > ONE_BIT_THRESHOLD;
        }
        Ok(bits)
    }

    /// Busy-wait until the line reaches `target_high`, returning how long it took
    fn wait_for_level(&mut self, target_high: bool) -> Result<Duration, DeviceError> {
        let started = Instant::now();
        loop {
            if self.pin.is_high().map_err(super::pin_error)? == target_high {
                return Ok(started.elapsed());
            }
            if started.elapsed() > EDGE_TIMEOUT {
                return Err(DhtError::MissingData.into());
            }
        }
    }
}

impl<P, D> ClimateSensor for Dht11<P, D>
where
    P: OneWirePin + Send,
    D: DelayNs + Send,
{
    fn read(&mut self) -> Result<ClimateReading, DeviceError> {
        self.read_frame()
    }
}

/// Pack 40 bits, most significant first, into the 5-byte frame
pub fn bits_to_frame(bits: &[bool; FRAME_BITS]) -> [u8; 5] {
    let mut frame = [0u8; 5];
    for (index, bit) in bits.iter().enumerate() {
        frame[index / 8] = (frame[index / 8] << 1) | u8::from(*bit);
    }
    frame
}

/// Verify the checksum and convert `[hum, hum_dec, temp, temp_dec, sum]`
pub fn decode_frame(frame: [u8; 5]) -> Result<ClimateReading, DhtError> {
    let expected = frame[0]
        .wrapping_add(frame[1])
        .wrapping_add(frame[2])
        .wrapping_add(frame[3]);
    if expected != frame[4] {
        return Err(DhtError::Checksum {
            expected,
            actual: frame[4],
        });
    }

    Ok(ClimateReading {
        humidity: f32::from(frame[0]) + f32::from(frame[1]) / 10.0,
        temperature: f32::from(frame[2]) + f32::from(frame[3]) / 10.0,
    })
}
