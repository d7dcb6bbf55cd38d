//! LCD 1602A (HD44780) driven over the 4-bit parallel bus
//!
//! Every byte goes out as two nibbles on D4..D7, high nibble first, each
//! latched by a pulse on E. RS selects between the command and character
//! registers. There is no busy-flag readback; fixed delays cover the
//! controller's execution times.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::debug;

use crate::core::error::DeviceError;
use crate::hardware::TextDisplay;

/// Characters per line
pub const LCD_WIDTH: usize = 16;

/// Delay around and width of the enable pulse
const E_DELAY_US: u32 = 500;
const E_PULSE_US: u32 = 500;

/// Function set / entry mode / display control sequence after power-up
const INIT_SEQUENCE: [u8; 6] = [
    0x33, // 110011 initialise
    0x32, // 110010 initialise, switch to 4-bit
    0x06, // 000110 cursor move direction
    0x0C, // 001100 display on, cursor off
    0x28, // 101000 data length, number of lines, font size
    0x01, // 000001 clear display
];
const CMD_CLEAR: u8 = 0x01;

/// DDRAM start address of each display line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LcdLine {
    First,
    Second,
    /// Only present on 20x4 modules
    Third,
    Fourth,
}

impl LcdLine {
    pub fn address(self) -> u8 {
        match self {
            LcdLine::First => 0x80,
            LcdLine::Second => 0xC0,
            LcdLine::Third => 0x94,
            LcdLine::Fourth => 0xD4,
        }
    }
}

/// Which controller register a byte is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Register {
    Command,
    Character,
}

pub struct Lcd1602<P, D> {
    rs: P,
    enable: P,
    /// D4, D5, D6, D7
    data: [P; 4],
    delay: D,
}

impl<P: OutputPin, D: DelayNs> Lcd1602<P, D> {
    /// Take ownership of the bus pins and run the initialisation sequence
    pub fn new(rs: P, enable: P, data: [P; 4], delay: D) -> Result<Self, DeviceError> {
        let mut lcd = Self {
            rs,
            enable,
            data,
            delay,
        };
        lcd.init()?;
        Ok(lcd)
    }

    fn init(&mut self) -> Result<(), DeviceError> {
        for command in INIT_SEQUENCE {
            self.write_byte(command, Register::Command)?;
        }
        self.delay.delay_us(E_DELAY_US);
        debug!("LCD initialised");
        Ok(())
    }

    /// Write `message` to `line`, padded with spaces to the full width
    pub fn write_line(&mut self, message: &str, line: LcdLine) -> Result<(), DeviceError> {
        self.write_byte(line.address(), Register::Command)?;
        for byte in line_bytes(message) {
            self.write_byte(byte, Register::Character)?;
        }
        Ok(())
    }

    pub fn clear_display(&mut self) -> Result<(), DeviceError> {
        self.write_byte(CMD_CLEAR, Register::Command)?;
        self.delay.delay_us(E_DELAY_US);
        Ok(())
    }

    /// Give the pins back, e.g. to reset them
    pub fn release(self) -> (P, P, [P; 4]) {
        (self.rs, self.enable, self.data)
    }

    fn write_byte(&mut self, bits: u8, register: Register) -> Result<(), DeviceError> {
        let rs_high = register == Register::Character;
        self.rs.set_state(rs_high.into()).map_err(super::pin_error)?;

        self.write_nibble(bits >> 4)?;
        self.write_nibble(bits & 0x0F)
    }

    /// Clear D4..D7, raise the ones set in `nibble`, then latch
    fn write_nibble(&mut self, nibble: u8) -> Result<(), DeviceError> {
        for pin in self.data.iter_mut() {
            pin.set_low().map_err(super::pin_error)?;
        }
        for (bit, pin) in self.data.iter_mut().enumerate() {
            if nibble & (1 << bit) != 0 {
                pin.set_high().map_err(super::pin_error)?;
            }
        }
        self.toggle_enable()
    }

    fn toggle_enable(&mut self) -> Result<(), DeviceError> {
        self.delay.delay_us(E_DELAY_US);
        self.enable.set_high().map_err(super::pin_error)?;
        self.delay.delay_us(E_PULSE_US);
        self.enable.set_low().map_err(super::pin_error)?;
        self.delay.delay_us(E_DELAY_US);
        Ok(())
    }
}

impl<P, D> TextDisplay for Lcd1602<P, D>
where
    P: OutputPin + Send,
    D: DelayNs + Send,
{
    fn show(&mut self, top: &str, bottom: &str) -> Result<(), DeviceError> {
        self.write_line(top, LcdLine::First)?;
        self.write_line(bottom, LcdLine::Second)
    }

    fn clear(&mut self) -> Result<(), DeviceError> {
        self.clear_display()
    }
}

/// Exactly `LCD_WIDTH` character codes: left-justified, space padded,
/// truncated, non-ASCII shown as `?`
pub fn line_bytes(message: &str) -> [u8; LCD_WIDTH] {
    let mut bytes = [b' '; LCD_WIDTH];
    for (slot, ch) in bytes.iter_mut().zip(message.chars()) {
        *slot = if ch.is_ascii() { ch as u8 } else { b'?' };
    }
    bytes
}
