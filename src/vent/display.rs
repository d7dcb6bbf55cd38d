//! What the LCD shows: a page rotating every five seconds, plus fixed screens

use chrono::{DateTime, Local, Timelike};

use crate::hardware::ClimateReading;
use crate::vent::policy::{VENT_CLOSED, VENT_OPEN};

/// Seconds each page stays up
const PAGE_SECONDS: u32 = 5;
/// Characters of the reason kept on the vent page
const REASON_CHARS: usize = 16;

/// Two display lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub top: String,
    pub bottom: String,
}

impl Screen {
    pub fn new(top: impl Into<String>, bottom: impl Into<String>) -> Self {
        Self {
            top: top.into(),
            bottom: bottom.into(),
        }
    }

    pub fn welcome() -> Self {
        Self::new("Smart Air Vent", "Initializing...")
    }

    pub fn sensor_error() -> Self {
        Self::new("Sensor Error!", "Check Connection")
    }

    pub fn shutdown() -> Self {
        Self::new("System Shutdown", "Goodbye!")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Climate,
    Motion,
    Vent,
    Gas,
}

impl Page {
    /// Page for the given wall-clock second; the gas page only rotates in
    /// when the sensor is fitted
    pub fn for_second(second: u32, gas_enabled: bool) -> Self {
        let pages = if gas_enabled { 4 } else { 3 };
        match (second / PAGE_SECONDS) % pages {
            0 => Page::Climate,
            1 => Page::Motion,
            2 => Page::Vent,
            _ => Page::Gas,
        }
    }
}

/// Everything a page may need
#[derive(Debug, Clone)]
pub struct PageContext<'a> {
    pub now: DateTime<Local>,
    pub reading: &'a ClimateReading,
    pub motion: bool,
    pub gas: bool,
    pub vent_angle: i32,
    pub reason: &'a str,
}

pub fn render(page: Page, ctx: &PageContext<'_>) -> Screen {
    match page {
        Page::Climate => Screen::new(
            format!("Temp: {:.1}C", ctx.reading.temperature),
            format!("Hum: {:.1}% {}", ctx.reading.humidity, ctx.now.format("%M:%S")),
        ),
        Page::Motion => Screen::new(
            "Motion Detector",
            format!("Status: {}", if ctx.motion { "ACTIVE" } else { "Inactive" }),
        ),
        Page::Vent => Screen::new(
            format!("Vent: {}", vent_status(ctx.vent_angle)),
            format!("Reason: {}", truncate(ctx.reason, REASON_CHARS)),
        ),
        Page::Gas => Screen::new(
            "Gas/Smoke Sensor",
            if ctx.gas { "GAS ALERT!" } else { "Gas: Normal" },
        ),
    }
}

/// Render the page that is due at `ctx.now`
pub fn render_current(gas_enabled: bool, ctx: &PageContext<'_>) -> Screen {
    render(Page::for_second(ctx.now.second(), gas_enabled), ctx)
}

/// "Off" when closed, "On" when fully open, otherwise how far open
pub fn vent_status(angle: i32) -> String {
    if angle > VENT_CLOSED && angle < VENT_OPEN {
        format!("{}%", angle * 100 / VENT_OPEN)
    } else if angle == VENT_CLOSED {
        "Off".to_string()
    } else {
        "On".to_string()
    }
}

/// Climate screen of the standalone LCD program
pub fn climate_screen(reading: &ClimateReading) -> Screen {
    Screen::new(
        format!("Temp: {:.1}C", reading.temperature),
        format!("Humidity: {:.1}%", reading.humidity),
    )
}

fn truncate(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
