use chrono::{DateTime, Local, TimeDelta};

use crate::core::config::VentConfig;
use crate::hardware::ClimateReading;

pub const VENT_CLOSED: i32 = 0;
pub const VENT_HALF: i32 = 90;
pub const VENT_OPEN: i32 = 180;

/// Thresholds the vent position is decided against
#[derive(Debug, Clone, PartialEq)]
pub struct VentThresholds {
    pub temp_high: f32,
    pub temp_low: f32,
    pub humidity_high: f32,
    /// Close the vent once nobody has moved for this long
    pub no_motion_close: TimeDelta,
}

impl From<&VentConfig> for VentThresholds {
    fn from(config: &VentConfig) -> Self {
        Self {
            temp_high: config.temp_high,
            temp_low: config.temp_low,
            humidity_high: config.humidity_high,
            no_motion_close: config.no_motion_close(),
        }
    }
}

impl Default for VentThresholds {
    fn default() -> Self {
        Self::from(&VentConfig::default())
    }
}

/// Target angle plus the reason shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct VentDecision {
    pub angle: i32,
    pub reason: String,
}

/// Pick the vent angle for the current conditions.
///
/// Gas overrides everything. Otherwise temperature decides, humidity can open
/// the vent while the temperature is in band, and a long stretch without
/// motion closes it regardless.
pub fn decide_vent_position(
    thresholds: &VentThresholds,
    reading: &ClimateReading,
    motion_detected: bool,
    gas_detected: Option<bool>,
    last_motion: DateTime<Local>,
    now: DateTime<Local>,
) -> VentDecision {
    if gas_detected == Some(true) {
        return VentDecision {
            angle: VENT_OPEN,
            reason: "Gas/Smoke Detected".to_string(),
        };
    }

    let temp = reading.temperature;
    let humidity = reading.humidity;
    let mut decision = VentDecision {
        angle: VENT_HALF,
        reason: "Normal ventilation".to_string(),
    };

    if temp > thresholds.temp_high {
        decision = VentDecision {
            angle: VENT_OPEN,
            reason: format!("High temp ({:.1}C)", temp),
        };
    } else if temp < thresholds.temp_low {
        decision = VentDecision {
            angle: VENT_CLOSED,
            reason: format!("Low temp ({:.1}C)", temp),
        };
    }

    let temp_in_band = thresholds.temp_low <= temp && temp <= thresholds.temp_high;
    if temp_in_band && humidity > thresholds.humidity_high {
        decision = VentDecision {
            angle: VENT_OPEN,
            reason: format!("High humidity ({:.1}%)", humidity),
        };
    }

    let idle = now.signed_duration_since(last_motion);
    if !motion_detected && idle > thresholds.no_motion_close {
        decision = VentDecision {
            angle: VENT_CLOSED,
            reason: format!("No motion ({}min)", idle.num_minutes()),
        };
    }

    decision
}
