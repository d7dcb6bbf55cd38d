use std::collections::HashSet;
use std::env;
use std::fs;
use std::time::Duration;

use chrono::TimeDelta;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;

/// Environment variable naming the TOML configuration file
pub const CONFIG_PATH_ENV: &str = "VENT_STATION_CONFIG";

/// Highest BCM GPIO number exposed on the 40-pin header
const MAX_BCM_PIN: u8 = 27;

/// Longest idle or throttle interval accepted, one week
const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Complete station configuration
///
/// Every section falls back to the wiring and thresholds of the reference
/// build, so an empty file (or no file at all) gives a working setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// BCM pin assignments
    pub pins: PinConfig,
    /// Vent decision thresholds
    pub vent: VentConfig,
    /// Loop cadence and warm-up times
    pub timing: TimingConfig,
    /// MQ-2 participation and polarity
    pub gas: GasConfig,
    /// Cloud publishing
    pub pubnub: PubNubConfig,
    /// Servo HTTP API
    pub server: ServerConfig,
}

/// BCM pin numbers for every attached device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PinConfig {
    /// DHT11 data line
    pub dht: u8,
    /// PIR sensor output
    pub pir: u8,
    /// Servo signal
    pub servo: u8,
    /// MQ-2 digital output
    pub mq2: u8,
    /// LCD 1602A bus
    pub lcd: LcdPins,
}

/// LCD 1602A pins for the 4-bit bus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LcdPins {
    pub rs: u8,
    pub enable: u8,
    pub d4: u8,
    pub d5: u8,
    pub d6: u8,
    pub d7: u8,
}

/// Thresholds and servo behaviour of the smart vent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VentConfig {
    /// Above this temperature (°C) the vent opens fully
    pub temp_high: f32,
    /// Below this temperature (°C) the vent closes
    pub temp_low: f32,
    /// Above this relative humidity (%) the vent opens fully
    pub humidity_high: f32,
    /// Idle time without motion before the vent closes (seconds)
    pub no_motion_close_secs: u64,
    /// Minimum time between two vent movements (seconds)
    pub min_change_interval_secs: u64,
    /// Servo angle applied at startup
    pub initial_angle: i32,
    /// Time the servo is given to reach its position (milliseconds)
    pub settle_ms: u64,
}

/// Polling cadence of the device programs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Smart vent loop period (milliseconds)
    pub loop_interval_ms: u64,
    /// Minimum time between cloud publishes (seconds)
    pub publish_interval_secs: u64,
    /// Minimum time between two counted motion events (milliseconds)
    pub motion_debounce_ms: u64,
    /// Consecutive failed reads tolerated before the error screen
    pub failure_threshold: u32,
    /// PIR stabilisation time (seconds)
    pub pir_warmup_secs: u64,
    /// MQ-2 stabilisation time (seconds)
    pub mq2_warmup_secs: u64,
    /// How long the welcome screen stays up (milliseconds)
    pub welcome_ms: u64,
}

/// MQ-2 gas sensor options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GasConfig {
    /// Include the MQ-2 in the smart vent
    pub enabled: bool,
    /// The module pulls its output low when gas is present
    pub active_low: bool,
}

/// PubNub publish settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PubNubConfig {
    pub enabled: bool,
    pub publish_key: String,
    pub subscribe_key: String,
    pub channel: String,
    /// Client identifier; a random one is generated when unset
    pub uuid: Option<String>,
    /// REST origin
    pub origin: String,
    pub timeout_secs: u64,
}

/// Servo API server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Time the servo is given to reach its position (milliseconds)
    pub settle_ms: u64,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            dht: 4,
            pir: 17,
            servo: 18,
            mq2: 16,
            lcd: LcdPins::default(),
        }
    }
}

impl Default for LcdPins {
    fn default() -> Self {
        Self {
            rs: 26,
            enable: 19,
            d4: 13,
            d5: 6,
            d6: 5,
            d7: 11,
        }
    }
}

impl Default for VentConfig {
    fn default() -> Self {
        Self {
            temp_high: 26.0,
            temp_low: 18.0,
            humidity_high: 70.0,
            no_motion_close_secs: 300,
            min_change_interval_secs: 10,
            initial_angle: 90,
            settle_ms: 300,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            loop_interval_ms: 1000,
            publish_interval_secs: 5,
            motion_debounce_ms: 1000,
            failure_threshold: 5,
            pir_warmup_secs: 2,
            mq2_warmup_secs: 10,
            welcome_ms: 2000,
        }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            active_low: true,
        }
    }
}

impl Default for PubNubConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            publish_key: "demo".to_string(),
            subscribe_key: "demo".to_string(),
            channel: "vent-station".to_string(),
            uuid: None,
            origin: "https://ps.pndsn.com".to_string(),
            timeout_secs: 5,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5500,
            settle_ms: 500,
        }
    }
}

impl Settings {
    /// Load settings from the file named by `VENT_STATION_CONFIG`, apply the
    /// PubNub environment overrides and validate the result
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = match env::var(CONFIG_PATH_ENV) {
            Ok(path) => {
                info!("Loading configuration from {}", path);
                Self::from_file(&path)?
            }
            Err(_) => {
                debug!("{} not set, using built-in defaults", CONFIG_PATH_ENV);
                Self::default()
            }
        };
        settings.apply_env_overrides(|key| env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Read and parse a TOML configuration file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Override the publish credentials from the environment
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("PUBNUB_PUBLISH_KEY") {
            self.pubnub.publish_key = key;
        }
        if let Some(key) = lookup("PUBNUB_SUBSCRIBE_KEY") {
            self.pubnub.subscribe_key = key;
        }
        if let Some(channel) = lookup("PUBNUB_CHANNEL") {
            self.pubnub.channel = channel;
        }
        if let Some(uuid) = lookup("PUBNUB_UUID") {
            self.pubnub.uuid = Some(uuid);
        }
    }

    /// Reject pin maps that cannot be wired and thresholds that contradict each other
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pins = &self.pins;
        let lcd = &pins.lcd;
        let mut assigned = vec![
            ("dht", pins.dht),
            ("pir", pins.pir),
            ("servo", pins.servo),
            ("lcd.rs", lcd.rs),
            ("lcd.enable", lcd.enable),
            ("lcd.d4", lcd.d4),
            ("lcd.d5", lcd.d5),
            ("lcd.d6", lcd.d6),
            ("lcd.d7", lcd.d7),
        ];
        if self.gas.enabled {
            assigned.push(("mq2", pins.mq2));
        }

        let mut seen = HashSet::new();
        for (name, pin) in assigned {
            if pin > MAX_BCM_PIN {
                return Err(ConfigError::Invalid(format!(
                    "pin {} = {} is not a header GPIO (0..={})",
                    name, pin, MAX_BCM_PIN
                )));
            }
            if !seen.insert(pin) {
                return Err(ConfigError::Invalid(format!(
                    "GPIO{} is assigned more than once (at {})",
                    pin, name
                )));
            }
        }

        if self.vent.temp_low > self.vent.temp_high {
            return Err(ConfigError::Invalid(format!(
                "vent.temp_low ({}) is above vent.temp_high ({})",
                self.vent.temp_low, self.vent.temp_high
            )));
        }

        let intervals = [
            ("vent.no_motion_close_secs", self.vent.no_motion_close_secs),
            ("vent.min_change_interval_secs", self.vent.min_change_interval_secs),
            ("timing.publish_interval_secs", self.timing.publish_interval_secs),
        ];
        for (name, secs) in intervals {
            if secs > MAX_INTERVAL_SECS {
                return Err(ConfigError::Invalid(format!(
                    "{} = {} exceeds {} seconds",
                    name, secs, MAX_INTERVAL_SECS
                )));
            }
        }

        if self.pubnub.enabled && self.pubnub.channel.is_empty() {
            return Err(ConfigError::Invalid("pubnub.channel is empty".to_string()));
        }

        Ok(())
    }
}

/// Clamped so a config that skipped validation still gives a usable delta
fn interval(secs: u64) -> TimeDelta {
    TimeDelta::seconds(secs.min(MAX_INTERVAL_SECS) as i64)
}

impl VentConfig {
    pub fn settle_time(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn no_motion_close(&self) -> TimeDelta {
        interval(self.no_motion_close_secs)
    }

    pub fn min_change_interval(&self) -> TimeDelta {
        interval(self.min_change_interval_secs)
    }
}

impl TimingConfig {
    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }

    pub fn welcome_time(&self) -> Duration {
        Duration::from_millis(self.welcome_ms)
    }

    pub fn publish_interval(&self) -> TimeDelta {
        interval(self.publish_interval_secs)
    }
}

impl ServerConfig {
    pub fn settle_time(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}
