use thiserror::Error;

/// Errors raised by the device drivers
#[derive(Debug, Error)]
pub enum DeviceError {
    /// A GPIO pin could not be read or written
    #[error("pin error: {0}")]
    Pin(String),
    /// The GPIO peripheral or a pin could not be opened
    #[error("gpio setup failed: {0}")]
    Setup(String),
    /// DHT11 read failed
    #[error("dht11: {0}")]
    Dht(#[from] DhtError),
}

/// DHT11 read failures
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DhtError {
    /// The sensor stopped answering before all 40 bits arrived
    #[error("missing data")]
    MissingData,
    /// The frame checksum did not match its payload
    #[error("checksum mismatch (expected {expected:#04x}, got {actual:#04x})")]
    Checksum { expected: u8, actual: u8 },
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Cloud publish failures
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid origin {0}")]
    InvalidOrigin(String),
    #[error("message could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("publish rejected: {0}")]
    Rejected(String),
    #[error("publish failed with HTTP {status}: {reason}")]
    Status { status: u16, reason: String },
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

/// Errors reported back to servo API clients
#[derive(Debug, Error, PartialEq)]
pub enum ServoCommandError {
    #[error("angle must be between {min} and {max}")]
    AngleOutOfRange { min: i32, max: i32 },
    #[error("invalid angle value: {0}")]
    InvalidAngle(String),
    #[error("invalid preset position")]
    UnknownPreset,
    #[error("step must be a positive integer")]
    InvalidStep,
    #[error("delay must be a non-negative number of seconds")]
    InvalidDelay,
    #[error("{0}")]
    Device(String),
}

impl From<DeviceError> for ServoCommandError {
    fn from(err: DeviceError) -> Self {
        ServoCommandError::Device(err.to_string())
    }
}
