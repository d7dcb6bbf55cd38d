//! Configuration and error types shared by every program

pub mod config;
pub mod error;

pub use config::Settings;
pub use error::{ConfigError, DeviceError, DhtError, PublishError, ServoCommandError};
