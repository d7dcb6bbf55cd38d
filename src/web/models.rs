use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::ServoCommandError;

/// A numeric request field as clients actually send it: integer, float or
/// numeric string. Any other JSON value is kept so the command can be
/// rejected with a reason instead of failing the whole body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
    Text(String),
    Other(Value),
}

impl Number {
    /// Whole-degree value; floats are truncated towards zero
    pub fn to_int(&self) -> Result<i64, ServoCommandError> {
        match self {
            Number::Int(value) => Ok(*value),
            Number::Float(value) if value.is_finite() => Ok(value.trunc() as i64),
            Number::Float(value) => Err(ServoCommandError::InvalidAngle(value.to_string())),
            Number::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| ServoCommandError::InvalidAngle(text.clone())),
            Number::Other(value) => Err(ServoCommandError::InvalidAngle(value.to_string())),
        }
    }

    /// Like `to_int`, narrowed to an angle; values beyond `i32` fail the
    /// range check rather than wrapping
    pub fn to_angle(&self) -> Result<i32, ServoCommandError> {
        let value = self.to_int()?;
        Ok(value.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }

    pub fn to_seconds(&self) -> Result<f64, ServoCommandError> {
        let seconds = match self {
            Number::Int(value) => *value as f64,
            Number::Float(value) => *value,
            Number::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| ServoCommandError::InvalidDelay)?,
            Number::Other(_) => return Err(ServoCommandError::InvalidDelay),
        };
        if seconds.is_finite() && seconds >= 0.0 {
            Ok(seconds)
        } else {
            Err(ServoCommandError::InvalidDelay)
        }
    }
}

fn default_angle() -> Number {
    Number::Int(90)
}

fn default_position() -> Value {
    Value::String("center".to_string())
}

fn default_sweep_start() -> Number {
    Number::Int(-100)
}

fn default_sweep_end() -> Number {
    Number::Int(270)
}

fn default_sweep_step() -> Number {
    Number::Int(10)
}

fn default_sweep_delay() -> Number {
    Number::Float(0.1)
}

/// Body of `POST /api/set_angle`
#[derive(Debug, Deserialize)]
pub struct SetAngleRequest {
    #[serde(default = "default_angle")]
    pub angle: Number,
}

/// Body of `POST /api/preset`
#[derive(Debug, Deserialize)]
pub struct PresetRequest {
    #[serde(default = "default_position")]
    pub position: Value,
}

impl PresetRequest {
    /// Preset name, when the client sent a string
    pub fn name(&self) -> Option<&str> {
        self.position.as_str()
    }
}

/// Body of `POST /api/sweep`
#[derive(Debug, Deserialize)]
pub struct SweepRequest {
    #[serde(default = "default_sweep_start")]
    pub start: Number,
    #[serde(default = "default_sweep_end")]
    pub end: Number,
    #[serde(default = "default_sweep_step")]
    pub step: Number,
    /// Seconds to wait on each step
    #[serde(default = "default_sweep_delay")]
    pub delay: Number,
}

/// `GET /api/get_angle`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AngleResponse {
    pub angle: i32,
}

/// Reply to every servo command
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CommandResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandResponse {
    fn success() -> Self {
        Self {
            status: "success".to_string(),
            angle: None,
            position: None,
            start: None,
            end: None,
            message: None,
        }
    }

    pub fn angle(angle: i32) -> Self {
        Self {
            angle: Some(angle),
            ..Self::success()
        }
    }

    pub fn preset(angle: i32, position: &str) -> Self {
        Self {
            angle: Some(angle),
            position: Some(position.to_string()),
            ..Self::success()
        }
    }

    pub fn sweep(start: i32, end: i32) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::success()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
            ..Self::success()
        }
    }
}

impl From<Result<CommandResponse, ServoCommandError>> for CommandResponse {
    fn from(result: Result<CommandResponse, ServoCommandError>) -> Self {
        result.unwrap_or_else(|e| CommandResponse::error(e.to_string()))
    }
}
