use std::time::Duration;

use log::{debug, info};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::core::error::ServoCommandError;
use crate::hardware::{ServoProfile, VentActuator};

/// Angle the servo is assumed to sit at when the server starts
pub const START_ANGLE: i32 = 90;

/// Named positions accepted by the preset endpoint
pub const PRESETS: [(&str, i32); 5] = [
    ("far_left", -100),
    ("left", 0),
    ("center", 90),
    ("right", 180),
    ("far_right", 270),
];

pub fn preset_angle(name: &str) -> Option<i32> {
    PRESETS
        .iter()
        .find(|(preset, _)| *preset == name)
        .map(|(_, angle)| *angle)
}

/// Angles visited by a sweep: from `start` towards `end` in `step` increments,
/// ending on `end` only when it lies on the step grid
pub fn sweep_angles(start: i32, end: i32, step: i32) -> Result<Vec<i32>, ServoCommandError> {
    if step <= 0 {
        return Err(ServoCommandError::InvalidStep);
    }
    let step = step as usize;
    let angles = if start <= end {
        (start..=end).step_by(step).collect()
    } else {
        (end..=start).rev().step_by(step).collect()
    };
    Ok(angles)
}

fn check_range(angle: i32) -> Result<(), ServoCommandError> {
    let profile = ServoProfile::Extended;
    if profile.contains(angle) {
        Ok(())
    } else {
        let (min, max) = profile.range();
        Err(ServoCommandError::AngleOutOfRange { min, max })
    }
}

struct ServoState {
    actuator: Box<dyn VentActuator>,
    angle: i32,
}

/// Serialised access to the remotely controlled servo
pub struct ServoController {
    state: Mutex<ServoState>,
    settle: Duration,
}

impl ServoController {
    pub fn new(actuator: Box<dyn VentActuator>, settle: Duration) -> Self {
        Self {
            state: Mutex::new(ServoState {
                actuator,
                angle: START_ANGLE,
            }),
            settle,
        }
    }

    /// Last angle commanded
    pub async fn angle(&self) -> i32 {
        self.state.lock().await.angle
    }

    /// Move to `angle`, wait for the horn to get there, then stop the pulses
    pub async fn set_angle(&self, angle: i32) -> Result<i32, ServoCommandError> {
        check_range(angle)?;

        let mut state = self.state.lock().await;
        let pulse = state.actuator.move_to(angle)?;
        state.angle = angle;
        debug!("Servo pulse {} us", pulse.as_micros());
        sleep(self.settle).await;
        state.actuator.release()?;

        info!("Servo set to {} degrees", angle);
        Ok(angle)
    }

    pub async fn preset(&self, name: &str) -> Result<i32, ServoCommandError> {
        let angle = preset_angle(name).ok_or(ServoCommandError::UnknownPreset)?;
        self.set_angle(angle).await
    }

    /// Step through a sweep, pausing `delay` on each angle
    pub async fn sweep(
        &self,
        start: i32,
        end: i32,
        step: i32,
        delay: Duration,
    ) -> Result<(i32, i32), ServoCommandError> {
        check_range(start)?;
        check_range(end)?;
        let angles = sweep_angles(start, end, step)?;

        let mut state = self.state.lock().await;
        info!(
            "Sweeping servo {} -> {} in steps of {} ({} positions)",
            start,
            end,
            step,
            angles.len()
        );
        for angle in angles {
            state.actuator.move_to(angle)?;
            state.angle = angle;
            sleep(delay).await;
        }
        state.actuator.release()?;

        Ok((start, end))
    }
}
