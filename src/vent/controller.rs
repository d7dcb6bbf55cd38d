use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};

use crate::cloud::SensorMessage;
use crate::core::config::Settings;
use crate::hardware::{ClimateReading, GasTracker, MotionTracker, TriggerMode};
use crate::vent::display::{self, PageContext, Screen};
use crate::vent::policy::{decide_vent_position, VentThresholds};

/// Everything read from the sensors in one loop pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub reading: ClimateReading,
    pub motion: bool,
    /// `None` when the gas sensor is not fitted
    pub gas: Option<bool>,
}

/// A vent movement the controller wants carried out
#[derive(Debug, Clone, PartialEq)]
pub struct VentChange {
    pub from: i32,
    pub to: i32,
    pub reason: String,
}

/// Outcome of a pass with a good reading
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// New motion total when this pass counted a motion event
    pub motion_event: Option<u32>,
    /// Gas appeared since the previous pass
    pub gas_alert: bool,
    pub vent_change: Option<VentChange>,
    pub screen: Screen,
    /// Set when a publish is due
    pub publish: Option<SensorMessage>,
}

/// Outcome of a pass where the climate sensor could not be read
#[derive(Debug, Clone, PartialEq)]
pub struct FailureReport {
    /// Consecutive failures so far
    pub attempts: u32,
    /// Replace the display with the error screen
    pub show_error: bool,
}

/// Decision state of the smart vent, free of any I/O.
///
/// The runner feeds it one `Sample` (or failure) per loop pass and carries out
/// whatever the returned report asks for.
#[derive(Debug, Clone)]
pub struct VentController {
    thresholds: VentThresholds,
    change_interval: TimeDelta,
    publish_interval: TimeDelta,
    failure_threshold: u32,
    gas_enabled: bool,
    motion: MotionTracker,
    gas: GasTracker,
    position: i32,
    reason: String,
    last_change: Option<DateTime<Local>>,
    last_publish: Option<DateTime<Local>>,
    failures: u32,
}

impl VentController {
    pub fn new(settings: &Settings, started: DateTime<Local>) -> Self {
        Self {
            thresholds: VentThresholds::from(&settings.vent),
            change_interval: settings.vent.min_change_interval(),
            publish_interval: settings.timing.publish_interval(),
            failure_threshold: settings.timing.failure_threshold,
            gas_enabled: settings.gas.enabled,
            motion: MotionTracker::new(
                TriggerMode::RisingEdge,
                Duration::from_millis(settings.timing.motion_debounce_ms),
            )
            .starting_at(started),
            gas: GasTracker::new(),
            position: settings.vent.initial_angle,
            reason: "Initial state".to_string(),
            last_change: None,
            last_publish: None,
            failures: 0,
        }
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn motion_count(&self) -> u32 {
        self.motion.count()
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn gas_enabled(&self) -> bool {
        self.gas_enabled
    }

    /// Process a pass with a valid climate reading
    pub fn on_sample(&mut self, now: DateTime<Local>, sample: Sample) -> TickReport {
        let motion_event = self.motion.observe(now, sample.motion);

        let gas_now = sample.gas.unwrap_or(false);
        let gas_alert = sample.gas.is_some() && self.gas.is_rising(gas_now);
        if sample.gas.is_some() {
            self.gas.observe(gas_now);
        }

        let vent_change = if self.vent_change_allowed(now) {
            self.consider_vent(now, &sample)
        } else {
            None
        };

        let screen = display::render_current(
            self.gas_enabled,
            &PageContext {
                now,
                reading: &sample.reading,
                motion: sample.motion,
                gas: gas_now,
                vent_angle: self.position,
                reason: &self.reason,
            },
        );

        self.failures = 0;

        let publish = if self.publish_due(now) {
            self.last_publish = Some(now);
            Some(SensorMessage {
                temperature: sample.reading.temperature,
                humidity: sample.reading.humidity,
                motion: sample.motion,
                gas_detected: sample.gas,
            })
        } else {
            None
        };

        TickReport {
            motion_event,
            gas_alert,
            vent_change,
            screen,
            publish,
        }
    }

    /// Process a pass where the climate sensor failed
    pub fn on_read_failure(&mut self) -> FailureReport {
        self.failures += 1;
        FailureReport {
            attempts: self.failures,
            show_error: self.failures > self.failure_threshold,
        }
    }

    fn vent_change_allowed(&self, now: DateTime<Local>) -> bool {
        self.last_change
            .map_or(true, |last| now.signed_duration_since(last) > self.change_interval)
    }

    fn publish_due(&self, now: DateTime<Local>) -> bool {
        self.last_publish
            .map_or(true, |last| now.signed_duration_since(last) > self.publish_interval)
    }

    fn consider_vent(&mut self, now: DateTime<Local>, sample: &Sample) -> Option<VentChange> {
        let last_motion = self.motion.last_event().unwrap_or(now);
        let decision = decide_vent_position(
            &self.thresholds,
            &sample.reading,
            sample.motion,
            sample.gas,
            last_motion,
            now,
        );

        if decision.angle == self.position {
            return None;
        }

        let change = VentChange {
            from: self.position,
            to: decision.angle,
            reason: decision.reason.clone(),
        };
        self.position = decision.angle;
        self.reason = decision.reason;
        self.last_change = Some(now);
        Some(change)
    }
}
