use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use log::{info, warn};
use tokio::time::{interval, sleep, MissedTickBehavior};

use vent_station::core::Settings;
use vent_station::hardware::rpi::{open_gpio, open_motion_sensor};
use vent_station::hardware::{MotionTracker, TriggerMode};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let settings = Settings::load().context("loading configuration")?;
    let gpio = open_gpio().context("opening GPIO")?;
    let mut sensor = open_motion_sensor(&gpio, settings.pins.pir).context("opening PIR sensor")?;

    info!("Waiting for PIR sensor to initialise...");
    sleep(Duration::from_secs(settings.timing.pir_warmup_secs)).await;
    info!("PIR sensor ready, press Ctrl+C to exit");

    let mut tracker = MotionTracker::new(
        TriggerMode::Level,
        Duration::from_millis(settings.timing.motion_debounce_ms),
    );
    let mut ticker = interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let now = Local::now();
                match sensor.motion() {
                    Ok(true) => {
                        if let Some(count) = tracker.observe(now, true) {
                            info!("[{}] Motion detected! Total: {}", now.format("%H:%M:%S"), count);
                        }
                    }
                    Ok(false) => {
                        tracker.observe(now, false);
                        info!("[{}] No motion", now.format("%H:%M:%S"));
                    }
                    Err(e) => warn!("PIR read failed: {}", e),
                }
            }
        }
    }

    info!("PIR test finished after {} motion events", tracker.count());
    Ok(())
}
