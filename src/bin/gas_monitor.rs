use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::time::{interval, sleep, MissedTickBehavior};

use vent_station::core::Settings;
use vent_station::hardware::mq2::GasChange;
use vent_station::hardware::rpi::{open_gas_sensor, open_gpio};
use vent_station::hardware::GasTracker;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let settings = Settings::load().context("loading configuration")?;
    let gpio = open_gpio().context("opening GPIO")?;
    let mut sensor = open_gas_sensor(&gpio, settings.pins.mq2, settings.gas.active_low)
        .context("opening MQ-2 sensor")?;

    info!(
        "Waiting for sensor to stabilize ({} seconds)...",
        settings.timing.mq2_warmup_secs
    );
    sleep(Duration::from_secs(settings.timing.mq2_warmup_secs)).await;
    info!("Sensor ready!");

    let mut tracker = GasTracker::new();
    let mut ticker = interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => match sensor.gas_detected() {
                Ok(detected) => match tracker.observe(detected) {
                    Some(GasChange::Initial(true)) => warn!("Initial state: Gas/Smoke detected!"),
                    Some(GasChange::Initial(false)) => info!("Initial state: No gas/smoke detected"),
                    Some(GasChange::Changed(true)) => warn!("Gas/Smoke detected!"),
                    Some(GasChange::Changed(false)) => info!("No gas/smoke detected"),
                    None => {}
                },
                Err(e) => warn!("MQ-2 read failed: {}", e),
            },
        }
    }

    info!("Gas monitor stopped");
    Ok(())
}
