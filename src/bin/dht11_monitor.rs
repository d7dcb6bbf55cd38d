use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::time::{interval, MissedTickBehavior};

use vent_station::core::Settings;
use vent_station::hardware::rpi::{open_dht11, open_gpio};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let settings = Settings::load().context("loading configuration")?;
    let gpio = open_gpio().context("opening GPIO")?;
    let mut sensor = open_dht11(&gpio, settings.pins.dht).context("opening DHT11")?;

    let mut ticker = interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => match sensor.read_frame() {
                Ok(reading) => info!(
                    "Temperature: {:.1}C, Humidity: {:.1}%",
                    reading.temperature, reading.humidity
                ),
                Err(e) => warn!("Read failed: {}", e),
            },
        }
    }

    info!("DHT11 monitor stopped");
    Ok(())
}
