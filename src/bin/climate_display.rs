use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::time::{interval, sleep, MissedTickBehavior};

use vent_station::core::Settings;
use vent_station::hardware::rpi::{open_dht11, open_gpio, open_lcd};
use vent_station::hardware::TextDisplay;
use vent_station::vent::display::climate_screen;
use vent_station::vent::Screen;

const UPDATE_INTERVAL: Duration = Duration::from_secs(2);

fn show(lcd: &mut dyn TextDisplay, screen: &Screen) {
    if let Err(e) = lcd.show(&screen.top, &screen.bottom) {
        error!("LCD write failed: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let settings = Settings::load().context("loading configuration")?;
    let gpio = open_gpio().context("opening GPIO")?;
    let mut lcd = open_lcd(&gpio, &settings.pins.lcd).context("opening LCD")?;
    info!("LCD initialized");
    let mut sensor = open_dht11(&gpio, settings.pins.dht).context("opening DHT11")?;

    show(&mut lcd, &Screen::new("Temp&Humid System", "Starting..."));
    sleep(settings.timing.welcome_time()).await;

    info!("Starting to read DHT11 sensor data...");
    let mut failures: u32 = 0;
    let mut ticker = interval(UPDATE_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => match sensor.read_frame() {
                Ok(reading) => {
                    show(&mut lcd, &climate_screen(&reading));
                    info!(
                        "Temperature: {:.1}C, Humidity: {:.1}%",
                        reading.temperature, reading.humidity
                    );
                    failures = 0;
                }
                Err(e) => {
                    failures += 1;
                    warn!("Failed to read sensor, attempt {}: {}", failures, e);
                    if failures > settings.timing.failure_threshold {
                        show(&mut lcd, &Screen::sensor_error());
                    }
                }
            },
        }
    }

    show(&mut lcd, &Screen::shutdown());
    sleep(Duration::from_secs(1)).await;
    info!("Program exited");
    Ok(())
}
