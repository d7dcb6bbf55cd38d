use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use tokio::time::sleep;

use vent_station::core::Settings;
use vent_station::hardware::rpi::{open_gpio, open_servo};
use vent_station::hardware::{PwmOutput, Servo, ServoProfile};

const SETTLE: Duration = Duration::from_millis(500);
const PAUSE: Duration = Duration::from_secs(1);
const POSITIONS: [i32; 3] = [0, 90, 180];

async fn sweep_forever<P: PwmOutput>(servo: &mut Servo<P>) -> Result<()> {
    loop {
        for angle in POSITIONS {
            let pulse = servo.set_angle(angle)?;
            sleep(SETTLE).await;
            servo.stop()?;
            info!("Moved to {} degrees ({} us)", angle, pulse.as_micros());
            sleep(PAUSE).await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let settings = Settings::load().context("loading configuration")?;
    let gpio = open_gpio().context("opening GPIO")?;
    let mut servo = open_servo(&gpio, settings.pins.servo, ServoProfile::Standard)
        .context("opening servo")?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        result = sweep_forever(&mut servo) => result?,
    }

    servo.stop()?;
    info!("Servo stopped");
    Ok(())
}
