use actix_web::web;
use anyhow::{Context, Result};
use log::info;

use vent_station::core::Settings;
use vent_station::hardware::rpi::{open_gpio, open_servo};
use vent_station::hardware::ServoProfile;
use vent_station::web::{start_server, ServoController};

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let settings = Settings::load().context("loading configuration")?;
    let gpio = open_gpio().context("opening GPIO")?;
    let servo = open_servo(&gpio, settings.pins.servo, ServoProfile::Extended)
        .context("opening servo")?;

    let controller = web::Data::new(ServoController::new(
        Box::new(servo),
        settings.server.settle_time(),
    ));
    start_server(controller, &settings.server)
        .await
        .context("running servo API")?;

    info!("Servo API stopped");
    Ok(())
}
