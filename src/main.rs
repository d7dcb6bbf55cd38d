use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};

use vent_station::cloud::{PubNubPublisher, Publisher};
use vent_station::core::Settings;
use vent_station::hardware::rpi::open_station;
use vent_station::vent::{warm_up_sensors, SmartVent};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    info!("Starting smart air vent...");

    let settings = Settings::load().context("loading configuration")?;
    let station = open_station(&settings).context("opening station hardware")?;

    let publisher: Option<Arc<dyn Publisher>> = if settings.pubnub.enabled {
        let publisher = PubNubPublisher::new(&settings.pubnub).context("creating PubNub client")?;
        info!(
            "Publishing to channel {} as {}",
            publisher.channel(),
            publisher.uuid()
        );
        Some(Arc::new(publisher))
    } else {
        warn!("PubNub publishing disabled");
        None
    };

    warm_up_sensors(&settings).await;

    let mut smart_vent = SmartVent::new(station, &settings, publisher);

    info!("Smart air vent is running. Press Ctrl+C to stop.");
    smart_vent
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("running smart vent")?;

    info!("Smart air vent shutdown complete");
    Ok(())
}
