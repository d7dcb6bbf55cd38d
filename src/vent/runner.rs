use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use tokio::time::{interval, sleep, MissedTickBehavior};

use crate::cloud::{Publisher, SensorMessage};
use crate::core::config::Settings;
use crate::core::error::DeviceError;
use crate::hardware::{ClimateReading, Station};
use crate::vent::controller::{Sample, VentController};
use crate::vent::display::Screen;

/// Pause on the goodbye screen before the outputs are let go
const SHUTDOWN_PAUSE: Duration = Duration::from_secs(1);

/// Let the PIR settle, then the MQ-2 heat up when it is fitted, before the
/// first reading is taken
pub async fn warm_up_sensors(settings: &Settings) {
    info!("Waiting for PIR sensor to settle...");
    sleep(Duration::from_secs(settings.timing.pir_warmup_secs)).await;
    info!("PIR sensor ready");

    if settings.gas.enabled {
        info!("Waiting for MQ-2 sensor to stabilize...");
        sleep(Duration::from_secs(settings.timing.mq2_warmup_secs)).await;
        info!("MQ-2 sensor ready");
    }
}

/// The smart vent program: owns the station hardware and runs the control loop
pub struct SmartVent {
    station: Station,
    controller: VentController,
    publisher: Option<Arc<dyn Publisher>>,
    settle: Duration,
    loop_interval: Duration,
    welcome: Duration,
}

impl SmartVent {
    pub fn new(
        station: Station,
        settings: &Settings,
        publisher: Option<Arc<dyn Publisher>>,
    ) -> Self {
        Self {
            station,
            controller: VentController::new(settings, Local::now()),
            publisher,
            settle: settings.vent.settle_time(),
            loop_interval: settings.timing.loop_interval(),
            welcome: settings.timing.welcome_time(),
        }
    }

    pub fn controller(&self) -> &VentController {
        &self.controller
    }

    /// Welcome screen, then park the vent at its initial position
    pub async fn start(&mut self) -> Result<(), DeviceError> {
        self.show(&Screen::welcome())?;
        sleep(self.welcome).await;

        let initial = self.controller.position();
        self.move_vent(initial).await?;
        info!("Smart vent ready, vent at {} degrees", initial);
        Ok(())
    }

    /// Run until `shutdown` resolves, then put up the goodbye screen
    pub async fn run<F>(&mut self, shutdown: F) -> Result<(), DeviceError>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;

        let mut ticker = interval(self.loop_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick(Local::now()).await {
                        error!("Control loop pass failed: {}", e);
                    }
                }
            }
        }

        self.shutdown().await
    }

    /// One pass of the control loop
    pub async fn tick(&mut self, now: DateTime<Local>) -> Result<(), DeviceError> {
        match self.station.climate.read() {
            Ok(reading) => self.on_reading(now, reading).await,
            Err(e) => {
                let report = self.controller.on_read_failure();
                warn!("Failed to read DHT11 sensor (attempt {}): {}", report.attempts, e);
                if report.show_error {
                    self.show(&Screen::sensor_error())?;
                }
                Ok(())
            }
        }
    }

    pub async fn shutdown(&mut self) -> Result<(), DeviceError> {
        info!("Shutting down smart vent");
        self.show(&Screen::shutdown())?;
        sleep(SHUTDOWN_PAUSE).await;
        self.station.vent.release()
    }

    async fn on_reading(
        &mut self,
        now: DateTime<Local>,
        reading: ClimateReading,
    ) -> Result<(), DeviceError> {
        let motion = self.station.motion.detected()?;
        let gas = match self.station.gas.as_mut() {
            Some(sensor) => Some(sensor.detected()?),
            None => None,
        };

        let report = self.controller.on_sample(
            now,
            Sample {
                reading,
                motion,
                gas,
            },
        );

        if let Some(count) = report.motion_event {
            info!("Motion detected! Count: {}", count);
        }
        if report.gas_alert {
            warn!("Gas/smoke detected!");
        }
        if let Some(change) = &report.vent_change {
            info!(
                "Vent {} -> {} degrees: {}",
                change.from, change.to, change.reason
            );
            self.move_vent(change.to).await?;
        }

        self.show(&report.screen)?;

        match gas {
            Some(gas) => info!(
                "Temp: {:.1}C, Humidity: {:.1}%, Motion: {}, Gas: {}, Vent: {}",
                reading.temperature,
                reading.humidity,
                motion,
                gas,
                self.controller.position()
            ),
            None => info!(
                "Temp: {:.1}C, Humidity: {:.1}%, Motion: {}, Vent: {}",
                reading.temperature,
                reading.humidity,
                motion,
                self.controller.position()
            ),
        }

        if let Some(message) = report.publish {
            self.publish(&message).await;
        }
        Ok(())
    }

    async fn move_vent(&mut self, angle: i32) -> Result<(), DeviceError> {
        let pulse = self.station.vent.move_to(angle)?;
        debug!("Vent pulse {} us for {} degrees", pulse.as_micros(), angle);
        sleep(self.settle).await;
        self.station.vent.release()
    }

    async fn publish(&self, message: &SensorMessage) {
        let Some(publisher) = &self.publisher else {
            return;
        };
        match publisher.publish(message).await {
            Ok(timetoken) => debug!("Published sensor data, timetoken {}", timetoken),
            Err(e) => error!("Failed to publish sensor data: {}", e),
        }
    }

    fn show(&mut self, screen: &Screen) -> Result<(), DeviceError> {
        self.station.display.show(&screen.top, &screen.bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::publisher::MockPublisher;
    use crate::core::error::{DhtError, PublishError};
    use crate::hardware::{
        MockBinarySensor, MockClimateSensor, MockTextDisplay, MockVentActuator,
    };
    use mockall::predicate::eq;
    use std::sync::Mutex;

    type ScreenLog = Arc<Mutex<Vec<(String, String)>>>;

    #[tokio::test(start_paused = true)]
    async fn test_warm_up_waits_for_pir() {
        let mut settings = Settings::default();
        settings.gas.enabled = false;
        let started = tokio::time::Instant::now();
        warm_up_sensors(&settings).await;
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_warm_up_adds_mq2_when_fitted() {
        let mut settings = Settings::default();
        settings.gas.enabled = true;
        let started = tokio::time::Instant::now();
        warm_up_sensors(&settings).await;
        assert_eq!(started.elapsed(), Duration::from_secs(12));
    }

    fn climate(temperature: f32, humidity: f32) -> MockClimateSensor {
        let mut sensor = MockClimateSensor::new();
        sensor.expect_read().returning(move || {
            Ok(ClimateReading {
                temperature,
                humidity,
            })
        });
        sensor
    }

    fn binary(level: bool) -> MockBinarySensor {
        let mut sensor = MockBinarySensor::new();
        sensor.expect_detected().returning(move || Ok(level));
        sensor
    }

    fn recording_display() -> (MockTextDisplay, ScreenLog) {
        let log: ScreenLog = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let mut display = MockTextDisplay::new();
        display.expect_show().returning(move |top, bottom| {
            sink.lock().unwrap().push((top.to_string(), bottom.to_string()));
            Ok(())
        });
        display.expect_clear().returning(|| Ok(()));
        (display, log)
    }

    fn idle_vent() -> MockVentActuator {
        let mut vent = MockVentActuator::new();
        vent.expect_move_to()
            .returning(|_| Ok(Duration::from_micros(1400)));
        vent.expect_release().returning(|| Ok(()));
        vent
    }

    fn settings(gas_enabled: bool) -> Settings {
        let mut settings = Settings::default();
        settings.gas.enabled = gas_enabled;
        settings
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_opens_vent_and_publishes() {
        let (display, screens) = recording_display();
        let mut vent = MockVentActuator::new();
        vent.expect_move_to()
            .with(eq(180))
            .times(1)
            .returning(|_| Ok(Duration::from_micros(2400)));
        vent.expect_release().times(1).returning(|| Ok(()));

        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish()
            .withf(|message| message.temperature == 30.0 && message.gas_detected.is_none())
            .times(1)
            .returning(|_| Ok("17000000000000000".to_string()));

        let station = Station {
            climate: Box::new(climate(30.0, 40.0)),
            motion: Box::new(binary(true)),
            gas: None,
            display: Box::new(display),
            vent: Box::new(vent),
        };
        let mut smart_vent = SmartVent::new(station, &settings(false), Some(Arc::new(publisher)));

        smart_vent.tick(Local::now()).await.unwrap();

        assert_eq!(smart_vent.controller().position(), 180);
        assert_eq!(smart_vent.controller().reason(), "High temp (30.0C)");
        assert_eq!(screens.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gas_forces_vent_open() {
        let (display, _screens) = recording_display();
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish()
            .withf(|message| message.gas_detected == Some(true))
            .times(1)
            .returning(|_| Ok("1".to_string()));

        let station = Station {
            climate: Box::new(climate(15.0, 40.0)),
            motion: Box::new(binary(false)),
            gas: Some(Box::new(binary(true))),
            display: Box::new(display),
            vent: Box::new(idle_vent()),
        };
        let mut smart_vent = SmartVent::new(station, &settings(true), Some(Arc::new(publisher)));

        smart_vent.tick(Local::now()).await.unwrap();

        assert_eq!(smart_vent.controller().position(), 180);
        assert_eq!(smart_vent.controller().reason(), "Gas/Smoke Detected");
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_failure_does_not_fail_tick() {
        let (display, _screens) = recording_display();
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish()
            .times(1)
            .returning(|_| Err(PublishError::Rejected("Invalid Key".to_string())));

        let station = Station {
            climate: Box::new(climate(22.0, 40.0)),
            motion: Box::new(binary(true)),
            gas: None,
            display: Box::new(display),
            vent: Box::new(idle_vent()),
        };
        let mut smart_vent = SmartVent::new(station, &settings(false), Some(Arc::new(publisher)));

        assert!(smart_vent.tick(Local::now()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failures_show_error_screen() {
        let (display, screens) = recording_display();
        let mut sensor = MockClimateSensor::new();
        sensor
            .expect_read()
            .returning(|| Err(DeviceError::Dht(DhtError::MissingData)));
        let mut motion = MockBinarySensor::new();
        motion.expect_detected().times(0);

        let station = Station {
            climate: Box::new(sensor),
            motion: Box::new(motion),
            gas: None,
            display: Box::new(display),
            vent: Box::new(idle_vent()),
        };
        let mut smart_vent = SmartVent::new(station, &settings(false), None);

        for _ in 0..5 {
            smart_vent.tick(Local::now()).await.unwrap();
        }
        assert!(screens.lock().unwrap().is_empty());

        smart_vent.tick(Local::now()).await.unwrap();
        assert_eq!(
            screens.lock().unwrap().last().cloned(),
            Some(("Sensor Error!".to_string(), "Check Connection".to_string()))
        );
        assert_eq!(smart_vent.controller().failures(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_starts_and_shuts_down() {
        let (display, screens) = recording_display();
        let mut vent = MockVentActuator::new();
        vent.expect_move_to()
            .with(eq(90))
            .returning(|_| Ok(Duration::from_micros(1400)));
        vent.expect_release().returning(|| Ok(()));

        let station = Station {
            climate: Box::new(climate(22.0, 40.0)),
            motion: Box::new(binary(true)),
            gas: None,
            display: Box::new(display),
            vent: Box::new(vent),
        };
        let mut smart_vent = SmartVent::new(station, &settings(false), None);

        smart_vent
            .run(sleep(Duration::from_millis(4500)))
            .await
            .unwrap();

        let screens = screens.lock().unwrap();
        assert_eq!(
            screens.first().cloned(),
            Some(("Smart Air Vent".to_string(), "Initializing...".to_string()))
        );
        assert_eq!(
            screens.last().cloned(),
            Some(("System Shutdown".to_string(), "Goodbye!".to_string()))
        );
        assert!(screens.len() > 2);
    }
}
