//! Station assembly: sensors and links behind one agent-facing bundle.
//!
//! A [`Station`] owns one implementation of every collaborator trait
//! plus the availability flags settled at startup. The agent drives it;
//! [`into_stream`](Station::into_stream) exposes the same sampling as a
//! plain async stream for embedding elsewhere.

pub mod sim;
pub mod traits;

// Re-export commonly used items
pub use traits::{
    ClimateReading, ClimateSensor, LightMode, LightSensor, MemoryProbe, SoilAdc,
    SystemMemoryProbe, TelemetryLink, WifiLink, WifiStatus,
};

use futures_util::stream::{self, BoxStream};
use tokio::time::{self, Duration};
use tracing::{info, warn};

use crate::reading::StationSnapshot;
use crate::soil::SoilCalibration;

/// Result of one sensor read attempt within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadAttempt {
    /// Sensor disabled since startup; nothing was attempted.
    Skipped,
    /// The read succeeded.
    Ok,
    /// The read failed; the sensor stays in rotation.
    Failed,
}

/// Per-sensor outcome of one sampling pass.
#[derive(Debug, Clone, Copy)]
pub struct SampleOutcome {
    /// The readings gathered this tick.
    pub snapshot: StationSnapshot,
    /// What happened to the climate sensor.
    pub climate: ReadAttempt,
    /// What happened to the light sensor.
    pub light: ReadAttempt,
    /// Whether an RSSI reading was taken (requires the link up).
    pub rssi_read: bool,
}

impl SampleOutcome {
    /// True when nothing that was attempted failed. Disabled sensors do
    /// not count against the tick.
    pub fn all_ok(&self) -> bool {
        self.climate != ReadAttempt::Failed && self.light != ReadAttempt::Failed
    }
}

/// The agent-facing sensor rig.
pub struct Station {
    climate: Box<dyn ClimateSensor>,
    light: Box<dyn LightSensor>,
    soil: Box<dyn SoilAdc>,
    wifi: Box<dyn WifiLink>,
    telemetry: Box<dyn TelemetryLink>,
    climate_ready: bool,
    light_ready: bool,
}

impl Station {
    /// Bundle a set of collaborators. Sensors start disabled until
    /// [`init_sensors`](Station::init_sensors) runs their handshakes.
    pub fn new(
        climate: Box<dyn ClimateSensor>,
        light: Box<dyn LightSensor>,
        soil: Box<dyn SoilAdc>,
        wifi: Box<dyn WifiLink>,
        telemetry: Box<dyn TelemetryLink>,
    ) -> Self {
        Self {
            climate,
            light,
            soil,
            wifi,
            telemetry,
            climate_ready: false,
            light_ready: false,
        }
    }

    /// Run every sensor's startup handshake once.
    ///
    /// A failed handshake logs the sensor as disabled and it is skipped
    /// for the rest of the process. Transient read failures later on
    /// never disable anything; only this handshake decides membership.
    pub fn init_sensors(&mut self, light_mode: LightMode) {
        match self.climate.init() {
            Ok(()) => {
                self.climate_ready = true;
                info!("climate sensor initialized");
            }
            Err(err) => warn!("climate sensor unavailable, disabling: {}", err),
        }
        match self.light.init(light_mode) {
            Ok(()) => {
                self.light_ready = true;
                info!(mode = ?light_mode, "light sensor initialized");
            }
            Err(err) => warn!("light sensor unavailable, disabling: {}", err),
        }
    }

    /// Whether the climate sensor survived its handshake.
    pub fn climate_ready(&self) -> bool {
        self.climate_ready
    }

    /// Whether the light sensor survived its handshake.
    pub fn light_ready(&self) -> bool {
        self.light_ready
    }

    /// Read every source once, reads completing before any publishing.
    ///
    /// Disabled sensors are skipped, failed reads leave their fields
    /// empty, the soil pin is always read, and RSSI is taken only while
    /// the WiFi link is up.
    pub fn sample(&mut self, calibration: &SoilCalibration) -> SampleOutcome {
        let mut snapshot = StationSnapshot::new();

        let climate = if self.climate_ready {
            match self.climate.read() {
                Ok(reading) => {
                    snapshot.temperature_c = Some(reading.temperature_c);
                    snapshot.humidity_pct = Some(reading.humidity_pct);
                    ReadAttempt::Ok
                }
                Err(err) => {
                    warn!("climate read failed: {}", err);
                    ReadAttempt::Failed
                }
            }
        } else {
            ReadAttempt::Skipped
        };

        let light = if self.light_ready {
            match self.light.read() {
                Ok(lux) => {
                    snapshot.illuminance_lux = Some(lux);
                    ReadAttempt::Ok
                }
                Err(err) => {
                    warn!("light read failed: {}", err);
                    ReadAttempt::Failed
                }
            }
        } else {
            ReadAttempt::Skipped
        };

        snapshot.soil_raw = self.soil.read_raw();
        snapshot.soil_pct = calibration.moisture_percent(snapshot.soil_raw);

        let rssi_read = if self.wifi.status().is_connected() {
            snapshot.wifi_rssi_dbm = self.wifi.rssi_dbm();
            snapshot.wifi_rssi_dbm.is_some()
        } else {
            false
        };

        SampleOutcome {
            snapshot,
            climate,
            light,
            rssi_read,
        }
    }

    /// The WiFi link.
    pub fn wifi(&self) -> &dyn WifiLink {
        self.wifi.as_ref()
    }

    /// The WiFi link, mutably.
    pub fn wifi_mut(&mut self) -> &mut dyn WifiLink {
        self.wifi.as_mut()
    }

    /// The telemetry transport.
    pub fn telemetry(&self) -> &dyn TelemetryLink {
        self.telemetry.as_ref()
    }

    /// The telemetry transport, mutably.
    pub fn telemetry_mut(&mut self) -> &mut dyn TelemetryLink {
        self.telemetry.as_mut()
    }

    /// Turn the station into a fixed-interval sampling stream.
    ///
    /// The first snapshot is yielded immediately, then one per
    /// interval. This is the read side only; publishing and link upkeep
    /// stay with the agent.
    pub fn into_stream(
        self,
        calibration: SoilCalibration,
        interval: Duration,
    ) -> BoxStream<'static, StationSnapshot> {
        let ticker = time::interval(interval);
        let stream = stream::unfold((self, ticker), move |(mut station, mut ticker)| async move {
            ticker.tick().await;
            let outcome = station.sample(&calibration);
            Some((outcome.snapshot, (station, ticker)))
        });
        Box::pin(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::sim;
    use futures_util::StreamExt;

    #[tokio::test(start_paused = true)]
    async fn healthy_station_fills_every_field() {
        let (mut station, _handles) = sim::steady(42);
        station.init_sensors(LightMode::default());
        station.wifi_mut().connect("net", "pass");

        let outcome = station.sample(&SoilCalibration::default());
        assert_eq!(outcome.climate, ReadAttempt::Ok);
        assert_eq!(outcome.light, ReadAttempt::Ok);
        assert!(outcome.rssi_read);
        assert!(outcome.all_ok());

        let snapshot = outcome.snapshot;
        assert!(snapshot.temperature_c.is_some());
        assert!(snapshot.humidity_pct.is_some());
        assert!(snapshot.illuminance_lux.is_some());
        assert!((0.0..=100.0).contains(&snapshot.soil_pct));
        assert!(snapshot.wifi_rssi_dbm.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn sensors_are_skipped_until_initialized() {
        let (mut station, _handles) = sim::steady(42);

        let outcome = station.sample(&SoilCalibration::default());
        assert_eq!(outcome.climate, ReadAttempt::Skipped);
        assert_eq!(outcome.light, ReadAttempt::Skipped);
        assert!(outcome.all_ok());
        assert!(outcome.snapshot.temperature_c.is_none());
        // The analog pin has no handshake to wait for.
        assert!(outcome.snapshot.soil_raw > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_handshake_disables_the_sensor_permanently() {
        let (mut station, _handles) = sim::builder(42).climate_init_fails().build();
        station.init_sensors(LightMode::default());

        assert!(!station.climate_ready());
        assert!(station.light_ready());

        for _ in 0..3 {
            let outcome = station.sample(&SoilCalibration::default());
            assert_eq!(outcome.climate, ReadAttempt::Skipped);
            assert_eq!(outcome.light, ReadAttempt::Ok);
            assert!(outcome.all_ok());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_keeps_the_sensor_in_rotation() {
        let (mut station, _handles) = sim::builder(42).climate_fails_every(2).build();
        station.init_sensors(LightMode::default());

        let first = station.sample(&SoilCalibration::default());
        assert_eq!(first.climate, ReadAttempt::Ok);

        let second = station.sample(&SoilCalibration::default());
        assert_eq!(second.climate, ReadAttempt::Failed);
        assert!(!second.all_ok());
        assert!(second.snapshot.temperature_c.is_none());
        // Light and soil are untouched by the climate failure.
        assert_eq!(second.light, ReadAttempt::Ok);

        let third = station.sample(&SoilCalibration::default());
        assert_eq!(third.climate, ReadAttempt::Ok);
    }

    #[tokio::test(start_paused = true)]
    async fn rssi_is_not_read_while_the_link_is_down() {
        let (mut station, _handles) = sim::steady(42);
        station.init_sensors(LightMode::default());

        // connect was never called, so the link is down.
        let outcome = station.sample(&SoilCalibration::default());
        assert!(!outcome.rssi_read);
        assert!(outcome.snapshot.wifi_rssi_dbm.is_none());
        assert!(outcome.all_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn stream_yields_snapshots_at_the_interval() {
        let (mut station, _handles) = sim::steady(42);
        station.init_sensors(LightMode::default());

        let start = time::Instant::now();
        let mut stream =
            station.into_stream(SoilCalibration::default(), Duration::from_secs(2));

        for expected_ms in [0u64, 2000, 4000] {
            let snapshot = stream.next().await.unwrap();
            assert!(snapshot.illuminance_lux.is_some());
            assert_eq!(start.elapsed().as_millis() as u64, expected_ms);
        }
    }
}
