//! Deterministic simulated collaborators.
//!
//! Phase-shifted waveforms stand in for the physical environment so the
//! agent can run, and soak, on any development host. There is no RNG:
//! every value is a pure function of the seed and the time elapsed
//! since construction, which makes runs reproducible under a paused
//! test clock. Fault injection is scripted the same way, with failure
//! cadences and outage windows declared up front.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::time::{Duration, Instant};

use crate::error::SensorError;
use crate::station::traits::{
    ClimateReading, ClimateSensor, LightMode, LightSensor, MemoryProbe, SoilAdc, TelemetryLink,
    WifiLink, WifiStatus,
};
use crate::station::Station;
use crate::telemetry::Channel;

/// Unit sine of `elapsed` over a period, shifted by `phase` turns.
fn wave(elapsed: Duration, period_secs: f32, phase: f32) -> f32 {
    ((elapsed.as_secs_f32() / period_secs + phase) * std::f32::consts::TAU).sin()
}

/// Map a seed onto a phase offset in turns.
fn phase_for(seed: u64) -> f32 {
    (seed % 997) as f32 / 997.0
}

/// Shared counter for fire-and-forget connect attempts.
#[derive(Debug, Clone, Default)]
pub struct AttemptCounter(Arc<AtomicU64>);

impl AttemptCounter {
    /// Attempts recorded so far.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

/// One value a simulated transport was asked to send.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublishRecord {
    /// Target dashboard channel.
    pub channel: Channel,
    /// Value written.
    pub value: f64,
}

/// Shared capture of everything a simulated transport was asked to
/// send, in send order.
#[derive(Debug, Clone, Default)]
pub struct PublishLog(Arc<Mutex<Vec<PublishRecord>>>);

impl PublishLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, record: PublishRecord) {
        if let Ok(mut records) = self.0.lock() {
            records.push(record);
        }
    }

    /// Everything sent so far.
    pub fn records(&self) -> Vec<PublishRecord> {
        self.0.lock().map(|records| records.clone()).unwrap_or_default()
    }

    /// The channel sequence sent so far.
    pub fn channels(&self) -> Vec<Channel> {
        self.records().iter().map(|record| record.channel).collect()
    }

    /// Values sent to one channel, in send order.
    pub fn values_for(&self, channel: Channel) -> Vec<f64> {
        self.records()
            .iter()
            .filter(|record| record.channel == channel)
            .map(|record| record.value)
            .collect()
    }

    /// Number of records captured.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// True when nothing has been sent.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scripted downtime windows, measured from construction.
///
/// A window covers `[from, until)`: the link is down at `from` and back
/// up at `until`.
#[derive(Debug, Clone, Default)]
pub struct OutagePlan {
    windows: Vec<(Duration, Duration)>,
}

impl OutagePlan {
    /// A plan with no downtime.
    pub fn none() -> Self {
        Self::default()
    }

    /// Add one downtime window.
    pub fn outage(mut self, from: Duration, until: Duration) -> Self {
        self.windows.push((from, until));
        self
    }

    fn is_down(&self, elapsed: Duration) -> bool {
        self.windows
            .iter()
            .any(|(from, until)| elapsed >= *from && elapsed < *until)
    }
}

/// Simulated climate sensor with a slow diurnal drift.
pub struct SimClimate {
    epoch: Instant,
    phase: f32,
    init_fails: bool,
    fail_every: Option<u64>,
    reads: u64,
    initialized: bool,
}

impl SimClimate {
    /// Create a healthy sensor.
    pub fn new(seed: u64) -> Self {
        Self {
            epoch: Instant::now(),
            phase: phase_for(seed),
            init_fails: false,
            fail_every: None,
            reads: 0,
            initialized: false,
        }
    }

    /// Make the startup handshake fail, as if the sensor were absent.
    pub fn with_failing_init(mut self) -> Self {
        self.init_fails = true;
        self
    }

    /// Fail every n-th read attempt (n >= 1) to model a flaky bus.
    pub fn failing_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n.max(1));
        self
    }
}

impl ClimateSensor for SimClimate {
    fn init(&mut self) -> Result<(), SensorError> {
        if self.init_fails {
            return Err(SensorError::NotInitialized);
        }
        self.initialized = true;
        Ok(())
    }

    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        if !self.initialized {
            return Err(SensorError::NotInitialized);
        }
        self.reads += 1;
        if let Some(n) = self.fail_every {
            if self.reads % n == 0 {
                return Err(SensorError::ReadFailure("simulated bus dropout".to_string()));
            }
        }
        let elapsed = self.epoch.elapsed();
        Ok(ClimateReading {
            temperature_c: 23.5 + 2.5 * wave(elapsed, 600.0, self.phase),
            humidity_pct: 55.0 + 10.0 * wave(elapsed, 900.0, self.phase + 0.25),
        })
    }
}

/// Simulated ambient light sensor.
pub struct SimLight {
    epoch: Instant,
    phase: f32,
    init_fails: bool,
    fail_every: Option<u64>,
    reads: u64,
    mode: Option<LightMode>,
}

impl SimLight {
    /// Create a healthy sensor.
    pub fn new(seed: u64) -> Self {
        Self {
            epoch: Instant::now(),
            phase: phase_for(seed),
            init_fails: false,
            fail_every: None,
            reads: 0,
            mode: None,
        }
    }

    /// Make the startup handshake fail.
    pub fn with_failing_init(mut self) -> Self {
        self.init_fails = true;
        self
    }

    /// Fail every n-th read attempt (n >= 1).
    pub fn failing_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n.max(1));
        self
    }
}

impl LightSensor for SimLight {
    fn init(&mut self, mode: LightMode) -> Result<(), SensorError> {
        if self.init_fails {
            return Err(SensorError::NotInitialized);
        }
        self.mode = Some(mode);
        Ok(())
    }

    fn read(&mut self) -> Result<f32, SensorError> {
        let mode = self.mode.ok_or(SensorError::NotInitialized)?;
        self.reads += 1;
        if let Some(n) = self.fail_every {
            if self.reads % n == 0 {
                return Err(SensorError::ReadFailure("simulated conversion error".to_string()));
            }
        }
        let elapsed = self.epoch.elapsed();
        let lux = (650.0 + 600.0 * wave(elapsed, 1200.0, self.phase + 0.5)).max(0.0);
        match mode {
            // Low resolution quantizes to 4 lx steps.
            LightMode::ContinuousLowRes => Ok((lux / 4.0).round() * 4.0),
            LightMode::ContinuousHighRes | LightMode::OneTimeHighRes => Ok(lux),
        }
    }
}

/// Simulated capacitive soil probe wandering inside the default
/// calibration bounds.
pub struct SimSoilProbe {
    epoch: Instant,
    phase: f32,
}

impl SimSoilProbe {
    /// Create a probe.
    pub fn new(seed: u64) -> Self {
        Self {
            epoch: Instant::now(),
            phase: phase_for(seed),
        }
    }
}

impl SoilAdc for SimSoilProbe {
    fn read_raw(&mut self) -> u16 {
        let elapsed = self.epoch.elapsed();
        (1860.0 + 620.0 * wave(elapsed, 1800.0, self.phase + 0.75)) as u16
    }
}

/// Scripted WiFi link.
///
/// Association is fire-and-forget: `connect` is counted, then the join
/// delay and the outage plan decide what `status` reports.
pub struct SimWifi {
    epoch: Instant,
    phase: f32,
    outages: OutagePlan,
    join_delay: Duration,
    first_connect: Option<Instant>,
    attempts: AttemptCounter,
}

impl SimWifi {
    /// Create a link that associates immediately and stays up.
    pub fn new(seed: u64) -> Self {
        Self {
            epoch: Instant::now(),
            phase: phase_for(seed),
            outages: OutagePlan::none(),
            join_delay: Duration::ZERO,
            first_connect: None,
            attempts: AttemptCounter::default(),
        }
    }

    /// Script downtime windows.
    pub fn with_outages(mut self, outages: OutagePlan) -> Self {
        self.outages = outages;
        self
    }

    /// Delay between the first connect attempt and association.
    pub fn with_join_delay(mut self, delay: Duration) -> Self {
        self.join_delay = delay;
        self
    }

    /// Handle onto the connect-attempt counter.
    pub fn attempts(&self) -> AttemptCounter {
        self.attempts.clone()
    }
}

impl WifiLink for SimWifi {
    fn connect(&mut self, _ssid: &str, _password: &str) {
        self.attempts.bump();
        if self.first_connect.is_none() {
            self.first_connect = Some(Instant::now());
        }
    }

    fn status(&self) -> WifiStatus {
        let joined = match self.first_connect {
            Some(at) => at.elapsed() >= self.join_delay,
            None => false,
        };
        if joined && !self.outages.is_down(self.epoch.elapsed()) {
            WifiStatus::Connected
        } else {
            WifiStatus::Disconnected
        }
    }

    fn rssi_dbm(&self) -> Option<i32> {
        if !self.status().is_connected() {
            return None;
        }
        Some(-58 + (6.0 * wave(self.epoch.elapsed(), 300.0, self.phase)) as i32)
    }

    fn local_address(&self) -> Option<IpAddr> {
        if !self.status().is_connected() {
            return None;
        }
        Some(IpAddr::V4(Ipv4Addr::new(192, 168, 4, 61)))
    }
}

/// Scripted telemetry transport capturing every publish.
///
/// The session follows the outage plan once the handshake has been
/// issued; `pump` keeps the session alive but plays no part in
/// recovery timing.
pub struct SimTelemetry {
    epoch: Instant,
    outages: OutagePlan,
    handshake_delay: Duration,
    first_connect: Option<Instant>,
    pumps: u64,
    attempts: AttemptCounter,
    log: PublishLog,
}

impl SimTelemetry {
    /// Create a transport that handshakes immediately and stays up.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            outages: OutagePlan::none(),
            handshake_delay: Duration::ZERO,
            first_connect: None,
            pumps: 0,
            attempts: AttemptCounter::default(),
            log: PublishLog::new(),
        }
    }

    /// Script downtime windows.
    pub fn with_outages(mut self, outages: OutagePlan) -> Self {
        self.outages = outages;
        self
    }

    /// Delay between the connect call and the session coming up.
    pub fn with_handshake_delay(mut self, delay: Duration) -> Self {
        self.handshake_delay = delay;
        self
    }

    /// Handle onto the captured publishes.
    pub fn log(&self) -> PublishLog {
        self.log.clone()
    }

    /// Handle onto the connect-attempt counter.
    pub fn attempts(&self) -> AttemptCounter {
        self.attempts.clone()
    }

    /// Maintenance calls seen so far.
    pub fn pumps(&self) -> u64 {
        self.pumps
    }
}

impl Default for SimTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryLink for SimTelemetry {
    fn connect(&mut self, _token: &str, _ssid: &str, _password: &str) {
        self.attempts.bump();
        if self.first_connect.is_none() {
            self.first_connect = Some(Instant::now());
        }
    }

    fn pump(&mut self) {
        self.pumps += 1;
    }

    fn connected(&self) -> bool {
        let joined = match self.first_connect {
            Some(at) => at.elapsed() >= self.handshake_delay,
            None => false,
        };
        joined && !self.outages.is_down(self.epoch.elapsed())
    }

    fn publish(&mut self, channel: Channel, value: f64) {
        self.log.push(PublishRecord { channel, value });
    }
}

/// Simulated free-memory source with a slow tidal wander.
pub struct SimMemory {
    epoch: Instant,
    phase: f32,
}

impl SimMemory {
    /// Create a probe.
    pub fn new(seed: u64) -> Self {
        Self {
            epoch: Instant::now(),
            phase: phase_for(seed),
        }
    }
}

impl MemoryProbe for SimMemory {
    fn free_bytes(&mut self) -> u64 {
        (180_000.0 + 12_000.0 * wave(self.epoch.elapsed(), 240.0, self.phase + 0.4)) as u64
    }
}

/// Observation handles into a simulated station.
#[derive(Debug, Clone)]
pub struct SimHandles {
    /// Everything the transport was asked to send.
    pub publishes: PublishLog,
    /// WiFi connect attempts, startup and reconnects alike.
    pub wifi_attempts: AttemptCounter,
    /// Telemetry handshake attempts.
    pub telemetry_attempts: AttemptCounter,
}

/// Builder for a fully simulated station.
pub struct SimStationBuilder {
    seed: u64,
    climate_init_fails: bool,
    light_init_fails: bool,
    climate_fail_every: Option<u64>,
    light_fail_every: Option<u64>,
    wifi_outages: OutagePlan,
    telemetry_outages: OutagePlan,
}

impl SimStationBuilder {
    /// Make the climate handshake fail at startup.
    pub fn climate_init_fails(mut self) -> Self {
        self.climate_init_fails = true;
        self
    }

    /// Make the light handshake fail at startup.
    pub fn light_init_fails(mut self) -> Self {
        self.light_init_fails = true;
        self
    }

    /// Fail every n-th climate read.
    pub fn climate_fails_every(mut self, n: u64) -> Self {
        self.climate_fail_every = Some(n);
        self
    }

    /// Fail every n-th light read.
    pub fn light_fails_every(mut self, n: u64) -> Self {
        self.light_fail_every = Some(n);
        self
    }

    /// Script a WiFi downtime window.
    pub fn wifi_outage(mut self, from: Duration, until: Duration) -> Self {
        self.wifi_outages = self.wifi_outages.clone().outage(from, until);
        self
    }

    /// Script a telemetry downtime window.
    pub fn telemetry_outage(mut self, from: Duration, until: Duration) -> Self {
        self.telemetry_outages = self.telemetry_outages.clone().outage(from, until);
        self
    }

    /// Assemble the station and hand back the observation handles.
    pub fn build(self) -> (Station, SimHandles) {
        let mut climate = SimClimate::new(self.seed);
        if self.climate_init_fails {
            climate = climate.with_failing_init();
        }
        if let Some(n) = self.climate_fail_every {
            climate = climate.failing_every(n);
        }

        let mut light = SimLight::new(self.seed.wrapping_add(1));
        if self.light_init_fails {
            light = light.with_failing_init();
        }
        if let Some(n) = self.light_fail_every {
            light = light.failing_every(n);
        }

        let soil = SimSoilProbe::new(self.seed.wrapping_add(2));
        let wifi = SimWifi::new(self.seed.wrapping_add(3)).with_outages(self.wifi_outages);
        let telemetry = SimTelemetry::new().with_outages(self.telemetry_outages);

        let handles = SimHandles {
            publishes: telemetry.log(),
            wifi_attempts: wifi.attempts(),
            telemetry_attempts: telemetry.attempts(),
        };

        let station = Station::new(
            Box::new(climate),
            Box::new(light),
            Box::new(soil),
            Box::new(wifi),
            Box::new(telemetry),
        );
        (station, handles)
    }
}

/// Start building a simulated station.
pub fn builder(seed: u64) -> SimStationBuilder {
    SimStationBuilder {
        seed,
        climate_init_fails: false,
        light_init_fails: false,
        climate_fail_every: None,
        light_fail_every: None,
        wifi_outages: OutagePlan::none(),
        telemetry_outages: OutagePlan::none(),
    }
}

/// A healthy simulated station: every sensor up, both links steady.
pub fn steady(seed: u64) -> (Station, SimHandles) {
    builder(seed).build()
}
