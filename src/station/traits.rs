//! Contracts for the station's hardware and transport collaborators.
//!
//! The agent never talks to a driver directly: every sensor, the WiFi
//! stack and the telemetry transport sit behind one of these traits.
//! Production rigs implement them over the vendor crates for their
//! board; the [`sim`](crate::station::sim) module ships deterministic
//! implementations for development and tests.
//!
//! All methods are synchronous. The underlying calls are non-blocking
//! polls and fire-and-forget writes, so a call never parks the sampling
//! task mid-tick.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::SensorError;
use crate::telemetry::Channel;

/// A combined temperature and relative-humidity reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateReading {
    /// Air temperature in degrees Celsius.
    pub temperature_c: f32,
    /// Relative air humidity in percent.
    pub humidity_pct: f32,
}

/// Combined temperature and humidity sensor behind a bus handshake.
pub trait ClimateSensor: Send {
    /// Run the startup handshake once. A failure permanently disables
    /// the sensor for this process; the agent never retries init.
    fn init(&mut self) -> Result<(), SensorError>;

    /// Poll one reading.
    fn read(&mut self) -> Result<ClimateReading, SensorError>;
}

/// Measurement mode for the ambient light sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightMode {
    /// 1 lx resolution, continuous sampling.
    #[default]
    ContinuousHighRes,
    /// 4 lx resolution, continuous sampling.
    ContinuousLowRes,
    /// 1 lx resolution, one conversion then power down.
    OneTimeHighRes,
}

/// Ambient light sensor.
///
/// Implementations report a failed conversion as `ReadFailure`; the
/// usual vendor convention of a negative lux value stays inside the
/// driver.
pub trait LightSensor: Send {
    /// Configure the sensor and start it in the given mode.
    fn init(&mut self, mode: LightMode) -> Result<(), SensorError>;

    /// Poll one illuminance reading in lux.
    fn read(&mut self) -> Result<f32, SensorError>;
}

/// Analog soil-moisture probe on a raw ADC pin.
///
/// Reading the pin cannot fail; an unplugged probe just reads as very
/// dry. Calibration happens downstream.
pub trait SoilAdc: Send {
    /// Sample the pin once.
    fn read_raw(&mut self) -> u16;
}

/// Association state of the station-mode WiFi link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiStatus {
    /// Associated and holding an address.
    Connected,
    /// Not associated.
    Disconnected,
    /// Any transitional or error state the stack reports.
    Other,
}

impl WifiStatus {
    /// True only for a fully established association.
    pub fn is_connected(self) -> bool {
        matches!(self, WifiStatus::Connected)
    }
}

/// Station-mode WiFi stack.
pub trait WifiLink: Send {
    /// Begin association. Fire-and-forget; progress is observed through
    /// [`status`](WifiLink::status) on later passes.
    fn connect(&mut self, ssid: &str, password: &str);

    /// Current association state.
    fn status(&self) -> WifiStatus;

    /// Signal strength of the current association, if associated.
    fn rssi_dbm(&self) -> Option<i32>;

    /// Local address for diagnostics, once associated.
    fn local_address(&self) -> Option<IpAddr>;
}

/// Cloud telemetry transport with numbered dashboard channels.
pub trait TelemetryLink: Send {
    /// Begin the authentication handshake. Fire-and-forget; progress is
    /// observed through [`pump`](TelemetryLink::pump) and
    /// [`connected`](TelemetryLink::connected).
    fn connect(&mut self, token: &str, ssid: &str, password: &str);

    /// Give the transport its maintenance slot. Called once per driver
    /// pass; skipping it starves keepalives and drops the session.
    fn pump(&mut self);

    /// True while the authenticated session is up.
    fn connected(&self) -> bool;

    /// Write one value to a dashboard channel. Fire-and-forget; no
    /// acknowledgment is observed.
    fn publish(&mut self, channel: Channel, value: f64);
}

/// Free-memory source for the soak run's heap watermarks.
pub trait MemoryProbe: Send {
    /// Bytes of memory currently available to the process.
    fn free_bytes(&mut self) -> u64;
}

/// Default probe backed by the host's memory accounting.
pub struct SystemMemoryProbe {
    system: sysinfo::System,
}

impl SystemMemoryProbe {
    /// Create a probe over a fresh system handle.
    pub fn new() -> Self {
        Self {
            system: sysinfo::System::new(),
        }
    }
}

impl Default for SystemMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn free_bytes(&mut self) -> u64 {
        self.system.refresh_memory();
        self.system.available_memory()
    }
}
