//! Data structures for station readings.

use serde::{Deserialize, Serialize};

/// One sampling tick's readings in engineering units.
///
/// `None` means the reading is not valid this tick: the sensor either
/// failed its startup handshake or its latest poll failed. The soil
/// fields are always present because reading the analog pin cannot
/// fail; calibration decides what the raw sample means.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StationSnapshot {
    /// When the sample was taken (unix timestamp, milliseconds).
    pub timestamp: u64,
    /// Air temperature in degrees Celsius.
    pub temperature_c: Option<f32>,
    /// Relative air humidity in percent.
    pub humidity_pct: Option<f32>,
    /// Ambient light level in lux.
    pub illuminance_lux: Option<f32>,
    /// Raw soil ADC sample.
    pub soil_raw: u16,
    /// Soil moisture percentage derived from `soil_raw`.
    pub soil_pct: f32,
    /// WiFi signal strength in dBm; `None` while the link is down.
    pub wifi_rssi_dbm: Option<i32>,
}

impl StationSnapshot {
    /// Create an empty snapshot stamped with the current wall-clock time.
    pub fn new() -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self {
            timestamp,
            temperature_c: None,
            humidity_pct: None,
            illuminance_lux: None,
            soil_raw: 0,
            soil_pct: 0.0,
            wifi_rssi_dbm: None,
        }
    }

    /// Fill invalid climate and light fields from an older snapshot so
    /// operators still see the last good value while a sensor hiccups.
    ///
    /// Only the tick log uses the merged view. Publishing always works
    /// from the fresh snapshot, and the link fields are never carried
    /// over: a down link reports no signal, not a stale one.
    pub fn merge_from(&mut self, previous: &StationSnapshot) {
        if self.temperature_c.is_none() {
            self.temperature_c = previous.temperature_c;
        }
        if self.humidity_pct.is_none() {
            self.humidity_pct = previous.humidity_pct;
        }
        if self.illuminance_lux.is_none() {
            self.illuminance_lux = previous.illuminance_lux;
        }
    }
}

impl Default for StationSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Human-readable quality band for a WiFi RSSI value.
pub fn wifi_quality(rssi_dbm: i32) -> &'static str {
    if rssi_dbm > -50 {
        "excellent"
    } else if rssi_dbm > -60 {
        "very good"
    } else if rssi_dbm > -70 {
        "good"
    } else if rssi_dbm > -80 {
        "weak"
    } else {
        "very weak"
    }
}
