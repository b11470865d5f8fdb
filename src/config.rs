//! Agent configuration.

use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::error::{AgentError, Result};
use crate::soil::{SoilCalibration, DEFAULT_SOIL_DRY, DEFAULT_SOIL_WET};

/// Configuration for a station agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationConfig {
    /// WiFi network name.
    pub ssid: String,
    /// WiFi passphrase.
    pub password: String,
    /// Telemetry device auth token.
    pub device_token: String,
    /// Milliseconds between sample ticks.
    pub sample_interval_ms: u64,
    /// Milliseconds between soak report ticks.
    pub report_interval_ms: u64,
    /// Cooperative yield between driver passes, in milliseconds. This
    /// bounds how late a tick can fire.
    pub idle_sleep_ms: u64,
    /// How long startup waits for the WiFi join, in milliseconds.
    pub wifi_join_timeout_ms: u64,
    /// How long startup waits for the telemetry handshake, in
    /// milliseconds.
    pub telemetry_timeout_ms: u64,
    /// Length of an instrumented soak run, in milliseconds.
    pub soak_duration_ms: u64,
    /// Raw soil sample with the probe in air.
    pub soil_dry: u16,
    /// Raw soil sample with the probe in water.
    pub soil_wet: u16,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            ssid: "greenhouse".to_string(),
            password: "changeme".to_string(),
            device_token: "dev-token".to_string(),
            sample_interval_ms: crate::DEFAULT_SAMPLE_INTERVAL_MS,
            report_interval_ms: crate::DEFAULT_REPORT_INTERVAL_MS,
            idle_sleep_ms: crate::DEFAULT_IDLE_SLEEP_MS,
            wifi_join_timeout_ms: crate::DEFAULT_WIFI_JOIN_TIMEOUT_MS,
            telemetry_timeout_ms: crate::DEFAULT_TELEMETRY_TIMEOUT_MS,
            soak_duration_ms: crate::DEFAULT_SOAK_DURATION_MS,
            soil_dry: DEFAULT_SOIL_DRY,
            soil_wet: DEFAULT_SOIL_WET,
        }
    }
}

impl StationConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the WiFi network name.
    pub fn with_ssid(mut self, ssid: impl Into<String>) -> Self {
        self.ssid = ssid.into();
        self
    }

    /// Set the WiFi passphrase.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the telemetry device token.
    pub fn with_device_token(mut self, token: impl Into<String>) -> Self {
        self.device_token = token.into();
        self
    }

    /// Set the sample tick interval in milliseconds.
    pub fn with_sample_interval_ms(mut self, interval_ms: u64) -> Self {
        self.sample_interval_ms = interval_ms;
        self
    }

    /// Set the soak report interval in milliseconds.
    pub fn with_report_interval_ms(mut self, interval_ms: u64) -> Self {
        self.report_interval_ms = interval_ms;
        self
    }

    /// Set the soak run length in milliseconds.
    pub fn with_soak_duration_ms(mut self, duration_ms: u64) -> Self {
        self.soak_duration_ms = duration_ms;
        self
    }

    /// Set the soil calibration bounds.
    pub fn with_soil_bounds(mut self, dry: u16, wet: u16) -> Self {
        self.soil_dry = dry;
        self.soil_wet = wet;
        self
    }

    /// The sample tick interval.
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// The soak report interval.
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    /// The cooperative yield between driver passes.
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }

    /// The startup WiFi join timeout.
    pub fn wifi_join_timeout(&self) -> Duration {
        Duration::from_millis(self.wifi_join_timeout_ms)
    }

    /// The startup telemetry handshake timeout.
    pub fn telemetry_timeout(&self) -> Duration {
        Duration::from_millis(self.telemetry_timeout_ms)
    }

    /// The soak run length.
    pub fn soak_duration(&self) -> Duration {
        Duration::from_millis(self.soak_duration_ms)
    }

    /// Build the soil calibration from the configured bounds.
    pub fn calibration(&self) -> Result<SoilCalibration> {
        SoilCalibration::new(self.soil_dry, self.soil_wet)
    }

    /// Reject configurations the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sample_interval_ms == 0 {
            return Err(AgentError::config_error("sample interval must be nonzero"));
        }
        if self.report_interval_ms == 0 {
            return Err(AgentError::config_error("report interval must be nonzero"));
        }
        if self.soak_duration_ms == 0 {
            return Err(AgentError::config_error("soak duration must be nonzero"));
        }
        if self.idle_sleep_ms == 0 {
            return Err(AgentError::config_error("idle sleep must be nonzero"));
        }
        // Ticks are scheduled by polling between sleeps, so the sleep
        // has to be an order of magnitude finer than the intervals.
        let shortest = self.sample_interval_ms.min(self.report_interval_ms);
        if self.idle_sleep_ms.saturating_mul(10) > shortest {
            return Err(AgentError::config_error(
                "idle sleep is too coarse for the tick intervals it schedules",
            ));
        }
        self.calibration()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = StationConfig::default();
        assert_eq!(config.sample_interval_ms, 2000);
        assert_eq!(config.report_interval_ms, 1000);
        assert_eq!(config.idle_sleep_ms, 10);
        assert_eq!(config.wifi_join_timeout_ms, 10_000);
        assert_eq!(config.telemetry_timeout_ms, 30_000);
        assert_eq!(config.soak_duration_ms, 300_000);
        assert_eq!(config.soil_dry, 2521);
        assert_eq!(config.soil_wet, 1200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_methods() {
        let config = StationConfig::new()
            .with_ssid("backyard")
            .with_password("hunter2")
            .with_device_token("abc123")
            .with_sample_interval_ms(5000)
            .with_report_interval_ms(2000)
            .with_soak_duration_ms(60_000)
            .with_soil_bounds(2600, 1100);

        assert_eq!(config.ssid, "backyard");
        assert_eq!(config.device_token, "abc123");
        assert_eq!(config.sample_interval(), Duration::from_secs(5));
        assert_eq!(config.soak_duration(), Duration::from_secs(60));
        assert_eq!(config.calibration().unwrap().dry(), 2600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        assert!(StationConfig::new()
            .with_sample_interval_ms(0)
            .validate()
            .is_err());
        assert!(StationConfig::new()
            .with_report_interval_ms(0)
            .validate()
            .is_err());
        assert!(StationConfig::new()
            .with_soak_duration_ms(0)
            .validate()
            .is_err());
    }

    #[test]
    fn degenerate_soil_bounds_are_rejected() {
        let config = StationConfig::new().with_soil_bounds(1800, 1800);
        let err = config.validate().unwrap_err();
        assert!(format!("{}", err).contains("1800"));
    }

    #[test]
    fn idle_sleep_must_be_much_finer_than_the_ticks() {
        let mut config = StationConfig::new().with_report_interval_ms(50);
        config.idle_sleep_ms = 100;
        assert!(config.validate().is_err());

        // Finer than the interval but not by enough.
        config.idle_sleep_ms = 10;
        assert!(config.validate().is_err());

        config.idle_sleep_ms = 5;
        assert!(config.validate().is_ok());

        config.idle_sleep_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_serialization() {
        let config = StationConfig::new().with_ssid("rooftop");
        let json = serde_json::to_string(&config).unwrap();
        let back: StationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
