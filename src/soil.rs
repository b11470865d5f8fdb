//! Soil moisture calibration and raw-to-percentage conversion.
//!
//! Capacitive probes report a raw ADC sample that drops as the soil gets
//! wetter, so the calibrated dry bound sits above the wet bound. The
//! bounds are physical constants of one probe in one medium: re-derive
//! them whenever the probe or the soil changes, by sampling the probe in
//! open air (`dry`) and in water (`wet`).

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Raw sample of the reference probe in open air.
pub const DEFAULT_SOIL_DRY: u16 = 2521;

/// Raw sample of the reference probe in water.
pub const DEFAULT_SOIL_WET: u16 = 1200;

/// Calibrated raw-sample bounds for one capacitive soil probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoilCalibration {
    dry: u16,
    wet: u16,
}

impl SoilCalibration {
    /// Build a calibration from the raw bounds taken in air (`dry`) and
    /// in water (`wet`). Equal bounds leave the conversion undefined and
    /// are rejected.
    pub fn new(dry: u16, wet: u16) -> Result<Self> {
        if dry == wet {
            return Err(AgentError::config_error(format!(
                "degenerate soil calibration: dry and wet bounds are both {}",
                dry
            )));
        }
        Ok(Self { dry, wet })
    }

    /// Raw bound observed with the probe in air.
    pub fn dry(&self) -> u16 {
        self.dry
    }

    /// Raw bound observed with the probe in water.
    pub fn wet(&self) -> u16 {
        self.wet
    }

    /// Convert a raw ADC sample to a moisture percentage in `[0, 100]`.
    ///
    /// Linear interpolation between the calibrated bounds; samples past
    /// either bound clamp to the nearest end, so a drifting probe reads
    /// fully dry or fully wet instead of going out of range.
    pub fn moisture_percent(&self, raw: u16) -> f32 {
        let span = f32::from(self.wet) - f32::from(self.dry);
        let pct = (f32::from(raw) - f32::from(self.dry)) * 100.0 / span;
        pct.clamp(0.0, 100.0)
    }
}

impl Default for SoilCalibration {
    fn default() -> Self {
        Self {
            dry: DEFAULT_SOIL_DRY,
            wet: DEFAULT_SOIL_WET,
        }
    }
}
