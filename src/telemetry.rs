//! Dashboard channel assignment and ordered publishing.

use serde::{Deserialize, Serialize};

use crate::reading::StationSnapshot;
use crate::station::TelemetryLink;

/// Virtual dashboard channel for one published quantity.
///
/// The numbering is load-bearing: deployed dashboards bind widgets to
/// channels by index, so renumbering silently rewires every gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Channel {
    /// Air temperature in degrees Celsius.
    Temperature = 0,
    /// Relative air humidity in percent.
    Humidity = 1,
    /// Ambient light in lux.
    Illuminance = 2,
    /// Soil moisture in percent.
    SoilMoisture = 3,
    /// WiFi signal strength in dBm.
    WifiSignal = 4,
}

impl Channel {
    /// The order readings are written within one tick.
    pub const PUBLISH_ORDER: [Channel; 5] = [
        Channel::Temperature,
        Channel::Humidity,
        Channel::Illuminance,
        Channel::SoilMoisture,
        Channel::WifiSignal,
    ];

    /// Wire index of this channel.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Short name used in logs and dashboard templates.
    pub fn label(self) -> &'static str {
        match self {
            Channel::Temperature => "temperature",
            Channel::Humidity => "humidity",
            Channel::Illuminance => "illuminance",
            Channel::SoilMoisture => "soil moisture",
            Channel::WifiSignal => "wifi signal",
        }
    }
}

/// Publish every valid reading of one snapshot, in declared channel
/// order, and return the number of channels written.
///
/// Invalid readings are skipped rather than sent as placeholders, so a
/// dashboard gauge holds its last real value instead of spiking to a
/// sentinel. Transport state is the caller's concern: this assumes the
/// link is usable and the writes are fire-and-forget.
pub fn publish_snapshot(link: &mut dyn TelemetryLink, snapshot: &StationSnapshot) -> usize {
    let mut written = 0;
    for channel in Channel::PUBLISH_ORDER {
        let value = match channel {
            Channel::Temperature => snapshot.temperature_c.map(f64::from),
            Channel::Humidity => snapshot.humidity_pct.map(f64::from),
            Channel::Illuminance => snapshot.illuminance_lux.map(f64::from),
            Channel::SoilMoisture => Some(f64::from(snapshot.soil_pct)),
            Channel::WifiSignal => snapshot.wifi_rssi_dbm.map(f64::from),
        };
        if let Some(value) = value {
            link.publish(channel, value);
            written += 1;
        }
    }
    written
}
