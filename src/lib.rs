//! # Verdant - Garden Station Telemetry Agent
//!
//! A small Rust crate for driving an environmental garden station: it
//! polls a climate sensor, an ambient light sensor and a capacitive
//! soil probe on a fixed cadence and publishes each valid reading to a
//! numbered cloud dashboard channel, alongside the WiFi signal level.
//!
//! ## Features
//!
//! - **Fixed-cadence sampling**: drift-tolerant 2 s tick, reads before
//!   publishes, one cooperative task
//! - **Calibrated soil moisture**: linear raw-to-percent conversion
//!   between per-probe dry/wet bounds
//! - **Edge-triggered link monitoring**: outages counted once, with
//!   fire-and-forget WiFi reconnects
//! - **Soak mode**: a bounded instrumented run with per-second interim
//!   reports and a final text + CSV report
//! - **Trait-seamed hardware**: sensors and transports behind traits,
//!   with a deterministic simulated rig included
//! - **Library + Binary**: use as a crate or standalone agent
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use verdant::{station::sim, Agent, StationConfig};
//!
//! #[tokio::main]
//! async fn main() -> verdant::Result<()> {
//!     let (station, _handles) = sim::steady(7);
//!     let agent = Agent::new(station, StationConfig::default())?;
//!     agent.run().await
//! }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod link;
pub mod metrics;
pub mod reading;
pub mod soil;
pub mod station;
pub mod telemetry;

// Re-export public API
pub use agent::Agent;
pub use config::StationConfig;
pub use error::{AgentError, Result, SensorError};
pub use link::{LinkChannel, LinkEvent, LinkMonitor};
pub use metrics::{RunningStat, SoakMetrics, SoakReport, StatSummary};
pub use reading::{wifi_quality, StationSnapshot};
pub use soil::SoilCalibration;
pub use station::{ReadAttempt, SampleOutcome, Station};
pub use telemetry::{publish_snapshot, Channel};

/// The default interval between sample ticks, in milliseconds
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 2000;

/// The default interval between soak report ticks, in milliseconds
pub const DEFAULT_REPORT_INTERVAL_MS: u64 = 1000;

/// The default soak window, in milliseconds (five minutes)
pub const DEFAULT_SOAK_DURATION_MS: u64 = 300_000;

/// The default cooperative yield between driver passes, in milliseconds
pub const DEFAULT_IDLE_SLEEP_MS: u64 = 10;

/// The default startup WiFi join timeout, in milliseconds
pub const DEFAULT_WIFI_JOIN_TIMEOUT_MS: u64 = 10_000;

/// The default startup telemetry handshake timeout, in milliseconds
pub const DEFAULT_TELEMETRY_TIMEOUT_MS: u64 = 30_000;
