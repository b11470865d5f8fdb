//! The sampling-loop driver.
//!
//! One cooperative task owns the whole station. Startup runs the sensor
//! handshakes and bounded waits for the network, then the driver loop
//! alternates fixed-interval sample ticks with, in soak mode, report
//! ticks, yielding briefly between passes. Nothing inside the loop is
//! fatal: failures land in logs and counters, and the only exit is the
//! scheduled end of a soak window.

use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::StationConfig;
use crate::error::Result;
use crate::link::{LinkChannel, LinkEvent, LinkMonitor};
use crate::metrics::{SoakMetrics, SoakReport};
use crate::reading::{wifi_quality, StationSnapshot};
use crate::soil::SoilCalibration;
use crate::station::{LightMode, MemoryProbe, SampleOutcome, Station, SystemMemoryProbe};
use crate::telemetry::{publish_snapshot, Channel};

/// How often startup polls for join and handshake progress.
const STARTUP_POLL: Duration = Duration::from_millis(500);

/// Drives one station through the sampling loop.
pub struct Agent {
    station: Station,
    config: StationConfig,
    calibration: SoilCalibration,
    memory: Box<dyn MemoryProbe>,
    wifi_monitor: LinkMonitor,
    telemetry_monitor: LinkMonitor,
    last_display: Option<StationSnapshot>,
}

impl Agent {
    /// Build an agent over a station. Fails fast on configurations the
    /// loop cannot run with.
    pub fn new(station: Station, config: StationConfig) -> Result<Self> {
        config.validate()?;
        let calibration = config.calibration()?;
        Ok(Self {
            station,
            config,
            calibration,
            memory: Box::new(SystemMemoryProbe::new()),
            wifi_monitor: LinkMonitor::new(LinkChannel::Wifi, false),
            telemetry_monitor: LinkMonitor::new(LinkChannel::Telemetry, false),
            last_display: None,
        })
    }

    /// Replace the free-memory source behind the soak heap watermarks.
    pub fn with_memory_probe(mut self, probe: Box<dyn MemoryProbe>) -> Self {
        self.memory = probe;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    /// Run the plain variant: sample and publish until the process is
    /// stopped externally.
    pub async fn run(mut self) -> Result<()> {
        self.startup().await;
        self.drive(None).await
    }

    /// Run the instrumented variant for the configured soak window,
    /// printing a report every report tick, and return the final
    /// report.
    pub async fn run_soak(mut self) -> Result<SoakReport> {
        self.startup().await;
        let mut metrics = SoakMetrics::start(Instant::now());
        let duration = self.config.soak_duration();
        self.drive(Some((&mut metrics, duration))).await?;
        Ok(metrics.snapshot(Instant::now()))
    }

    /// Initialization sequence: sensor handshakes, WiFi join, telemetry
    /// handshake. Every wait is bounded and nothing here is fatal; a
    /// station that cannot reach the dashboard still samples and logs.
    async fn startup(&mut self) {
        info!(
            sample_interval_ms = self.config.sample_interval_ms,
            soil_dry = u64::from(self.calibration.dry()),
            soil_wet = u64::from(self.calibration.wet()),
            "starting station agent"
        );

        self.station.init_sensors(LightMode::default());

        info!(ssid = %self.config.ssid, "joining wifi");
        self.station
            .wifi_mut()
            .connect(&self.config.ssid, &self.config.password);
        let deadline = Instant::now() + self.config.wifi_join_timeout();
        while !self.station.wifi().status().is_connected() && Instant::now() < deadline {
            sleep(STARTUP_POLL).await;
        }
        let wifi_up = self.station.wifi().status().is_connected();
        if wifi_up {
            info!(
                address = ?self.station.wifi().local_address(),
                rssi_dbm = ?self.station.wifi().rssi_dbm(),
                "wifi joined"
            );
        } else {
            warn!(
                timeout_ms = self.config.wifi_join_timeout_ms,
                "wifi join timed out, continuing offline"
            );
        }

        info!("connecting telemetry transport");
        self.station.telemetry_mut().connect(
            &self.config.device_token,
            &self.config.ssid,
            &self.config.password,
        );
        let deadline = Instant::now() + self.config.telemetry_timeout();
        while !self.station.telemetry().connected() && Instant::now() < deadline {
            self.station.telemetry_mut().pump();
            sleep(STARTUP_POLL).await;
        }
        let telemetry_up = self.station.telemetry().connected();
        if telemetry_up {
            info!("telemetry transport connected");
            for channel in Channel::PUBLISH_ORDER {
                info!(
                    channel = u64::from(channel.index()),
                    quantity = channel.label(),
                    "dashboard channel bound"
                );
            }
        } else {
            warn!(
                timeout_ms = self.config.telemetry_timeout_ms,
                "telemetry handshake timed out, publishing paused until the session recovers"
            );
        }

        // Seed the monitors with what startup observed so the first
        // loop pass does not fire a spurious edge.
        self.wifi_monitor = LinkMonitor::new(LinkChannel::Wifi, wifi_up);
        self.telemetry_monitor = LinkMonitor::new(LinkChannel::Telemetry, telemetry_up);
    }

    /// The driver loop shared by both variants. With `soak` present the
    /// loop also feeds the aggregate, prints report ticks and returns
    /// at the deadline; without it the loop runs forever.
    async fn drive(&mut self, mut soak: Option<(&mut SoakMetrics, Duration)>) -> Result<()> {
        let started = Instant::now();
        let sample_every = self.config.sample_interval();
        let report_every = self.config.report_interval();
        let idle = self.config.idle_sleep();
        let mut last_sample: Option<Instant> = None;
        let mut last_report: Option<Instant> = None;

        loop {
            let now = Instant::now();

            // Deadline first, so no tick lands past the window.
            if let Some((metrics, duration)) = soak.as_mut() {
                if now.duration_since(started) >= *duration {
                    let report = metrics.snapshot(now);
                    println!();
                    println!("{}", report.render_text());
                    println!();
                    println!("{}", report.render_csv());
                    info!(
                        elapsed_ms = report.elapsed_ms,
                        total_readings = report.total_readings,
                        "soak window complete"
                    );
                    return Ok(());
                }
            }

            // Edge-detect both links, then nudge the radio if down. The
            // reconnect is fire-and-forget and uncapped; the result
            // shows up in a later status poll.
            let wifi_up = self.station.wifi().status().is_connected();
            if let Some(event) = self.wifi_monitor.observe(wifi_up) {
                log_link_event(LinkChannel::Wifi, event);
                if let Some((metrics, _)) = soak.as_mut() {
                    metrics.record_link_event(LinkChannel::Wifi, event);
                }
            }
            if !wifi_up {
                self.station
                    .wifi_mut()
                    .connect(&self.config.ssid, &self.config.password);
            }

            let telemetry_up = self.station.telemetry().connected();
            if let Some(event) = self.telemetry_monitor.observe(telemetry_up) {
                log_link_event(LinkChannel::Telemetry, event);
                if let Some((metrics, _)) = soak.as_mut() {
                    metrics.record_link_event(LinkChannel::Telemetry, event);
                }
            }

            // The transport's maintenance slot, once per pass.
            self.station.telemetry_mut().pump();

            // Sample tick. The interval is measured from the last tick
            // that actually fired, so a late pass shifts the cadence
            // instead of bunching ticks to catch up.
            if last_sample.map_or(true, |t| now.duration_since(t) >= sample_every) {
                last_sample = Some(now);

                let read_started = Instant::now();
                let outcome = self.station.sample(&self.calibration);
                let read_time_us = read_started.elapsed().as_micros() as u64;

                if let Some((metrics, _)) = soak.as_mut() {
                    metrics.record_sample(&outcome, read_time_us);
                }

                if self.station.telemetry().connected() {
                    let send_started = Instant::now();
                    let written = publish_snapshot(self.station.telemetry_mut(), &outcome.snapshot);
                    let latency_us = send_started.elapsed().as_micros() as u64;
                    if let Some((metrics, _)) = soak.as_mut() {
                        metrics.record_publish(latency_us);
                    }
                    debug!(channels = written, latency_us, "published readings");
                } else {
                    if let Some((metrics, _)) = soak.as_mut() {
                        metrics.record_publish_skipped();
                    }
                    debug!("telemetry session down, skipping publish");
                }

                self.log_tick(&outcome);
            }

            // Soak bookkeeping: heap watermark every pass, report on
            // its own tick.
            if let Some((metrics, _)) = soak.as_mut() {
                metrics.record_heap(self.memory.free_bytes());
                if last_report.map_or(true, |t| now.duration_since(t) >= report_every) {
                    last_report = Some(now);
                    println!("{}", metrics.snapshot(now).render_text());
                }
            }

            sleep(idle).await;
        }
    }

    /// Log one tick, backfilling display-only fields from the last good
    /// values so a transient failure reads as a held value, not a gap.
    fn log_tick(&mut self, outcome: &SampleOutcome) {
        // Named `merged` rather than `display`: the tracing macros import
        // `tracing::field::display` into their expansion, which shadows a
        // call-site local of the same name.
        let mut merged = outcome.snapshot;
        if let Some(previous) = &self.last_display {
            merged.merge_from(previous);
        }
        self.last_display = Some(merged);

        info!(
            temperature_c = ?merged.temperature_c,
            humidity_pct = ?merged.humidity_pct,
            illuminance_lux = ?merged.illuminance_lux,
            soil_pct = f64::from(merged.soil_pct),
            soil_raw = u64::from(merged.soil_raw),
            rssi_dbm = ?merged.wifi_rssi_dbm,
            quality = ?merged.wifi_rssi_dbm.map(wifi_quality),
            "sensor sweep"
        );
    }
}

fn log_link_event(channel: LinkChannel, event: LinkEvent) {
    match event {
        LinkEvent::Down => warn!(link = channel.label(), "link lost"),
        LinkEvent::Up => info!(link = channel.label(), "link restored"),
    }
}
