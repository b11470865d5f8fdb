//! Soak-run aggregation and reporting.
//!
//! A soak run wraps the normal sampling loop with one cumulative
//! aggregate: counters bump as events happen, nothing is windowed or
//! reset, and the aggregate is only ever read to render a report. The
//! CSV block emitted at the end of a run is consumed by spreadsheet
//! imports, so its two-column shape and header row stay fixed.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::Result;
use crate::link::{LinkChannel, LinkEvent};
use crate::metrics::stats::{RunningStat, StatSummary};
use crate::station::{ReadAttempt, SampleOutcome};

/// Cumulative metrics for one instrumented run.
#[derive(Debug)]
pub struct SoakMetrics {
    started: Instant,
    total_readings: u64,
    successful_readings: u64,
    failed_readings: u64,
    read_time_us: RunningStat,
    climate_reads: u64,
    climate_failures: u64,
    light_reads: u64,
    light_failures: u64,
    soil_reads: u64,
    rssi_reads: u64,
    publish_batches: u64,
    publish_failures: u64,
    publish_latency_us: RunningStat,
    wifi_disconnects: u64,
    wifi_reconnects: u64,
    telemetry_disconnects: u64,
    telemetry_reconnects: u64,
    heap_free: RunningStat,
    heap_free_last: Option<u64>,
}

impl SoakMetrics {
    /// Open an empty aggregate with its run clock starting at `now`.
    pub fn start(now: Instant) -> Self {
        Self {
            started: now,
            total_readings: 0,
            successful_readings: 0,
            failed_readings: 0,
            read_time_us: RunningStat::new(),
            climate_reads: 0,
            climate_failures: 0,
            light_reads: 0,
            light_failures: 0,
            soil_reads: 0,
            rssi_reads: 0,
            publish_batches: 0,
            publish_failures: 0,
            publish_latency_us: RunningStat::new(),
            wifi_disconnects: 0,
            wifi_reconnects: 0,
            telemetry_disconnects: 0,
            telemetry_reconnects: 0,
            heap_free: RunningStat::new(),
            heap_free_last: None,
        }
    }

    /// When the run clock started.
    pub fn started(&self) -> Instant {
        self.started
    }

    /// Fold one sample tick into the aggregate.
    ///
    /// A disabled sensor never counts against the tick; only an
    /// attempted read that failed does. The read time is folded in for
    /// clean ticks only, so failure paths cannot skew the timing stats.
    pub fn record_sample(&mut self, outcome: &SampleOutcome, read_time_us: u64) {
        self.total_readings += 1;

        match outcome.climate {
            ReadAttempt::Ok => self.climate_reads += 1,
            ReadAttempt::Failed => self.climate_failures += 1,
            ReadAttempt::Skipped => {}
        }
        match outcome.light {
            ReadAttempt::Ok => self.light_reads += 1,
            ReadAttempt::Failed => self.light_failures += 1,
            ReadAttempt::Skipped => {}
        }
        self.soil_reads += 1;
        if outcome.rssi_read {
            self.rssi_reads += 1;
        }

        if outcome.all_ok() {
            self.successful_readings += 1;
            self.read_time_us.record(read_time_us);
        } else {
            self.failed_readings += 1;
        }
    }

    /// Count one connectivity edge.
    pub fn record_link_event(&mut self, channel: LinkChannel, event: LinkEvent) {
        match (channel, event) {
            (LinkChannel::Wifi, LinkEvent::Down) => self.wifi_disconnects += 1,
            (LinkChannel::Wifi, LinkEvent::Up) => self.wifi_reconnects += 1,
            (LinkChannel::Telemetry, LinkEvent::Down) => self.telemetry_disconnects += 1,
            (LinkChannel::Telemetry, LinkEvent::Up) => self.telemetry_reconnects += 1,
        }
    }

    /// Count one published batch and its wall latency.
    pub fn record_publish(&mut self, latency_us: u64) {
        self.publish_batches += 1;
        self.publish_latency_us.record(latency_us);
    }

    /// Count one tick that skipped publishing because the session was
    /// down.
    pub fn record_publish_skipped(&mut self) {
        self.publish_failures += 1;
    }

    /// Fold one free-heap probe into the watermarks.
    pub fn record_heap(&mut self, free_bytes: u64) {
        self.heap_free.record(free_bytes);
        self.heap_free_last = Some(free_bytes);
    }

    /// Freeze the aggregate into a report as of `now`.
    pub fn snapshot(&self, now: Instant) -> SoakReport {
        SoakReport {
            elapsed_ms: now.duration_since(self.started).as_millis() as u64,
            total_readings: self.total_readings,
            successful_readings: self.successful_readings,
            failed_readings: self.failed_readings,
            read_time_us: self.read_time_us.summary(),
            climate_reads: self.climate_reads,
            climate_failures: self.climate_failures,
            light_reads: self.light_reads,
            light_failures: self.light_failures,
            soil_reads: self.soil_reads,
            rssi_reads: self.rssi_reads,
            publish_batches: self.publish_batches,
            publish_failures: self.publish_failures,
            publish_latency_us: self.publish_latency_us.summary(),
            wifi_disconnects: self.wifi_disconnects,
            wifi_reconnects: self.wifi_reconnects,
            telemetry_disconnects: self.telemetry_disconnects,
            telemetry_reconnects: self.telemetry_reconnects,
            heap_free: self.heap_free.summary(),
            heap_free_last: self.heap_free_last,
        }
    }
}

/// Frozen view of a soak run, ready to render or serialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoakReport {
    /// Run time covered by this report, in milliseconds.
    pub elapsed_ms: u64,
    /// Sample ticks attempted.
    pub total_readings: u64,
    /// Ticks where every attempted read succeeded.
    pub successful_readings: u64,
    /// Ticks where at least one attempted read failed.
    pub failed_readings: u64,
    /// Wall time of the read phase on clean ticks, microseconds.
    pub read_time_us: StatSummary,
    /// Successful climate sensor reads.
    pub climate_reads: u64,
    /// Failed climate sensor reads.
    pub climate_failures: u64,
    /// Successful light sensor reads.
    pub light_reads: u64,
    /// Failed light sensor reads.
    pub light_failures: u64,
    /// Soil probe reads (one per tick, the pin cannot fail).
    pub soil_reads: u64,
    /// RSSI reads taken while the WiFi link was up.
    pub rssi_reads: u64,
    /// Published channel batches.
    pub publish_batches: u64,
    /// Ticks that skipped publishing because the session was down.
    pub publish_failures: u64,
    /// Wall latency of the publish phase, microseconds.
    pub publish_latency_us: StatSummary,
    /// WiFi up-to-down edges.
    pub wifi_disconnects: u64,
    /// WiFi down-to-up edges.
    pub wifi_reconnects: u64,
    /// Telemetry session up-to-down edges.
    pub telemetry_disconnects: u64,
    /// Telemetry session down-to-up edges.
    pub telemetry_reconnects: u64,
    /// Free-heap watermarks across the run, bytes.
    pub heap_free: StatSummary,
    /// Most recent free-heap probe, bytes.
    pub heap_free_last: Option<u64>,
}

impl SoakReport {
    /// Share of ticks that were fully clean, as a percentage. `None`
    /// until at least one tick has run.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_readings == 0 {
            None
        } else {
            Some(self.successful_readings as f64 * 100.0 / self.total_readings as f64)
        }
    }

    /// Share of publish opportunities that went through, as a
    /// percentage. `None` until a tick has reached the publish phase.
    pub fn publish_success_rate(&self) -> Option<f64> {
        let attempts = self.publish_batches + self.publish_failures;
        if attempts == 0 {
            None
        } else {
            Some(self.publish_batches as f64 * 100.0 / attempts as f64)
        }
    }

    /// Render the compact multi-line report printed on each report tick.
    pub fn render_text(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("soak report (elapsed {} s)", self.elapsed_ms / 1000));
        lines.push(format!(
            "  readings: {} total, {} ok, {} failed{}",
            self.total_readings,
            self.successful_readings,
            self.failed_readings,
            match self.success_rate() {
                Some(rate) => format!(" ({:.2}% success)", rate),
                None => String::new(),
            }
        ));
        lines.push(format!("  read time (us): {}", render_stat(&self.read_time_us)));
        lines.push(format!(
            "  climate: {} reads, {} failures",
            self.climate_reads, self.climate_failures
        ));
        lines.push(format!(
            "  light: {} reads, {} failures",
            self.light_reads, self.light_failures
        ));
        lines.push(format!("  soil: {} reads", self.soil_reads));
        lines.push(format!("  wifi rssi: {} reads", self.rssi_reads));
        lines.push(format!(
            "  publish: {} batches, {} skipped{}",
            self.publish_batches,
            self.publish_failures,
            match self.publish_success_rate() {
                Some(rate) => format!(" ({:.2}% success)", rate),
                None => String::new(),
            }
        ));
        lines.push(format!(
            "  publish latency (us): {}",
            render_stat(&self.publish_latency_us)
        ));
        lines.push(format!(
            "  links: wifi {} down / {} up, telemetry {} down / {} up",
            self.wifi_disconnects,
            self.wifi_reconnects,
            self.telemetry_disconnects,
            self.telemetry_reconnects
        ));
        lines.push(format!("  heap free (bytes): {}", self.render_heap()));
        lines.join("\n")
    }

    fn render_heap(&self) -> String {
        match (self.heap_free_last, self.heap_free.min, self.heap_free.max) {
            (Some(last), Some(min), Some(max)) => {
                format!("last {}, min {}, max {}", last, min, max)
            }
            _ => "no data".to_string(),
        }
    }

    /// Render the two-column CSV block. The header row is always
    /// `Metric,Value`; derived rows (rates, stat minima and maxima) are
    /// omitted rather than filled with sentinels when no sample backs
    /// them.
    pub fn render_csv(&self) -> String {
        let mut rows = Vec::new();
        rows.push("Metric,Value".to_string());
        rows.push(format!("Total Readings,{}", self.total_readings));
        rows.push(format!("Successful Readings,{}", self.successful_readings));
        rows.push(format!("Failed Readings,{}", self.failed_readings));
        if let Some(rate) = self.success_rate() {
            rows.push(format!("Success Rate (%),{:.2}", rate));
        }
        if let Some(min) = self.read_time_us.min {
            rows.push(format!("Min Read Time (us),{}", min));
        }
        if let Some(max) = self.read_time_us.max {
            rows.push(format!("Max Read Time (us),{}", max));
        }
        if let Some(mean) = self.read_time_us.mean {
            rows.push(format!("Mean Read Time (us),{}", mean));
        }
        rows.push(format!("Climate Reads,{}", self.climate_reads));
        rows.push(format!("Climate Failures,{}", self.climate_failures));
        rows.push(format!("Light Reads,{}", self.light_reads));
        rows.push(format!("Light Failures,{}", self.light_failures));
        rows.push(format!("Soil Reads,{}", self.soil_reads));
        rows.push(format!("WiFi RSSI Reads,{}", self.rssi_reads));
        rows.push(format!("Publish Batches,{}", self.publish_batches));
        rows.push(format!("Publish Failures,{}", self.publish_failures));
        if let Some(mean) = self.publish_latency_us.mean {
            rows.push(format!("Mean Publish Latency (us),{}", mean));
        }
        rows.push(format!("WiFi Disconnects,{}", self.wifi_disconnects));
        rows.push(format!("WiFi Reconnects,{}", self.wifi_reconnects));
        rows.push(format!("Telemetry Disconnects,{}", self.telemetry_disconnects));
        rows.push(format!("Telemetry Reconnects,{}", self.telemetry_reconnects));
        if let Some(min) = self.heap_free.min {
            rows.push(format!("Min Free Heap (bytes),{}", min));
        }
        if let Some(max) = self.heap_free.max {
            rows.push(format!("Max Free Heap (bytes),{}", max));
        }
        rows.push(format!("Elapsed (s),{}", self.elapsed_ms / 1000));
        rows.join("\n")
    }

    /// Write the CSV block to a file, with a trailing newline.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut contents = self.render_csv();
        contents.push('\n');
        std::fs::write(path, contents)?;
        Ok(())
    }
}

fn render_stat(summary: &StatSummary) -> String {
    match (summary.min, summary.max, summary.mean) {
        (Some(min), Some(max), Some(mean)) => {
            format!("min {}, max {}, mean {}", min, max, mean)
        }
        _ => "no data".to_string(),
    }
}
