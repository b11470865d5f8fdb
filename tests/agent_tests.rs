//! End-to-end agent tests over the simulated station rig.
//!
//! Every test runs under a paused tokio clock, so a five-minute soak
//! window completes in milliseconds of wall time and every tick lands
//! on an exact instant.

use tokio::time::Duration;
use tokio_test::assert_ok;

use verdant::station::sim::{self, SimMemory};
use verdant::{Agent, Channel, StationConfig};

fn soak_config(duration_ms: u64) -> StationConfig {
    StationConfig::new().with_soak_duration_ms(duration_ms)
}

#[tokio::test(start_paused = true)]
async fn full_soak_window_samples_exactly_on_cadence() {
    let (station, handles) = sim::steady(42);
    let agent = Agent::new(station, soak_config(300_000))
        .unwrap()
        .with_memory_probe(Box::new(SimMemory::new(42)));

    let report = agent.run_soak().await.unwrap();

    // Ticks at 0, 2000, ..., 298000 ms; the deadline at 300000 ms wins
    // before a 151st tick can fire.
    assert_eq!(report.elapsed_ms, 300_000);
    assert_eq!(report.total_readings, 150);
    assert_eq!(report.successful_readings, 150);
    assert_eq!(report.failed_readings, 0);
    assert_eq!(report.climate_reads, 150);
    assert_eq!(report.light_reads, 150);
    assert_eq!(report.soil_reads, 150);
    assert_eq!(report.rssi_reads, 150);
    assert_eq!(report.publish_batches, 150);
    assert_eq!(report.publish_failures, 0);
    assert_eq!(report.success_rate(), Some(100.0));

    // Five channels per batch, no outages.
    assert_eq!(handles.publishes.len(), 150 * 5);
    assert_eq!(report.wifi_disconnects, 0);
    assert_eq!(report.telemetry_disconnects, 0);

    // Heap watermarks came from the simulated probe.
    assert!(report.heap_free.count > 0);
    let min = report.heap_free.min.unwrap();
    let max = report.heap_free.max.unwrap();
    assert!(min <= max);
    assert!((160_000..=200_000).contains(&min));

    let csv = report.render_csv();
    assert!(csv.starts_with("Metric,Value\n"));
    assert!(csv.contains("Total Readings,150"));
    assert!(csv.contains("Success Rate (%),100.00"));
    assert!(csv.contains("Elapsed (s),300"));
}

#[tokio::test(start_paused = true)]
async fn each_tick_publishes_channels_in_declared_order() {
    let (station, handles) = sim::steady(7);
    // One tick fits in the window: sampled at t=0, deadline at t=1000.
    let agent = Agent::new(station, soak_config(1000)).unwrap();

    let report = agent.run_soak().await.unwrap();

    assert_eq!(report.total_readings, 1);
    assert_eq!(report.publish_batches, 1);
    assert_eq!(handles.publishes.channels(), Channel::PUBLISH_ORDER.to_vec());

    // Values land in plausible engineering ranges.
    let records = handles.publishes.records();
    assert!((20.0..=27.0).contains(&records[0].value), "temp {}", records[0].value);
    assert!((40.0..=70.0).contains(&records[1].value), "humidity {}", records[1].value);
    assert!(records[2].value >= 0.0, "lux {}", records[2].value);
    assert!((0.0..=100.0).contains(&records[3].value), "soil {}", records[3].value);
    assert!((-70.0..=-45.0).contains(&records[4].value), "rssi {}", records[4].value);
}

#[tokio::test(start_paused = true)]
async fn wifi_outage_is_counted_once_and_retried_every_pass() {
    let (station, handles) = sim::builder(3)
        .wifi_outage(Duration::from_secs(2), Duration::from_secs(4))
        .build();
    let agent = Agent::new(station, soak_config(10_000)).unwrap();

    let report = agent.run_soak().await.unwrap();

    // One outage, one edge each way, regardless of how many passes saw it.
    assert_eq!(report.wifi_disconnects, 1);
    assert_eq!(report.wifi_reconnects, 1);

    // Ticks at 0, 2, 4, 6, 8 s; only the one at 2 s misses RSSI.
    assert_eq!(report.total_readings, 5);
    assert_eq!(report.rssi_reads, 4);

    // The telemetry session is its own link, so publishing continued,
    // with the signal channel skipped while the radio was down.
    assert_eq!(report.publish_batches, 5);
    assert_eq!(handles.publishes.len(), 4 * 5 + 4);
    assert_eq!(handles.publishes.values_for(Channel::WifiSignal).len(), 4);

    // Uncapped fire-and-forget reconnects: one per pass across the two
    // second outage, plus the single startup join.
    let attempts = handles.wifi_attempts.get();
    assert!(attempts > 100, "only {} connect attempts", attempts);
}

#[tokio::test(start_paused = true)]
async fn telemetry_outage_skips_publishing_but_keeps_sampling() {
    let (station, handles) = sim::builder(5)
        .telemetry_outage(Duration::from_millis(1500), Duration::from_millis(2500))
        .build();
    let agent = Agent::new(station, soak_config(6000)).unwrap();

    let report = agent.run_soak().await.unwrap();

    // Ticks at 0, 2, 4 s; the one at 2 s falls inside the outage.
    assert_eq!(report.total_readings, 3);
    assert_eq!(report.successful_readings, 3);
    assert_eq!(report.publish_batches, 2);
    assert_eq!(report.publish_failures, 1);
    assert_eq!(report.telemetry_disconnects, 1);
    assert_eq!(report.telemetry_reconnects, 1);
    assert_eq!(handles.publishes.len(), 2 * 5);

    let rate = report.publish_success_rate().unwrap();
    assert!((rate - 66.66).abs() < 0.1, "rate {}", rate);
}

#[tokio::test(start_paused = true)]
async fn failed_climate_handshake_disables_the_sensor_for_the_run() {
    let (station, handles) = sim::builder(11).climate_init_fails().build();
    let agent = Agent::new(station, soak_config(6000)).unwrap();

    let report = agent.run_soak().await.unwrap();

    // Never attempted, so never failed: the run stays clean.
    assert_eq!(report.total_readings, 3);
    assert_eq!(report.successful_readings, 3);
    assert_eq!(report.climate_reads, 0);
    assert_eq!(report.climate_failures, 0);
    assert_eq!(report.light_reads, 3);

    // Temperature and humidity channels are simply absent on the wire.
    assert!(handles.publishes.values_for(Channel::Temperature).is_empty());
    assert!(handles.publishes.values_for(Channel::Humidity).is_empty());
    assert_eq!(handles.publishes.values_for(Channel::Illuminance).len(), 3);
    assert_eq!(handles.publishes.values_for(Channel::SoilMoisture).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn transient_climate_failures_are_counted_and_survived() {
    let (station, handles) = sim::builder(13).climate_fails_every(3).build();
    let agent = Agent::new(station, soak_config(20_000)).unwrap();

    let report = agent.run_soak().await.unwrap();

    // Ten ticks; read attempts 3, 6 and 9 fail.
    assert_eq!(report.total_readings, 10);
    assert_eq!(report.climate_reads, 7);
    assert_eq!(report.climate_failures, 3);
    assert_eq!(report.successful_readings, 7);
    assert_eq!(report.failed_readings, 3);
    assert_eq!(report.success_rate(), Some(70.0));

    // Timing is folded in for clean ticks only.
    assert_eq!(report.read_time_us.count, 7);

    // The failing ticks still publish everything else.
    assert_eq!(report.publish_batches, 10);
    assert_eq!(handles.publishes.values_for(Channel::Temperature).len(), 7);
    assert_eq!(handles.publishes.values_for(Channel::SoilMoisture).len(), 10);
}

#[tokio::test(start_paused = true)]
async fn startup_issues_one_handshake_per_link() {
    let (station, handles) = sim::steady(17);
    let agent = Agent::new(station, soak_config(1000)).unwrap();

    let report = tokio_test::assert_ok!(agent.run_soak().await);

    assert_eq!(report.total_readings, 1);
    assert_eq!(handles.wifi_attempts.get(), 1);
    assert_eq!(handles.telemetry_attempts.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn soak_report_serializes_for_downstream_tooling() {
    let (station, _handles) = sim::steady(23);
    let agent = Agent::new(station, soak_config(4000)).unwrap();

    let report = agent.run_soak().await.unwrap();
    let json = serde_json::to_string(&report).unwrap();
    let back: verdant::SoakReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report);
}
