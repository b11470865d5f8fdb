//! Performance benchmarks for the hot paths of the sampling loop.
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use futures_util::StreamExt;
use tokio::time::{Duration, Instant};

use verdant::station::sim::{self, SimTelemetry};
use verdant::station::LightMode;
use verdant::{
    publish_snapshot, ReadAttempt, RunningStat, SampleOutcome, SoilCalibration, SoakMetrics,
    StationSnapshot,
};

fn full_snapshot() -> StationSnapshot {
    let mut snapshot = StationSnapshot::new();
    snapshot.temperature_c = Some(23.5);
    snapshot.humidity_pct = Some(55.0);
    snapshot.illuminance_lux = Some(812.0);
    snapshot.soil_raw = 1860;
    snapshot.soil_pct = 50.0;
    snapshot.wifi_rssi_dbm = Some(-57);
    snapshot
}

fn bench_moisture_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("moisture_conversion");
    for (dry, wet) in [(2521u16, 1200u16), (3000, 500), (4095, 0)].iter() {
        let calibration = SoilCalibration::new(*dry, *wet).expect("distinct bounds");
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}-{}", dry, wet)),
            &calibration,
            |b, calibration| {
                b.iter(|| {
                    let mut acc = 0.0f32;
                    for raw in (0..4096u16).step_by(37) {
                        acc += calibration.moisture_percent(raw);
                    }
                    acc
                })
            },
        );
    }
    group.finish();
}

fn bench_running_stat(c: &mut Criterion) {
    c.bench_function("running_stat_record_1k", |b| {
        b.iter(|| {
            let mut stat = RunningStat::new();
            for sample in 0..1000u64 {
                stat.record(sample * 7 % 500);
            }
            stat.mean()
        })
    });
}

fn bench_station_sample(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");

    let (mut station, _handles) = rt.block_on(async {
        let (mut station, handles) = sim::steady(42);
        station.init_sensors(LightMode::default());
        station.wifi_mut().connect("bench", "bench");
        (station, handles)
    });
    let calibration = SoilCalibration::default();

    c.bench_function("station_sample", |b| b.iter(|| station.sample(&calibration)));
}

fn bench_publish_batch(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");

    let mut telemetry = rt.block_on(async { SimTelemetry::new() });
    let snapshot = full_snapshot();

    c.bench_function("publish_snapshot_batch", |b| {
        b.iter(|| publish_snapshot(&mut telemetry, &snapshot))
    });
}

fn bench_soak_aggregation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");

    let mut metrics = rt.block_on(async { SoakMetrics::start(Instant::now()) });
    let outcome = SampleOutcome {
        snapshot: full_snapshot(),
        climate: ReadAttempt::Ok,
        light: ReadAttempt::Ok,
        rssi_read: true,
    };

    c.bench_function("soak_record_sample", |b| {
        b.iter(|| metrics.record_sample(&outcome, 120))
    });
}

fn bench_report_render(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");

    let report = rt.block_on(async {
        let mut metrics = SoakMetrics::start(Instant::now());
        for _ in 0..150 {
            metrics.record_sample(
                &SampleOutcome {
                    snapshot: full_snapshot(),
                    climate: ReadAttempt::Ok,
                    light: ReadAttempt::Ok,
                    rssi_read: true,
                },
                120,
            );
            metrics.record_publish(80);
            metrics.record_heap(180_000);
        }
        metrics.snapshot(metrics.started())
    });

    c.bench_function("report_render_text", |b| b.iter(|| report.render_text()));
    c.bench_function("report_render_csv", |b| b.iter(|| report.render_csv()));
}

fn bench_stream_first_snapshot(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");

    c.bench_function("stream_setup_and_first_snapshot", |b| {
        b.to_async(&rt).iter(|| async {
            let (mut station, _handles) = sim::steady(42);
            station.init_sensors(LightMode::default());
            let mut stream =
                station.into_stream(SoilCalibration::default(), Duration::from_millis(2000));
            stream.next().await
        })
    });
}

fn bench_snapshot_serialization(c: &mut Criterion) {
    let snapshot = full_snapshot();

    c.bench_function("snapshot_json_serialization", |b| {
        b.iter(|| serde_json::to_string(&snapshot).expect("Should serialize"))
    });

    c.bench_function("snapshot_json_pretty_serialization", |b| {
        b.iter(|| serde_json::to_string_pretty(&snapshot).expect("Should serialize"))
    });
}

criterion_group!(
    benches,
    bench_moisture_conversion,
    bench_running_stat,
    bench_station_sample,
    bench_publish_batch,
    bench_soak_aggregation,
    bench_report_render,
    bench_stream_first_snapshot,
    bench_snapshot_serialization
);
criterion_main!(benches);
