//! Verdant - Garden Station Telemetry Agent Binary
//!
//! A standalone agent that samples garden sensors on a fixed cadence and
//! publishes readings to numbered dashboard channels. The reference
//! binary drives the built-in simulated rig, so it runs on any host.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::time::Duration;
use tokio_stream::StreamExt;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use verdant::soil::{DEFAULT_SOIL_DRY, DEFAULT_SOIL_WET};
use verdant::station::{sim, LightMode};
use verdant::{
    wifi_quality, Agent, SoilCalibration, StationConfig, StationSnapshot,
    DEFAULT_REPORT_INTERVAL_MS, DEFAULT_SAMPLE_INTERVAL_MS, DEFAULT_SOAK_DURATION_MS,
};

#[derive(Parser)]
#[command(name = "verdant")]
#[command(about = "🌱 Verdant - Garden Station Telemetry Agent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "A garden station agent that polls climate, light and soil sensors \
and publishes each valid reading to a numbered cloud dashboard channel")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// WiFi network name
    #[arg(long, default_value = "greenhouse")]
    ssid: String,

    /// WiFi passphrase
    #[arg(long, default_value = "changeme")]
    password: String,

    /// Telemetry device auth token
    #[arg(long, default_value = "dev-token")]
    token: String,

    /// Sample tick interval in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_SAMPLE_INTERVAL_MS)]
    interval: u64,

    /// Seed for the simulated sensor rig
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Raw soil sample with the probe in air
    #[arg(long, default_value_t = DEFAULT_SOIL_DRY)]
    soil_dry: u16,

    /// Raw soil sample with the probe in water
    #[arg(long, default_value_t = DEFAULT_SOIL_WET)]
    soil_wet: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample and publish until stopped (default)
    Run,

    /// Run the instrumented soak variant for a bounded window
    Soak(SoakArgs),

    /// Take readings without the publish loop
    Probe(ProbeArgs),
}

#[derive(Args)]
struct SoakArgs {
    /// Soak window length in seconds
    #[arg(long, default_value_t = DEFAULT_SOAK_DURATION_MS / 1000)]
    duration_secs: u64,

    /// Interim report interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_REPORT_INTERVAL_MS)]
    report_interval: u64,

    /// Write the final CSV report to this path
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ProbeArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,

    /// Keep sampling at the configured interval instead of exiting
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    init_logging(&cli)?;

    // Print banner
    print_banner();

    match &cli.command {
        Some(Commands::Run) => {
            run_command(&cli).await?;
        }
        Some(Commands::Soak(args)) => {
            soak_command(&cli, args).await?;
        }
        Some(Commands::Probe(args)) => {
            probe_command(&cli, args).await?;
        }
        None => {
            // Default to the publish loop
            run_command(&cli).await?;
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn print_banner() {
    println!("🌱 Verdant - Garden Station Telemetry Agent");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!("   Fixed-cadence sampling with dashboard publishing");
    println!();
}

fn build_config(cli: &Cli) -> StationConfig {
    StationConfig::new()
        .with_ssid(&cli.ssid)
        .with_password(&cli.password)
        .with_device_token(&cli.token)
        .with_sample_interval_ms(cli.interval)
        .with_soil_bounds(cli.soil_dry, cli.soil_wet)
}

async fn run_command(cli: &Cli) -> anyhow::Result<()> {
    info!("Starting verdant station agent...");

    let (station, _handles) = sim::steady(cli.seed);
    info!("Simulated station rig assembled (seed {})", cli.seed);

    let agent = Agent::new(station, build_config(cli))?;
    info!("Sampling every {}ms", cli.interval);

    agent.run().await?;

    Ok(())
}

async fn soak_command(cli: &Cli, args: &SoakArgs) -> anyhow::Result<()> {
    info!(
        "Starting soak run: {}s window, reports every {}ms",
        args.duration_secs, args.report_interval
    );

    let config = build_config(cli)
        .with_soak_duration_ms(args.duration_secs * 1000)
        .with_report_interval_ms(args.report_interval);

    let (station, _handles) = sim::steady(cli.seed);
    let agent = Agent::new(station, config)?;

    let report = agent.run_soak().await?;

    if let Some(path) = &args.output {
        report
            .write_csv(path)
            .with_context(|| format!("writing CSV report to {}", path.display()))?;
        info!("CSV report written to {}", path.display());
    }

    Ok(())
}

async fn probe_command(cli: &Cli, args: &ProbeArgs) -> anyhow::Result<()> {
    let (mut station, _handles) = sim::steady(cli.seed);
    station.init_sensors(LightMode::default());
    station.wifi_mut().connect(&cli.ssid, &cli.password);

    let calibration = SoilCalibration::new(cli.soil_dry, cli.soil_wet)?;

    if args.watch {
        let mut stream = station.into_stream(calibration, Duration::from_millis(cli.interval));
        while let Some(snapshot) = stream.next().await {
            match args.format.as_str() {
                "json" => println!("{}", serde_json::to_string(&snapshot)?),
                "pretty" => print_pretty_snapshot(&snapshot),
                _ => {
                    error!("Unsupported format: {}. Use 'json' or 'pretty'", args.format);
                    std::process::exit(1);
                }
            }
        }
    } else {
        let outcome = station.sample(&calibration);
        match args.format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&outcome.snapshot)?),
            "pretty" => print_pretty_snapshot(&outcome.snapshot),
            _ => {
                error!("Unsupported format: {}. Use 'json' or 'pretty'", args.format);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_pretty_snapshot(snapshot: &StationSnapshot) {
    println!(
        "🌱 Station Snapshot ({})",
        chrono::DateTime::from_timestamp_millis(snapshot.timestamp as i64)
            .unwrap_or_default()
            .format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("==========================================");
    println!();

    println!("🌡️  Climate:");
    match snapshot.temperature_c {
        Some(temp) => println!("  Temperature: {:.1}°C", temp),
        None => println!("  Temperature: unavailable"),
    }
    match snapshot.humidity_pct {
        Some(humidity) => println!("  Humidity: {:.1}%", humidity),
        None => println!("  Humidity: unavailable"),
    }
    println!();

    println!("☀️  Light:");
    match snapshot.illuminance_lux {
        Some(lux) => println!("  Illuminance: {:.0} lux", lux),
        None => println!("  Illuminance: unavailable"),
    }
    println!();

    println!("🪴 Soil:");
    println!("  Moisture: {:.1}%", snapshot.soil_pct);
    println!("  Raw sample: {}", snapshot.soil_raw);
    println!();

    println!("📶 WiFi:");
    match snapshot.wifi_rssi_dbm {
        Some(rssi) => println!("  Signal: {} dBm ({})", rssi, wifi_quality(rssi)),
        None => println!("  Signal: disconnected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        use clap::Parser;

        let cli = Cli::try_parse_from(["verdant", "--interval", "5000"]).unwrap();
        assert_eq!(cli.interval, 5000);
    }

    #[test]
    fn test_default_values() {
        use clap::Parser;

        let cli = Cli::try_parse_from(["verdant"]).unwrap();
        assert_eq!(cli.interval, DEFAULT_SAMPLE_INTERVAL_MS);
        assert_eq!(cli.seed, 42);
        assert_eq!(cli.ssid, "greenhouse");
        assert_eq!(cli.soil_dry, DEFAULT_SOIL_DRY);
        assert_eq!(cli.soil_wet, DEFAULT_SOIL_WET);
    }

    #[test]
    fn test_soak_args() {
        use clap::Parser;

        let cli = Cli::try_parse_from([
            "verdant",
            "soak",
            "--duration-secs",
            "60",
            "--output",
            "report.csv",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Soak(args)) => {
                assert_eq!(args.duration_secs, 60);
                assert_eq!(args.report_interval, DEFAULT_REPORT_INTERVAL_MS);
                assert_eq!(args.output, Some(PathBuf::from("report.csv")));
            }
            _ => panic!("expected soak subcommand"),
        }
    }

    #[test]
    fn test_probe_args() {
        use clap::Parser;

        let cli = Cli::try_parse_from(["verdant", "probe", "--format", "json", "--watch"]).unwrap();
        match cli.command {
            Some(Commands::Probe(args)) => {
                assert_eq!(args.format, "json");
                assert!(args.watch);
            }
            _ => panic!("expected probe subcommand"),
        }
    }
}
