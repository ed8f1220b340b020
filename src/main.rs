use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tycoon_tick::{
    engine::{TickError, TickSchedulerBuilder, TickSummary},
    scenario::ScenarioLoader,
    snapshot::{SnapshotConfig, SnapshotManager},
    systems::LiquidatingExit,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Tycoon tick engine runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/harbor_town.yaml")]
    scenario: PathBuf,

    /// Override tick count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Wall-clock seconds between ticks; runs back to back when omitted
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Write a snapshot every N ticks (0 disables)
    #[arg(long, default_value_t = 0)]
    snapshot_interval: u64,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;
    let store = scenario.build_store()?;
    let ticks = scenario.ticks(cli.ticks);
    let mut config = scenario.simulation_config();
    if cli.seed.is_some() {
        config.scheduler.seed = cli.seed;
    }

    let snapshots = SnapshotManager::new(SnapshotConfig {
        interval: cli.snapshot_interval,
        output_dir: cli
            .snapshot_dir
            .unwrap_or_else(|| SnapshotConfig::default().output_dir),
    });
    let mut scheduler =
        TickSchedulerBuilder::new(config).build(store.clone(), LiquidatingExit::new(store.clone()));

    tracing::info!(
        target: "tycoon::runner",
        scenario = %scenario.name,
        ticks,
        regions = store.regions().len(),
        companies = store.companies().len(),
        "runner.started"
    );

    let mut interval = cli
        .interval_secs
        .map(|secs| tokio::time::interval(Duration::from_secs(secs.max(1))));
    for _ in 0..ticks {
        if let Some(interval) = interval.as_mut() {
            tokio::select! {
                _ = interval.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!(target: "tycoon::runner", "runner.interrupted");
                    break;
                }
            }
        }
        match scheduler.run_tick().await {
            Ok(summary) => {
                print_summary(&summary);
                snapshots.maybe_snapshot(&scenario.name, &summary, &store)?;
            }
            Err(TickError::AlreadyRunning) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    println!(
        "Scenario '{}' completed for {} ticks. Companies remaining in regions: {}",
        scenario.name,
        scheduler.ticks_run(),
        store
            .companies()
            .iter()
            .filter(|c| c.region_id.is_some())
            .count()
    );
    Ok(())
}

fn print_summary(summary: &TickSummary) {
    println!(
        "tick {:>4} {:?}: regions {} (failed {}), net {} (tax {}), fires +{} -{}, collapsed {}, exits {}",
        summary.sequence,
        summary.status,
        summary.regions_processed,
        summary.region_failures.len(),
        summary.total_net,
        summary.total_tax,
        summary.fires_started,
        summary.fires_extinguished,
        summary.buildings_collapsed,
        summary.forced_exits.len()
    );
}
