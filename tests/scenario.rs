use std::fs;

use tycoon_tick::{
    engine::TickSchedulerBuilder,
    scenario::ScenarioLoader,
    snapshot::{SnapshotConfig, SnapshotManager},
    store::InMemoryStore,
    systems::LiquidatingExit,
    world::{Building, CompanyId, RegionId},
};

fn scenario_loader() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

async fn run_harbor_town(ticks: u64) -> InMemoryStore {
    let scenario = scenario_loader()
        .load("scenarios/harbor_town.yaml")
        .unwrap();
    let store = scenario.build_store().unwrap();
    let mut scheduler = TickSchedulerBuilder::new(scenario.simulation_config())
        .build(store.clone(), LiquidatingExit::new(store.clone()));
    for _ in 0..ticks {
        scheduler.run_tick().await.unwrap();
    }
    store
}

fn fire_state(buildings: &[Building]) -> Vec<(u64, u8, bool, bool)> {
    buildings
        .iter()
        .map(|b| (b.id.raw(), b.damage_percent, b.on_fire, b.collapsed))
        .collect()
}

#[tokio::test]
async fn harbor_town_loads_and_runs() {
    let scenario = scenario_loader()
        .load("scenarios/harbor_town.yaml")
        .unwrap();
    assert_eq!(scenario.ticks(None), 24);
    assert_eq!(scenario.ticks(Some(3)), 3);

    let store = run_harbor_town(scenario.ticks(None)).await;
    let history = store.history();
    assert_eq!(history.len(), 24);
    // The valley is inactive, so only the harbor is processed.
    assert!(history.iter().all(|r| r.regions_processed == 1));
    assert!(store.company(CompanyId(1)).unwrap().cash > 250_000);
    assert_eq!(store.region(RegionId(1)).unwrap().total_land_tiles, 26);
}

#[tokio::test]
async fn same_seed_replays_the_same_fires() {
    let first = run_harbor_town(12).await;
    let second = run_harbor_town(12).await;
    assert_eq!(
        fire_state(&first.all_buildings()),
        fire_state(&second.all_buildings())
    );
    let cash = |store: &InMemoryStore| -> Vec<i64> {
        store.companies().iter().map(|c| c.cash).collect()
    };
    assert_eq!(cash(&first), cash(&second));
}

#[tokio::test]
async fn loads_scenario_from_any_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("tiny.yaml"),
        r#"
name: tiny
ticks: 2
config:
  economy:
    inactivity_threshold: 1
building_types:
  - { id: 7, name: Stall, category: commercial, base_profit: 100, base_value: 1000, base_cost: 800 }
regions:
  - id: 1
    name: Square
    map: ["..", ".."]
companies:
  - { id: 1, name: Vendor, region: 1 }
buildings:
  - { id: 1, region: 1, x: 1, y: 1, owner: 1, type: 7 }
"#,
    )
    .unwrap();

    let scenario = ScenarioLoader::new(dir.path()).load("tiny.yaml").unwrap();
    let config = scenario.simulation_config();
    assert_eq!(config.economy.inactivity_threshold, 1);
    let store = scenario.build_store().unwrap();
    let mut scheduler =
        TickSchedulerBuilder::new(config).build(store.clone(), LiquidatingExit::new(store.clone()));
    for _ in 0..scenario.ticks(None) {
        scheduler.run_tick().await.unwrap();
    }
    // Paid on the first tick only; the second tick finds it past the inactivity threshold.
    assert_eq!(store.company(CompanyId(1)).unwrap().cash, 90);
}

#[test]
fn missing_scenario_file_names_the_path() {
    let err = scenario_loader().load("scenarios/nope.yaml").unwrap_err();
    assert!(format!("{err:#}").contains("nope.yaml"));
}

#[tokio::test]
async fn snapshots_follow_the_interval() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = scenario_loader()
        .load("scenarios/harbor_town.yaml")
        .unwrap();
    let store = scenario.build_store().unwrap();
    let mut scheduler = TickSchedulerBuilder::new(scenario.simulation_config())
        .build(store.clone(), LiquidatingExit::new(store.clone()));
    let snapshots = SnapshotManager::new(SnapshotConfig::default().with_output_dir(dir.path()));

    let mut written = Vec::new();
    for _ in 0..12 {
        let summary = scheduler.run_tick().await.unwrap();
        if let Some(path) = snapshots
            .maybe_snapshot(&scenario.name, &summary, &store)
            .unwrap()
        {
            written.push(path);
        }
    }

    assert_eq!(written.len(), 2);
    assert_eq!(
        written[0],
        dir.path().join("harbor_town").join("tick_000006.json")
    );
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&written[1]).unwrap()).unwrap();
    assert_eq!(json["sequence"], 12);
    assert_eq!(json["regions"].as_array().unwrap().len(), 2);
    assert!(json["buildings"].is_array());
}
