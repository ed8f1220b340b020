#![allow(dead_code)]

use tycoon_tick::{
    config::SimulationConfig,
    engine::{TickScheduler, TickSchedulerBuilder},
    rng::RandomSource,
    store::InMemoryStore,
    systems::LiquidatingExit,
    world::{
        Building, BuildingCategory, BuildingId, BuildingType, BuildingTypeId, Company, CompanyId,
        Money, Region, RegionId, SecuritySystem, Terrain, Tier, Tile, TileId,
    },
};

pub type Scheduler = TickScheduler<InMemoryStore, LiquidatingExit<InMemoryStore>>;

pub const PLAIN: BuildingTypeId = BuildingTypeId(1);

pub fn tile_id(region: u64, x: u32, y: u32) -> TileId {
    TileId(region * 10_000 + u64::from(y) * 100 + u64::from(x))
}

/// Seeds a region from ASCII rows (`.` land, `T` trees, `=` road, `~` water).
pub fn region(store: &InMemoryStore, id: u64, tier: Tier, rows: &[&str]) {
    let mut land = 0;
    for (y, row) in rows.iter().enumerate() {
        for (x, symbol) in row.chars().enumerate() {
            let terrain = Terrain::from_symbol(symbol).unwrap();
            if terrain.is_ownable() {
                land += 1;
            }
            store.insert_tile(Tile {
                id: tile_id(id, x as u32, y as u32),
                region_id: RegionId(id),
                x: x as u32,
                y: y as u32,
                terrain,
                owner: None,
            });
        }
    }
    store.insert_region(Region {
        id: RegionId(id),
        name: format!("Region {id}"),
        tier,
        active: true,
        total_land_tiles: land,
        forced_exit_ticks: None,
    });
}

pub fn set_forced_exit_ticks(store: &InMemoryStore, id: u64, ticks: u32) {
    let mut region = store.region(RegionId(id)).unwrap();
    region.forced_exit_ticks = Some(ticks);
    store.insert_region(region);
}

/// One building type with no adjacency effects.
pub fn plain_type(store: &InMemoryStore, base_profit: Money) {
    store.insert_building_type(BuildingType {
        id: PLAIN,
        name: "Depot".into(),
        category: BuildingCategory::Industrial,
        base_profit,
        base_value: 50_000,
        base_cost: 20_000,
        adjacency: Vec::new(),
    });
}

pub fn company(store: &InMemoryStore, id: u64, cash: Money, region: Option<u64>) {
    store.insert_company(Company {
        id: CompanyId(id),
        name: format!("Company {id}"),
        cash,
        offshore: 0,
        region_id: region.map(RegionId),
        tier: Tier::Town,
        ticks_since_action: 0,
        land_percentage: 0.0,
        land_streak: 0,
        hero_streak: 0,
    });
}

pub fn update_company(store: &InMemoryStore, id: u64, edit: impl FnOnce(&mut Company)) {
    let mut company = store.company(CompanyId(id)).unwrap();
    edit(&mut company);
    store.insert_company(company);
}

pub fn building(id: u64, region: u64, x: u32, y: u32, owner: u64) -> Building {
    Building {
        id: BuildingId(id),
        region_id: RegionId(region),
        tile_id: tile_id(region, x, y),
        owner: CompanyId(owner),
        building_type: PLAIN,
        damage_percent: 0,
        on_fire: false,
        collapsed: false,
        for_sale: false,
        calculated_profit: 0,
        calculated_value: 0,
        market_value: 0,
        needs_recalculation: true,
        security: None,
    }
}

pub fn sprinklers() -> Option<SecuritySystem> {
    Some(SecuritySystem {
        sprinklers: true,
        ..SecuritySystem::default()
    })
}

/// Inserts the building and hands its tile to the owner.
pub fn place(store: &InMemoryStore, building: Building) {
    set_tile_owner(store, building.tile_id, Some(building.owner));
    store.insert_building(building);
}

pub fn set_tile_owner(store: &InMemoryStore, tile: TileId, owner: Option<CompanyId>) {
    let mut tile = store.tile(tile).unwrap();
    tile.owner = owner;
    store.insert_tile(tile);
}

pub fn scheduler(store: &InMemoryStore, random: impl RandomSource + 'static) -> Scheduler {
    scheduler_with(store, SimulationConfig::default(), random)
}

pub fn scheduler_with(
    store: &InMemoryStore,
    config: SimulationConfig,
    random: impl RandomSource + 'static,
) -> Scheduler {
    TickSchedulerBuilder::new(config)
        .with_random(random)
        .build(store.clone(), LiquidatingExit::new(store.clone()))
}
