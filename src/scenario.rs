use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::{
    config::SimulationConfig,
    store::InMemoryStore,
    world::{
        Building, BuildingId, BuildingType, BuildingTypeId, Company, CompanyId, Money, Region,
        RegionId, SecuritySystem, Terrain, Tier, Tile, TileId,
    },
};

fn default_active() -> bool {
    true
}

fn default_tier() -> Tier {
    Tier::Town
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default)]
    pub config: SimulationConfig,
    pub building_types: Vec<BuildingType>,
    pub regions: Vec<ScenarioRegion>,
    #[serde(default)]
    pub companies: Vec<ScenarioCompany>,
    #[serde(default)]
    pub buildings: Vec<ScenarioBuilding>,
    #[serde(default)]
    pub ownership: Vec<ScenarioOwnership>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioRegion {
    pub id: u64,
    pub name: String,
    #[serde(default = "default_tier")]
    pub tier: Tier,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub forced_exit_ticks: Option<u32>,
    /// One string per row: `.` land, `T` trees, `=` road, `~` water, `^` mountain.
    pub map: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioCompany {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub cash: Money,
    #[serde(default)]
    pub offshore: Money,
    #[serde(default)]
    pub region: Option<u64>,
    #[serde(default)]
    pub tier: Option<Tier>,
    #[serde(default)]
    pub ticks_since_action: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioBuilding {
    pub id: u64,
    pub region: u64,
    pub x: u32,
    pub y: u32,
    pub owner: u64,
    #[serde(rename = "type")]
    pub building_type: u64,
    #[serde(default)]
    pub damage: u8,
    #[serde(default)]
    pub on_fire: bool,
    #[serde(default)]
    pub for_sale: bool,
    #[serde(default)]
    pub security: Option<SecuritySystem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioOwnership {
    pub region: u64,
    pub owner: u64,
    pub x: u32,
    pub y: u32,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(24)
    }

    /// Config with the scenario seed applied when the config does not set one.
    pub fn simulation_config(&self) -> SimulationConfig {
        let mut config = self.config.clone();
        if config.scheduler.seed.is_none() {
            config.scheduler.seed = self.seed;
        }
        config
    }

    pub fn build_store(&self) -> Result<InMemoryStore> {
        let store = InMemoryStore::new();

        let mut type_ids = HashSet::new();
        for building_type in &self.building_types {
            if !type_ids.insert(building_type.id) {
                bail!("building type {} defined more than once", building_type.id);
            }
            store.insert_building_type(building_type.clone());
        }

        let mut next_tile = 1_u64;
        let mut grids: HashMap<RegionId, HashMap<(u32, u32), Tile>> = HashMap::new();
        for region in &self.regions {
            let region_id = RegionId(region.id);
            if grids.contains_key(&region_id) {
                bail!("region {} defined more than once", region.id);
            }
            let mut grid = HashMap::new();
            for (y, row) in region.map.iter().enumerate() {
                for (x, symbol) in row.chars().enumerate() {
                    let terrain = Terrain::from_symbol(symbol).ok_or_else(|| {
                        anyhow!(
                            "region {} has unknown map symbol '{symbol}' at ({x}, {y})",
                            region.id
                        )
                    })?;
                    let tile = Tile {
                        id: TileId(next_tile),
                        region_id,
                        x: x as u32,
                        y: y as u32,
                        terrain,
                        owner: None,
                    };
                    next_tile += 1;
                    grid.insert((x as u32, y as u32), tile);
                }
            }
            let total_land_tiles = grid.values().filter(|t| t.terrain.is_ownable()).count() as u32;
            store.insert_region(Region {
                id: region_id,
                name: region.name.clone(),
                tier: region.tier,
                active: region.active,
                total_land_tiles,
                forced_exit_ticks: region.forced_exit_ticks,
            });
            grids.insert(region_id, grid);
        }

        let mut company_ids = HashSet::new();
        for company in &self.companies {
            let region_id = company.region.map(RegionId);
            if let Some(region_id) = region_id {
                if !grids.contains_key(&region_id) {
                    bail!("company {} references unknown region {}", company.id, region_id);
                }
            }
            if !company_ids.insert(CompanyId(company.id)) {
                bail!("company {} defined more than once", company.id);
            }
            let tier = company
                .tier
                .or_else(|| {
                    region_id.and_then(|id| {
                        self.regions.iter().find(|r| r.id == id.raw()).map(|r| r.tier)
                    })
                })
                .unwrap_or(Tier::Town);
            store.insert_company(Company {
                id: CompanyId(company.id),
                name: company.name.clone(),
                cash: company.cash,
                offshore: company.offshore,
                region_id,
                tier,
                ticks_since_action: company.ticks_since_action,
                land_percentage: 0.0,
                land_streak: 0,
                hero_streak: 0,
            });
        }

        let mut building_ids = HashSet::new();
        let mut occupied = HashSet::new();
        for building in &self.buildings {
            let region_id = RegionId(building.region);
            let owner = CompanyId(building.owner);
            if !building_ids.insert(BuildingId(building.id)) {
                bail!("building {} defined more than once", building.id);
            }
            if !company_ids.contains(&owner) {
                bail!("building {} references unknown company {}", building.id, owner);
            }
            if !type_ids.contains(&BuildingTypeId(building.building_type)) {
                bail!(
                    "building {} references unknown building type {}",
                    building.id,
                    building.building_type
                );
            }
            let tile = grids
                .get_mut(&region_id)
                .and_then(|grid| grid.get_mut(&(building.x, building.y)))
                .ok_or_else(|| {
                    anyhow!(
                        "building {} is placed off the map of region {}",
                        building.id,
                        building.region
                    )
                })?;
            if tile.terrain != Terrain::Land {
                bail!(
                    "building {} is placed on {:?} at ({}, {})",
                    building.id,
                    tile.terrain,
                    building.x,
                    building.y
                );
            }
            if !occupied.insert(tile.id) {
                bail!("building {} shares a tile with another building", building.id);
            }
            tile.owner = Some(owner);
            let collapsed = building.damage >= 100;
            store.insert_building(Building {
                id: BuildingId(building.id),
                region_id,
                tile_id: tile.id,
                owner,
                building_type: BuildingTypeId(building.building_type),
                damage_percent: building.damage.min(100),
                on_fire: building.on_fire && !collapsed,
                collapsed,
                for_sale: building.for_sale,
                calculated_profit: 0,
                calculated_value: 0,
                market_value: 0,
                needs_recalculation: true,
                security: building.security,
            });
        }

        for claim in &self.ownership {
            let owner = CompanyId(claim.owner);
            if !company_ids.contains(&owner) {
                bail!("ownership references unknown company {}", claim.owner);
            }
            let tile = grids
                .get_mut(&RegionId(claim.region))
                .and_then(|grid| grid.get_mut(&(claim.x, claim.y)))
                .ok_or_else(|| {
                    anyhow!(
                        "ownership at ({}, {}) is off the map of region {}",
                        claim.x,
                        claim.y,
                        claim.region
                    )
                })?;
            if !tile.terrain.is_ownable() {
                bail!(
                    "tile ({}, {}) in region {} is not ownable land",
                    claim.x,
                    claim.y,
                    claim.region
                );
            }
            tile.owner = Some(owner);
        }

        for grid in grids.into_values() {
            for tile in grid.into_values() {
                store.insert_tile(tile);
            }
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name: minimal
seed: 3
building_types:
  - id: 1
    name: Kiosk
    category: commercial
    base_profit: 500
    base_value: 40000
    base_cost: 30000
regions:
  - id: 1
    name: Dock
    map:
      - "..T"
      - "=~."
companies:
  - id: 1
    name: Acme
    region: 1
buildings:
  - { id: 1, region: 1, x: 0, y: 0, owner: 1, type: 1 }
ownership:
  - { region: 1, owner: 1, x: 2, y: 0 }
"#;

    #[test]
    fn builds_store_from_yaml() {
        let scenario: Scenario = serde_yaml::from_str(MINIMAL).unwrap();
        let store = scenario.build_store().unwrap();

        let region = store.region(RegionId(1)).unwrap();
        assert_eq!(region.total_land_tiles, 4);
        assert_eq!(region.tier, Tier::Town);
        let building = store.building(BuildingId(1)).unwrap();
        assert!(building.needs_recalculation);
        let tile = store.tile(building.tile_id).unwrap();
        assert_eq!(tile.owner, Some(CompanyId(1)));
        assert_eq!(scenario.simulation_config().scheduler.seed, Some(3));
    }

    #[test]
    fn rejects_building_on_water() {
        let yaml = MINIMAL.replace("x: 0, y: 0, owner", "x: 1, y: 1, owner");
        let scenario: Scenario = serde_yaml::from_str(&yaml).unwrap();
        let err = scenario.build_store().err().unwrap();
        assert!(err.to_string().contains("Water"), "{err}");
    }

    #[test]
    fn rejects_unknown_map_symbol() {
        let yaml = MINIMAL.replace("\"=~.\"", "\"=~?\"");
        let scenario: Scenario = serde_yaml::from_str(&yaml).unwrap();
        assert!(scenario.build_store().is_err());
    }
}
