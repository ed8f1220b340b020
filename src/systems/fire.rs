use std::collections::{BTreeSet, HashMap};

use crate::{
    config::FireConfig,
    rng::RandomSource,
    spatial::{Direction, RegionGrid, TilePos},
    store::{FireBatch, FireUpdate, Store},
    systems::{RegionContext, RegionError},
    world::{Building, BuildingId, Tile},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FireReport {
    pub fires_started: u32,
    pub fires_extinguished: u32,
    pub buildings_damaged: u32,
    pub buildings_collapsed: u32,
}

pub struct FireSpreadEngine {
    config: FireConfig,
}

impl FireSpreadEngine {
    pub fn new(config: FireConfig) -> Self {
        Self { config }
    }

    pub async fn run<S: Store>(
        &self,
        ctx: &RegionContext<'_>,
        store: &S,
        rng: &mut dyn RandomSource,
    ) -> Result<FireReport, RegionError> {
        let region = ctx.region.id;
        let buildings = store.buildings(region).await?;
        if !buildings.iter().any(|b| b.on_fire && !b.collapsed) {
            return Ok(FireReport::default());
        }
        let tiles = store.tiles(region).await?;
        let (report, batch) = self.spread(&tiles, buildings, rng);
        if !batch.is_empty() {
            store.apply_fire_batch(region, batch).await?;
        }
        tracing::debug!(
            target: "tycoon::fire",
            region = %region,
            started = report.fires_started,
            extinguished = report.fires_extinguished,
            damaged = report.buildings_damaged,
            collapsed = report.buildings_collapsed,
            "fire.region.done"
        );
        Ok(report)
    }

    /// Runs one fire pass over a region's buildings without touching the store.
    pub fn spread(
        &self,
        tiles: &[Tile],
        mut buildings: Vec<Building>,
        rng: &mut dyn RandomSource,
    ) -> (FireReport, FireBatch) {
        let grid = RegionGrid::new(tiles, &buildings);
        let index: HashMap<BuildingId, usize> = buildings
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id, i))
            .collect();
        // Fixed up front: anything ignited during this pass waits for the next tick.
        let mut burning: Vec<usize> = buildings
            .iter()
            .enumerate()
            .filter(|(_, b)| b.on_fire && !b.collapsed)
            .map(|(i, _)| i)
            .collect();
        burning.sort_by_key(|i| buildings[*i].id);

        let mut report = FireReport::default();
        let mut touched = BTreeSet::new();
        let mut dirty = BTreeSet::new();

        for i in burning {
            let sprinklered = buildings[i].has_sprinklers();
            let amount = if sprinklered {
                self.config.sprinkler_damage_per_tick
            } else {
                self.config.damage_per_tick
            };
            let id = buildings[i].id;
            let tile_id = buildings[i].tile_id;
            touched.insert(id);

            if buildings[i].apply_damage(amount) {
                report.buildings_damaged += 1;
                dirty.insert(id);
                dirty.extend(grid.surrounding_buildings(tile_id));
            }
            if buildings[i].collapsed {
                report.buildings_collapsed += 1;
                continue;
            }
            if sprinklered && rng.chance(self.config.extinguish_chance) {
                buildings[i].on_fire = false;
                report.fires_extinguished += 1;
                continue;
            }

            let Some(origin) = grid.position_of(tile_id) else {
                continue;
            };
            for direction in Direction::ALL {
                let Some(next) = origin.step(direction, 1) else {
                    continue;
                };
                let Some(next_tile) = grid.tile_at(next) else {
                    continue;
                };
                self.try_ignite(
                    &grid,
                    next,
                    self.config.spread_chance,
                    &index,
                    &mut buildings,
                    rng,
                    &mut touched,
                    &mut report,
                );
                if next_tile.terrain.is_flammable() {
                    if let Some(beyond) = origin.step(direction, 2) {
                        self.try_ignite(
                            &grid,
                            beyond,
                            self.config.jump_chance,
                            &index,
                            &mut buildings,
                            rng,
                            &mut touched,
                            &mut report,
                        );
                    }
                }
            }
        }

        let updates = touched
            .into_iter()
            .filter_map(|id| index.get(&id).map(|i| &buildings[*i]))
            .map(|b| FireUpdate {
                building_id: b.id,
                damage_percent: b.damage_percent,
                on_fire: b.on_fire,
                collapsed: b.collapsed,
            })
            .collect();
        let batch = FireBatch {
            updates,
            mark_dirty: dirty.into_iter().collect(),
        };
        (report, batch)
    }

    #[allow(clippy::too_many_arguments)]
    fn try_ignite(
        &self,
        grid: &RegionGrid<'_>,
        pos: TilePos,
        chance: f64,
        index: &HashMap<BuildingId, usize>,
        buildings: &mut [Building],
        rng: &mut dyn RandomSource,
        touched: &mut BTreeSet<BuildingId>,
        report: &mut FireReport,
    ) {
        let Some(target) = grid.building_at(pos).and_then(|id| index.get(&id).copied()) else {
            return;
        };
        if !buildings[target].is_ignitable() {
            return;
        }
        if rng.chance(chance) && buildings[target].ignite() {
            touched.insert(buildings[target].id);
            report.fires_started += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        rng::ScriptedRandom,
        world::{BuildingTypeId, CompanyId, RegionId, SecuritySystem, Terrain, TileId},
    };

    fn tile(id: u64, x: u32, y: u32, terrain: Terrain) -> Tile {
        Tile {
            id: TileId(id),
            region_id: RegionId(1),
            x,
            y,
            terrain,
            owner: None,
        }
    }

    fn building(id: u64, tile: u64, damage: u8, on_fire: bool) -> Building {
        Building {
            id: BuildingId(id),
            region_id: RegionId(1),
            tile_id: TileId(tile),
            owner: CompanyId(1),
            building_type: BuildingTypeId(1),
            damage_percent: damage,
            on_fire,
            collapsed: false,
            for_sale: false,
            calculated_profit: 100,
            calculated_value: 1_000,
            market_value: 1_000,
            needs_recalculation: false,
            security: None,
        }
    }

    fn row(terrains: &[Terrain]) -> Vec<Tile> {
        terrains
            .iter()
            .enumerate()
            .map(|(x, t)| tile(x as u64 + 1, x as u32, 0, *t))
            .collect()
    }

    #[test]
    fn burning_building_ignites_neighbor_but_neighbor_takes_no_damage_yet() {
        let tiles = row(&[Terrain::Land, Terrain::Land]);
        let buildings = vec![building(1, 1, 0, true), building(2, 2, 0, false)];
        let engine = FireSpreadEngine::new(FireConfig::default());
        let mut rng = ScriptedRandom::always(true);

        let (report, batch) = engine.spread(&tiles, buildings, &mut rng);

        assert_eq!(report.fires_started, 1);
        let neighbor = batch
            .updates
            .iter()
            .find(|u| u.building_id == BuildingId(2))
            .unwrap();
        assert!(neighbor.on_fire);
        assert_eq!(neighbor.damage_percent, 0);
    }

    #[test]
    fn fire_jumps_across_trees() {
        let tiles = row(&[Terrain::Land, Terrain::Trees, Terrain::Land]);
        let buildings = vec![building(1, 1, 0, true), building(2, 3, 0, false)];
        let engine = FireSpreadEngine::new(FireConfig::default());
        let mut rng = ScriptedRandom::always(true);

        let (report, _) = engine.spread(&tiles, buildings, &mut rng);

        assert_eq!(report.fires_started, 1);
        assert_eq!(rng.rolls(), &[0.35]);
    }

    #[test]
    fn sprinklered_neighbor_is_never_rolled() {
        let tiles = row(&[Terrain::Land, Terrain::Land]);
        let mut protected = building(2, 2, 0, false);
        protected.security = Some(SecuritySystem {
            sprinklers: true,
            ..SecuritySystem::default()
        });
        let engine = FireSpreadEngine::new(FireConfig::default());
        let mut rng = ScriptedRandom::always(true);

        let (report, _) = engine.spread(&tiles, vec![building(1, 1, 0, true), protected], &mut rng);

        assert_eq!(report.fires_started, 0);
        assert!(rng.rolls().is_empty());
    }

    #[test]
    fn damage_marks_surrounding_buildings_dirty() {
        let tiles = row(&[Terrain::Land, Terrain::Land, Terrain::Land]);
        let buildings = vec![
            building(1, 1, 0, false),
            building(2, 2, 0, true),
            building(3, 3, 0, false),
        ];
        let engine = FireSpreadEngine::new(FireConfig::default());
        let mut rng = ScriptedRandom::always(false);

        let (_, batch) = engine.spread(&tiles, buildings, &mut rng);

        assert_eq!(
            batch.mark_dirty,
            vec![BuildingId(1), BuildingId(2), BuildingId(3)]
        );
    }
}
