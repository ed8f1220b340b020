use std::collections::HashMap;

use crate::{
    spatial::{RegionGrid, TilePos},
    store::{Recalculation, Store},
    systems::RegionError,
    world::{
        AdjacencyKey, Building, BuildingId, BuildingType, BuildingTypeId, Money, Tile, MAX_DAMAGE,
    },
};

/// Combined adjacency effect of a building's surroundings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjacencyMultipliers {
    pub profit: f64,
    pub value: f64,
}

impl AdjacencyMultipliers {
    pub fn from_keys(building_type: &BuildingType, keys: &[AdjacencyKey]) -> Self {
        let mut profit_percent = 0.0;
        let mut value_percent = 0.0;
        for key in keys {
            for rule in building_type.adjacency.iter().filter(|r| r.key == *key) {
                profit_percent += rule.profit_percent;
                value_percent += rule.value_percent;
            }
        }
        Self {
            profit: (1.0 + profit_percent / 100.0).max(0.0),
            value: (1.0 + value_percent / 100.0).max(0.0),
        }
    }
}

/// Refreshes cached profit and valuation for buildings flagged dirty.
pub struct DirtyBuildingRecalculator;

impl DirtyBuildingRecalculator {
    pub fn new() -> Self {
        Self
    }

    /// Recalculates in place and persists the batch. Returns how many buildings changed.
    pub async fn run<S: Store>(
        &self,
        store: &S,
        tiles: &[Tile],
        buildings: &mut [Building],
        types: &HashMap<BuildingTypeId, BuildingType>,
    ) -> Result<u32, RegionError> {
        let batch = self.recalculate(tiles, buildings, types)?;
        let count = batch.len() as u32;
        if !batch.is_empty() {
            store.apply_recalculations(batch).await?;
        }
        Ok(count)
    }

    pub fn recalculate(
        &self,
        tiles: &[Tile],
        buildings: &mut [Building],
        types: &HashMap<BuildingTypeId, BuildingType>,
    ) -> Result<Vec<Recalculation>, RegionError> {
        let grid = RegionGrid::new(tiles, buildings);
        let mut neighbor_keys: HashMap<BuildingId, AdjacencyKey> = HashMap::new();
        for building in buildings.iter() {
            let key = if building.collapsed {
                AdjacencyKey::Collapsed
            } else {
                let building_type = types
                    .get(&building.building_type)
                    .ok_or(RegionError::MissingBuildingType(building.building_type))?;
                building_type.category.adjacency_key()
            };
            neighbor_keys.insert(building.id, key);
        }

        let mut batch = Vec::new();
        for building in buildings.iter_mut().filter(|b| b.needs_recalculation) {
            let building_type = types
                .get(&building.building_type)
                .ok_or(RegionError::MissingBuildingType(building.building_type))?;
            let recalc = if building.collapsed {
                Recalculation {
                    building_id: building.id,
                    calculated_profit: 0,
                    calculated_value: 0,
                    market_value: 0,
                }
            } else {
                let keys = match grid.position_of(building.tile_id) {
                    Some(pos) => surrounding_keys(&grid, pos, &neighbor_keys),
                    None => Vec::new(),
                };
                let multipliers = AdjacencyMultipliers::from_keys(building_type, &keys);
                let calculated_value = scale(building_type.base_value, multipliers.value);
                Recalculation {
                    building_id: building.id,
                    calculated_profit: scale(building_type.base_profit, multipliers.profit),
                    calculated_value,
                    market_value: scale(
                        calculated_value,
                        f64::from(MAX_DAMAGE - building.damage_percent.min(MAX_DAMAGE))
                            / f64::from(MAX_DAMAGE),
                    ),
                }
            };
            building.calculated_profit = recalc.calculated_profit;
            building.calculated_value = recalc.calculated_value;
            building.market_value = recalc.market_value;
            building.needs_recalculation = false;
            batch.push(recalc);
        }
        Ok(batch)
    }
}

impl Default for DirtyBuildingRecalculator {
    fn default() -> Self {
        Self::new()
    }
}

fn surrounding_keys(
    grid: &RegionGrid<'_>,
    pos: TilePos,
    neighbor_keys: &HashMap<BuildingId, AdjacencyKey>,
) -> Vec<AdjacencyKey> {
    let mut keys = Vec::new();
    for around in pos.surrounding() {
        let Some(tile) = grid.tile_at(around) else {
            continue;
        };
        if let Some(key) = tile.terrain.adjacency_key() {
            keys.push(key);
        }
        if let Some(key) = grid
            .building_at(around)
            .and_then(|id| neighbor_keys.get(&id))
        {
            keys.push(*key);
        }
    }
    keys
}

fn scale(amount: Money, factor: f64) -> Money {
    (amount as f64 * factor).round() as Money
}
