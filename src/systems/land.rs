use std::collections::HashMap;

use crate::{
    store::{LandUpdate, Store},
    systems::{RegionContext, RegionError},
    world::{Company, CompanyId, Tile},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LandReport {
    pub ownable_tiles: u32,
    pub companies_updated: u32,
    pub companies_on_streak: u32,
}

pub struct LandStreakTracker;

impl LandStreakTracker {
    pub fn new() -> Self {
        Self
    }

    pub async fn run<S: Store>(
        &self,
        ctx: &RegionContext<'_>,
        store: &S,
    ) -> Result<LandReport, RegionError> {
        let region = ctx.region.id;
        let tiles = store.tiles(region).await?;
        // Land share and streak belong to the company's home region only.
        let companies: Vec<Company> = store
            .companies_in_region(region)
            .await?
            .into_iter()
            .filter(|c| c.region_id == Some(region))
            .collect();
        let threshold = ctx.rules().land_threshold_percent;

        let (report, updates) = self.track(&tiles, &companies, threshold);
        if report.ownable_tiles == 0 {
            tracing::debug!(
                target: "tycoon::land",
                region = %region,
                "land.region.no_ownable_tiles"
            );
            return Ok(report);
        }
        if !updates.is_empty() {
            store.apply_land_updates(updates).await?;
        }
        Ok(report)
    }

    pub fn track(
        &self,
        tiles: &[Tile],
        companies: &[Company],
        threshold_percent: f64,
    ) -> (LandReport, Vec<LandUpdate>) {
        let mut report = LandReport::default();
        let mut owned: HashMap<CompanyId, u32> = HashMap::new();
        for tile in tiles.iter().filter(|t| t.terrain.is_ownable()) {
            report.ownable_tiles += 1;
            if let Some(owner) = tile.owner {
                *owned.entry(owner).or_default() += 1;
            }
        }
        if report.ownable_tiles == 0 {
            return (report, Vec::new());
        }

        let total = f64::from(report.ownable_tiles);
        let updates: Vec<LandUpdate> = companies
            .iter()
            .map(|company| {
                let count = owned.get(&company.id).copied().unwrap_or(0);
                let land_percentage = f64::from(count) * 100.0 / total;
                let land_streak = if land_percentage >= threshold_percent {
                    company.land_streak.saturating_add(1)
                } else {
                    0
                };
                LandUpdate {
                    company_id: company.id,
                    land_percentage,
                    land_streak,
                }
            })
            .collect();
        report.companies_updated = updates.len() as u32;
        report.companies_on_streak = updates.iter().filter(|u| u.land_streak > 0).count() as u32;
        (report, updates)
    }
}

impl Default for LandStreakTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{RegionId, Terrain, Tier, TileId};

    fn tiles(owned_by_one: usize, total: usize) -> Vec<Tile> {
        (0..total)
            .map(|i| Tile {
                id: TileId(i as u64),
                region_id: RegionId(1),
                x: i as u32,
                y: 0,
                terrain: Terrain::Land,
                owner: (i < owned_by_one).then_some(CompanyId(1)),
            })
            .collect()
    }

    fn company(streak: u32) -> Company {
        Company {
            id: CompanyId(1),
            name: "Acme".into(),
            cash: 0,
            offshore: 0,
            region_id: Some(RegionId(1)),
            tier: Tier::Town,
            ticks_since_action: 0,
            land_percentage: 0.0,
            land_streak: streak,
            hero_streak: 0,
        }
    }

    #[test]
    fn streak_grows_at_threshold() {
        let (report, updates) = LandStreakTracker::new().track(&tiles(1, 4), &[company(3)], 25.0);
        assert_eq!(report.ownable_tiles, 4);
        assert_eq!(updates[0].land_percentage, 25.0);
        assert_eq!(updates[0].land_streak, 4);
    }

    #[test]
    fn streak_resets_to_zero_below_threshold() {
        let (_, updates) = LandStreakTracker::new().track(&tiles(1, 5), &[company(9)], 25.0);
        assert_eq!(updates[0].land_percentage, 20.0);
        assert_eq!(updates[0].land_streak, 0);
    }

    #[test]
    fn roads_and_water_are_not_ownable_land() {
        let mut map = tiles(1, 2);
        map.push(Tile {
            id: TileId(10),
            region_id: RegionId(1),
            x: 5,
            y: 0,
            terrain: Terrain::Water,
            owner: None,
        });
        let (report, updates) = LandStreakTracker::new().track(&map, &[company(0)], 25.0);
        assert_eq!(report.ownable_tiles, 2);
        assert_eq!(updates[0].land_percentage, 50.0);
    }

    #[test]
    fn region_without_land_is_a_noop() {
        let (report, updates) = LandStreakTracker::new().track(&[], &[company(2)], 25.0);
        assert_eq!(report.ownable_tiles, 0);
        assert!(updates.is_empty());
    }
}
