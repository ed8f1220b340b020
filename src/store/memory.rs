use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::{
    FireBatch, HeroStreakUpdate, LandUpdate, Liquidation, ProfitBatch, Recalculation, Store,
    StoreError, StoreResult, TickLease,
};
use crate::world::{
    Building, BuildingId, BuildingType, BuildingTypeId, Company, CompanyId, CompanyStatistics,
    Money, Region, RegionId, TickHistoryRecord, TickId, Tile, TileId, Transaction,
    TransactionKind, MAX_DAMAGE,
};

/// Failure points that can be switched on to exercise error isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    ActiveRegions,
    RegionReads(RegionId),
    Liquidation(CompanyId),
    IdleUpdate,
    HistoryWrite,
}

#[derive(Default)]
struct State {
    regions: BTreeMap<RegionId, Region>,
    tiles: BTreeMap<TileId, Tile>,
    building_types: BTreeMap<BuildingTypeId, BuildingType>,
    buildings: BTreeMap<BuildingId, Building>,
    companies: BTreeMap<CompanyId, Company>,
    statistics: HashMap<(CompanyId, RegionId), CompanyStatistics>,
    transactions: Vec<Transaction>,
    history: Vec<TickHistoryRecord>,
    lease: Option<TickLease>,
    faults: HashSet<Fault>,
}

impl State {
    fn check(&self, fault: Fault) -> StoreResult<()> {
        if self.faults.contains(&fault) {
            return Err(StoreError::Injected(format!("{fault:?}")));
        }
        Ok(())
    }

    fn company_mut(&mut self, id: CompanyId) -> StoreResult<&mut Company> {
        self.companies.get_mut(&id).ok_or(StoreError::NotFound {
            kind: "company",
            id: id.raw(),
        })
    }

    fn building_mut(&mut self, id: BuildingId) -> StoreResult<&mut Building> {
        self.buildings.get_mut(&id).ok_or(StoreError::NotFound {
            kind: "building",
            id: id.raw(),
        })
    }
}

/// Process-local store. Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_region(&self, region: Region) {
        self.write().regions.insert(region.id, region);
    }

    pub fn insert_tile(&self, tile: Tile) {
        self.write().tiles.insert(tile.id, tile);
    }

    pub fn insert_building_type(&self, building_type: BuildingType) {
        self.write()
            .building_types
            .insert(building_type.id, building_type);
    }

    pub fn insert_building(&self, building: Building) {
        self.write().buildings.insert(building.id, building);
    }

    pub fn insert_company(&self, company: Company) {
        self.write().companies.insert(company.id, company);
    }

    pub fn set_region_active(&self, region: RegionId, active: bool) {
        if let Some(r) = self.write().regions.get_mut(&region) {
            r.active = active;
        }
    }

    pub fn fail_on(&self, fault: Fault) {
        self.write().faults.insert(fault);
    }

    pub fn region(&self, id: RegionId) -> Option<Region> {
        self.read().regions.get(&id).cloned()
    }

    pub fn regions(&self) -> Vec<Region> {
        self.read().regions.values().cloned().collect()
    }

    pub fn tile(&self, id: TileId) -> Option<Tile> {
        self.read().tiles.get(&id).cloned()
    }

    pub fn building(&self, id: BuildingId) -> Option<Building> {
        self.read().buildings.get(&id).cloned()
    }

    pub fn all_buildings(&self) -> Vec<Building> {
        self.read().buildings.values().cloned().collect()
    }

    pub fn company(&self, id: CompanyId) -> Option<Company> {
        self.read().companies.get(&id).cloned()
    }

    pub fn companies(&self) -> Vec<Company> {
        self.read().companies.values().cloned().collect()
    }

    pub fn statistics(&self, company: CompanyId, region: RegionId) -> Option<CompanyStatistics> {
        self.read().statistics.get(&(company, region)).cloned()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.read().transactions.clone()
    }

    pub fn transactions_for(&self, company: CompanyId) -> Vec<Transaction> {
        self.read()
            .transactions
            .iter()
            .filter(|t| t.company_id == company)
            .cloned()
            .collect()
    }

    pub fn history(&self) -> Vec<TickHistoryRecord> {
        self.read().history.clone()
    }

    pub fn current_lease(&self) -> Option<TickLease> {
        self.read().lease
    }

    pub fn set_lease(&self, lease: Option<TickLease>) {
        self.write().lease = lease;
    }
}

impl Store for InMemoryStore {
    async fn active_regions(&self) -> StoreResult<Vec<Region>> {
        let state = self.read();
        state.check(Fault::ActiveRegions)?;
        Ok(state.regions.values().filter(|r| r.active).cloned().collect())
    }

    async fn tiles(&self, region: RegionId) -> StoreResult<Vec<Tile>> {
        let state = self.read();
        state.check(Fault::RegionReads(region))?;
        Ok(state
            .tiles
            .values()
            .filter(|t| t.region_id == region)
            .cloned()
            .collect())
    }

    async fn buildings(&self, region: RegionId) -> StoreResult<Vec<Building>> {
        let state = self.read();
        state.check(Fault::RegionReads(region))?;
        Ok(state
            .buildings
            .values()
            .filter(|b| b.region_id == region)
            .cloned()
            .collect())
    }

    async fn building_types(&self) -> StoreResult<Vec<BuildingType>> {
        Ok(self.read().building_types.values().cloned().collect())
    }

    async fn companies_in_region(&self, region: RegionId) -> StoreResult<Vec<Company>> {
        let state = self.read();
        state.check(Fault::RegionReads(region))?;
        let owners: HashSet<CompanyId> = state
            .buildings
            .values()
            .filter(|b| b.region_id == region)
            .map(|b| b.owner)
            .collect();
        Ok(state
            .companies
            .values()
            .filter(|c| c.region_id == Some(region) || owners.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn companies_without_buildings(&self) -> StoreResult<Vec<Company>> {
        let state = self.read();
        let owners: HashSet<CompanyId> = state.buildings.values().map(|b| b.owner).collect();
        Ok(state
            .companies
            .values()
            .filter(|c| !owners.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn apply_fire_batch(&self, region: RegionId, batch: FireBatch) -> StoreResult<()> {
        let mut state = self.write();
        for update in &batch.updates {
            let building = state.building_mut(update.building_id)?;
            if building.region_id != region {
                return Err(StoreError::Conflict(format!(
                    "building {} is not in region {region}",
                    update.building_id
                )));
            }
        }
        for update in batch.updates {
            let building = state.building_mut(update.building_id)?;
            if building.collapsed {
                continue;
            }
            building.damage_percent = update.damage_percent.min(MAX_DAMAGE);
            building.on_fire = update.on_fire;
            if update.collapsed || building.damage_percent >= MAX_DAMAGE {
                building.collapse();
            }
        }
        for id in batch.mark_dirty {
            if let Some(building) = state.buildings.get_mut(&id) {
                building.needs_recalculation = true;
            }
        }
        Ok(())
    }

    async fn apply_recalculations(&self, batch: Vec<Recalculation>) -> StoreResult<()> {
        let mut state = self.write();
        for recalc in &batch {
            state.building_mut(recalc.building_id)?;
        }
        for recalc in batch {
            let building = state.building_mut(recalc.building_id)?;
            building.calculated_profit = recalc.calculated_profit;
            building.calculated_value = recalc.calculated_value;
            building.market_value = recalc.market_value;
            building.needs_recalculation = false;
        }
        Ok(())
    }

    async fn apply_profit_batch(&self, region: RegionId, batch: ProfitBatch) -> StoreResult<()> {
        let mut state = self.write();
        for id in batch
            .credits
            .iter()
            .map(|c| c.company_id)
            .chain(batch.advance_inactivity.iter().copied())
        {
            state.company_mut(id)?;
        }
        for credit in batch.credits {
            state.company_mut(credit.company_id)?.cash += credit.amount;
        }
        for id in batch.advance_inactivity {
            let company = state.company_mut(id)?;
            company.ticks_since_action = company.ticks_since_action.saturating_add(1);
        }
        for stats in batch.statistics {
            state.statistics.insert((stats.company_id, region), stats);
        }
        state.transactions.extend(batch.transactions);
        Ok(())
    }

    async fn apply_land_updates(&self, batch: Vec<LandUpdate>) -> StoreResult<()> {
        let mut state = self.write();
        for update in &batch {
            state.company_mut(update.company_id)?;
        }
        for update in batch {
            let company = state.company_mut(update.company_id)?;
            company.land_percentage = update.land_percentage;
            company.land_streak = update.land_streak;
        }
        Ok(())
    }

    async fn apply_hero_streaks(&self, batch: Vec<HeroStreakUpdate>) -> StoreResult<()> {
        let mut state = self.write();
        for update in &batch {
            state.company_mut(update.company_id)?;
        }
        for update in batch {
            state.company_mut(update.company_id)?.hero_streak = update.hero_streak;
        }
        Ok(())
    }

    async fn advance_idle_companies(&self, companies: Vec<CompanyId>) -> StoreResult<()> {
        let mut state = self.write();
        state.check(Fault::IdleUpdate)?;
        for id in &companies {
            state.company_mut(*id)?;
        }
        for id in companies {
            let company = state.company_mut(id)?;
            company.ticks_since_action = company.ticks_since_action.saturating_add(1);
        }
        Ok(())
    }

    async fn liquidate_company(&self, liquidation: Liquidation) -> StoreResult<Money> {
        let mut state = self.write();
        state.check(Fault::Liquidation(liquidation.company_id))?;
        state.company_mut(liquidation.company_id)?;

        let owned: Vec<BuildingId> = state
            .buildings
            .values()
            .filter(|b| b.owner == liquidation.company_id && b.region_id == liquidation.region_id)
            .map(|b| b.id)
            .collect();
        let mut proceeds: Money = 0;
        for id in owned {
            if let Some(building) = state.buildings.remove(&id) {
                if !building.collapsed {
                    proceeds += building.calculated_value;
                }
            }
        }
        for tile in state.tiles.values_mut() {
            if tile.region_id == liquidation.region_id
                && tile.owner == Some(liquidation.company_id)
            {
                tile.owner = None;
            }
        }

        let company = state.company_mut(liquidation.company_id)?;
        company.cash += proceeds;
        company.region_id = None;
        company.hero_streak = 0;
        company.land_streak = 0;
        company.land_percentage = 0.0;
        if let Some(tier) = liquidation.promote_to {
            company.tier = tier;
        }
        state.transactions.push(Transaction {
            company_id: liquidation.company_id,
            region_id: liquidation.region_id,
            tick_id: None,
            kind: TransactionKind::Liquidation,
            amount: proceeds,
            breakdown: None,
            created_at: Utc::now(),
        });
        Ok(proceeds)
    }

    async fn insert_tick_history(&self, record: TickHistoryRecord) -> StoreResult<()> {
        let mut state = self.write();
        state.check(Fault::HistoryWrite)?;
        state.history.push(record);
        Ok(())
    }

    async fn try_acquire_tick_lease(
        &self,
        lease: TickLease,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.write();
        if let Some(current) = state.lease {
            if current.expires_at > now && current.tick_id != lease.tick_id {
                return Ok(false);
            }
        }
        state.lease = Some(lease);
        Ok(true)
    }

    async fn release_tick_lease(&self, tick_id: TickId) -> StoreResult<()> {
        let mut state = self.write();
        if state.lease.map(|l| l.tick_id) == Some(tick_id) {
            state.lease = None;
        }
        Ok(())
    }
}
