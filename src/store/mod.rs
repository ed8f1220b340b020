//! Persistence contracts consumed by the tick engine.
//!
//! Every write method takes a whole batch and must apply it atomically: a
//! concurrent reader sees either none or all of it.

mod memory;

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::world::{
    Building, BuildingId, BuildingType, Company, CompanyId, CompanyStatistics, Money, Region,
    RegionId, TickHistoryRecord, TickId, Tier, Tile, Transaction,
};

pub use memory::{Fault, InMemoryStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },
    #[error("conflicting write: {0}")]
    Conflict(String),
    #[error("injected fault: {0}")]
    Injected(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// New damage/fire state for one building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireUpdate {
    pub building_id: BuildingId,
    pub damage_percent: u8,
    pub on_fire: bool,
    pub collapsed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FireBatch {
    pub updates: Vec<FireUpdate>,
    /// Buildings whose neighborhood changed.
    pub mark_dirty: Vec<BuildingId>,
}

impl FireBatch {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.mark_dirty.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recalculation {
    pub building_id: BuildingId,
    pub calculated_profit: Money,
    pub calculated_value: Money,
    pub market_value: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CashCredit {
    pub company_id: CompanyId,
    pub amount: Money,
}

#[derive(Debug, Clone, Default)]
pub struct ProfitBatch {
    pub credits: Vec<CashCredit>,
    /// Companies whose inactivity counter advances by one.
    pub advance_inactivity: Vec<CompanyId>,
    pub statistics: Vec<CompanyStatistics>,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandUpdate {
    pub company_id: CompanyId,
    pub land_percentage: f64,
    pub land_streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeroStreakUpdate {
    pub company_id: CompanyId,
    pub hero_streak: u32,
}

/// Moves a company out of its region after liquidating its holdings there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liquidation {
    pub company_id: CompanyId,
    pub region_id: RegionId,
    pub promote_to: Option<Tier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickLease {
    pub tick_id: TickId,
    pub expires_at: DateTime<Utc>,
}

pub trait Store: Send + Sync {
    fn active_regions(&self) -> impl Future<Output = StoreResult<Vec<Region>>> + Send;

    fn tiles(&self, region: RegionId) -> impl Future<Output = StoreResult<Vec<Tile>>> + Send;

    /// All buildings in the region, collapsed ones included, with their security record.
    fn buildings(
        &self,
        region: RegionId,
    ) -> impl Future<Output = StoreResult<Vec<Building>>> + Send;

    fn building_types(&self) -> impl Future<Output = StoreResult<Vec<BuildingType>>> + Send;

    /// Companies whose current region is `region` or that own a building in it.
    fn companies_in_region(
        &self,
        region: RegionId,
    ) -> impl Future<Output = StoreResult<Vec<Company>>> + Send;

    fn companies_without_buildings(
        &self,
    ) -> impl Future<Output = StoreResult<Vec<Company>>> + Send;

    fn apply_fire_batch(
        &self,
        region: RegionId,
        batch: FireBatch,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn apply_recalculations(
        &self,
        batch: Vec<Recalculation>,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn apply_profit_batch(
        &self,
        region: RegionId,
        batch: ProfitBatch,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn apply_land_updates(
        &self,
        batch: Vec<LandUpdate>,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn apply_hero_streaks(
        &self,
        batch: Vec<HeroStreakUpdate>,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn advance_idle_companies(
        &self,
        companies: Vec<CompanyId>,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn liquidate_company(
        &self,
        liquidation: Liquidation,
    ) -> impl Future<Output = StoreResult<Money>> + Send;

    fn insert_tick_history(
        &self,
        record: TickHistoryRecord,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Takes the "tick in progress" lease. Returns false while another live lease is held.
    fn try_acquire_tick_lease(
        &self,
        lease: TickLease,
        now: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    fn release_tick_lease(&self, tick_id: TickId)
        -> impl Future<Output = StoreResult<()>> + Send;
}
