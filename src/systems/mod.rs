mod exit;
mod fire;
mod idle;
mod land;
mod profit;
mod recalc;

use thiserror::Error;

pub use exit::{
    qualifying_path, ExitError, ExitExecutor, ExitFailure, ExitPath, ExitReport, ExitRequest,
    ForcedExitEvaluator, LiquidatingExit,
};
pub use fire::{FireReport, FireSpreadEngine};
pub use idle::IdleEntityUpdater;
pub use land::{LandReport, LandStreakTracker};
pub use profit::{
    health_factor, IncomeAssessment, ProfitReport, ProfitTaxDistributor, TickActivity,
};
pub use recalc::{AdjacencyMultipliers, DirtyBuildingRecalculator};

use crate::{
    config::{SimulationConfig, TierRules},
    store::StoreError,
    world::{BuildingTypeId, Region, RegionId, TickId},
};

/// What every per-region step gets to see about the region being advanced.
pub struct RegionContext<'a> {
    pub tick_id: TickId,
    pub region: &'a Region,
    pub config: &'a SimulationConfig,
}

impl RegionContext<'_> {
    pub fn rules(&self) -> &TierRules {
        self.config.tiers.rules(self.region.tier)
    }
}

#[derive(Debug, Error)]
pub enum RegionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("building type {0} is not in the catalog")]
    MissingBuildingType(BuildingTypeId),
    #[error("region {region} is misconfigured: {reason}")]
    InvalidRegion { region: RegionId, reason: String },
}
