use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::{ExitConfig, TierRules},
    store::{HeroStreakUpdate, Liquidation, Store, StoreError},
    systems::{RegionContext, RegionError},
    world::{Company, CompanyId, Money, RegionId, Tier},
};

/// Which victory condition put a company over the line, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitPath {
    NetWorth,
    Cash,
    Land,
}

impl ExitPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitPath::NetWorth => "net_worth",
            ExitPath::Cash => "cash",
            ExitPath::Land => "land",
        }
    }
}

/// First satisfied path for a company, net worth before cash before land.
pub fn qualifying_path(company: &Company, building_value: Money, rules: &TierRules) -> Option<ExitPath> {
    if company.cash + building_value >= rules.net_worth_threshold {
        return Some(ExitPath::NetWorth);
    }
    if company.cash >= rules.cash_threshold {
        return Some(ExitPath::Cash);
    }
    if company.land_percentage >= rules.land_threshold_percent
        && company.land_streak >= rules.land_streak_ticks
    {
        return Some(ExitPath::Land);
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitRequest {
    pub company_id: CompanyId,
    pub region_id: RegionId,
    pub path: ExitPath,
    pub tier: Tier,
    /// Tier the company gains access to by leaving, if any.
    pub unlocks: Option<Tier>,
    pub hero_streak: u32,
}

#[derive(Debug, Error)]
pub enum ExitError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("exit rejected: {0}")]
    Rejected(String),
}

/// Carries out a forced exit decided by the evaluator.
pub trait ExitExecutor: Send + Sync {
    fn execute_exit(
        &self,
        request: ExitRequest,
    ) -> impl Future<Output = Result<(), ExitError>> + Send;
}

/// Sells the company's holdings at calculated value and moves it out of the region.
pub struct LiquidatingExit<S> {
    store: S,
}

impl<S: Store> LiquidatingExit<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: Store> ExitExecutor for LiquidatingExit<S> {
    async fn execute_exit(&self, request: ExitRequest) -> Result<(), ExitError> {
        let proceeds = self
            .store
            .liquidate_company(Liquidation {
                company_id: request.company_id,
                region_id: request.region_id,
                promote_to: request.unlocks,
            })
            .await?;
        tracing::info!(
            target: "tycoon::exit",
            company = %request.company_id,
            region = %request.region_id,
            path = request.path.as_str(),
            proceeds,
            "exit.liquidated"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitFailure {
    pub company_id: CompanyId,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitReport {
    pub companies_evaluated: u32,
    pub companies_eligible: u32,
    pub forced: Vec<ExitRequest>,
    pub failures: Vec<ExitFailure>,
}

pub struct ForcedExitEvaluator {
    config: ExitConfig,
}

impl ForcedExitEvaluator {
    pub fn new(config: ExitConfig) -> Self {
        Self { config }
    }

    pub async fn run<S: Store, E: ExitExecutor>(
        &self,
        ctx: &RegionContext<'_>,
        store: &S,
        executor: &E,
    ) -> Result<ExitReport, RegionError> {
        let region = ctx.region;
        let rules = ctx.rules();
        let threshold = region
            .forced_exit_ticks
            .unwrap_or(self.config.default_forced_exit_ticks);

        let mut building_value: HashMap<CompanyId, Money> = HashMap::new();
        for building in store.buildings(region.id).await? {
            if !building.collapsed {
                *building_value.entry(building.owner).or_default() += building.calculated_value;
            }
        }

        let mut report = ExitReport::default();
        let mut updates = Vec::new();
        let mut pending = Vec::new();
        for company in store
            .companies_in_region(region.id)
            .await?
            .into_iter()
            .filter(|c| c.region_id == Some(region.id))
        {
            report.companies_evaluated += 1;
            let value = building_value.get(&company.id).copied().unwrap_or(0);
            let path = qualifying_path(&company, value, rules);
            let hero_streak = match path {
                Some(_) => company.hero_streak.saturating_add(1),
                None => 0,
            };
            updates.push(HeroStreakUpdate {
                company_id: company.id,
                hero_streak,
            });
            let Some(path) = path else {
                continue;
            };
            report.companies_eligible += 1;
            if hero_streak > threshold {
                pending.push(ExitRequest {
                    company_id: company.id,
                    region_id: region.id,
                    path,
                    tier: region.tier,
                    unlocks: rules.unlocks,
                    hero_streak,
                });
            }
        }

        if !updates.is_empty() {
            store.apply_hero_streaks(updates).await?;
        }

        for request in pending {
            match executor.execute_exit(request).await {
                Ok(()) => {
                    tracing::info!(
                        target: "tycoon::exit",
                        tick = %ctx.tick_id,
                        company = %request.company_id,
                        region = %request.region_id,
                        path = request.path.as_str(),
                        streak = request.hero_streak,
                        "exit.forced"
                    );
                    report.forced.push(request);
                }
                Err(err) => {
                    tracing::warn!(
                        target: "tycoon::exit",
                        tick = %ctx.tick_id,
                        company = %request.company_id,
                        region = %request.region_id,
                        error = %err,
                        "exit.failed"
                    );
                    report.failures.push(ExitFailure {
                        company_id: request.company_id,
                        error: err.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }
}
