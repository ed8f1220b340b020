use std::collections::HashMap;

use chrono::Utc;

use crate::{
    config::EconomyConfig,
    store::{CashCredit, ProfitBatch, Store},
    systems::{DirtyBuildingRecalculator, RegionContext, RegionError},
    world::{
        Building, BuildingType, BuildingTypeId, Company, CompanyId, CompanyStatistics, Money,
        Transaction, TransactionBreakdown, TransactionKind,
    },
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfitReport {
    pub companies_updated: u32,
    /// Companies whose statistics were written for this region.
    pub companies: Vec<CompanyId>,
    pub companies_paid: u32,
    pub buildings_recalculated: u32,
    pub total_gross: Money,
    pub total_tax: Money,
    pub total_net: Money,
}

/// Income figures for one company's holdings in a region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncomeAssessment {
    pub breakdown: TransactionBreakdown,
    pub building_count: u32,
    pub collapsed_count: u32,
    pub burning_count: u32,
    pub average_damage: f64,
    pub total_value: Money,
    pub total_market_value: Money,
}

/// Share of cached profit a building still earns at the given damage.
/// Reaches zero around 85% damage.
pub fn health_factor(damage_percent: u8, penalty_factor: f64) -> f64 {
    ((100.0 - f64::from(damage_percent) * penalty_factor) / 100.0).max(0.0)
}

/// Inactivity counters as they stood when the tick began, for companies the
/// profit step has already advanced. A company with holdings in several
/// regions advances once per tick and is judged on its starting counter.
#[derive(Debug, Default)]
pub struct TickActivity {
    started_at: HashMap<CompanyId, u32>,
}

impl TickActivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter_at_start(&self, company: &Company) -> u32 {
        self.started_at
            .get(&company.id)
            .copied()
            .unwrap_or(company.ticks_since_action)
    }

    pub fn already_advanced(&self, company: CompanyId) -> bool {
        self.started_at.contains_key(&company)
    }

    fn record(&mut self, company: CompanyId, counter: u32) {
        self.started_at.entry(company).or_insert(counter);
    }
}

pub struct ProfitTaxDistributor {
    config: EconomyConfig,
    recalculator: DirtyBuildingRecalculator,
}

impl ProfitTaxDistributor {
    pub fn new(config: EconomyConfig) -> Self {
        Self {
            config,
            recalculator: DirtyBuildingRecalculator::new(),
        }
    }

    pub async fn run<S: Store>(
        &self,
        ctx: &RegionContext<'_>,
        store: &S,
        activity: &mut TickActivity,
    ) -> Result<ProfitReport, RegionError> {
        let region = ctx.region.id;
        let tax_rate = ctx.rules().tax_rate;
        if !(0.0..=1.0).contains(&tax_rate) {
            return Err(RegionError::InvalidRegion {
                region,
                reason: format!("tax rate {tax_rate} is outside 0..=1"),
            });
        }

        let tiles = store.tiles(region).await?;
        let mut buildings = store.buildings(region).await?;
        let types: HashMap<BuildingTypeId, BuildingType> = store
            .building_types()
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        let mut report = ProfitReport {
            buildings_recalculated: self
                .recalculator
                .run(store, &tiles, &mut buildings, &types)
                .await?,
            ..ProfitReport::default()
        };

        let mut holdings: HashMap<CompanyId, Vec<&Building>> = HashMap::new();
        for building in &buildings {
            holdings.entry(building.owner).or_default().push(building);
        }

        let now = Utc::now();
        let mut batch = ProfitBatch::default();
        let mut advanced = Vec::new();
        for company in store.companies_in_region(region).await? {
            let Some(owned) = holdings.get(&company.id) else {
                continue;
            };
            let assessment = self.assess(owned, &types, tax_rate)?;
            let counter = activity.counter_at_start(&company);
            let eligible = counter < self.config.inactivity_threshold;
            let breakdown = assessment.breakdown;

            if !activity.already_advanced(company.id) {
                batch.advance_inactivity.push(company.id);
                advanced.push((company.id, counter));
            }
            batch.statistics.push(CompanyStatistics {
                company_id: company.id,
                region_id: region,
                tick_id: ctx.tick_id,
                building_count: assessment.building_count,
                collapsed_count: assessment.collapsed_count,
                burning_count: assessment.burning_count,
                average_damage: assessment.average_damage,
                total_value: assessment.total_value,
                total_market_value: assessment.total_market_value,
                breakdown,
                eligible,
                updated_at: now,
            });
            report.companies_updated += 1;
            report.companies.push(company.id);

            if !eligible {
                tracing::debug!(
                    target: "tycoon::profit",
                    company = %company.id,
                    ticks_since_action = counter,
                    "profit.company.inactive"
                );
                continue;
            }
            batch.credits.push(CashCredit {
                company_id: company.id,
                amount: breakdown.net,
            });
            batch.transactions.push(Transaction {
                company_id: company.id,
                region_id: region,
                tick_id: Some(ctx.tick_id),
                kind: TransactionKind::TickIncome,
                amount: breakdown.net,
                breakdown: Some(breakdown),
                created_at: now,
            });
            report.companies_paid += 1;
            report.total_gross += breakdown.gross;
            report.total_tax += breakdown.tax;
            report.total_net += breakdown.net;
        }

        store.apply_profit_batch(region, batch).await?;
        for (company, counter) in advanced {
            activity.record(company, counter);
        }
        tracing::debug!(
            target: "tycoon::profit",
            region = %region,
            companies = report.companies_updated,
            paid = report.companies_paid,
            recalculated = report.buildings_recalculated,
            net = report.total_net,
            "profit.region.done"
        );
        Ok(report)
    }

    pub fn assess(
        &self,
        owned: &[&Building],
        types: &HashMap<BuildingTypeId, BuildingType>,
        tax_rate: f64,
    ) -> Result<IncomeAssessment, RegionError> {
        let mut gross = 0.0;
        let mut security_monthly: Money = 0;
        let mut maintenance = 0.0;
        let mut collapsed_count = 0;
        let mut burning_count = 0;
        let mut damage_sum = 0.0;
        let mut total_value: Money = 0;
        let mut total_market_value: Money = 0;

        for building in owned {
            damage_sum += f64::from(building.damage_percent);
            security_monthly += building.security_monthly_cost();
            if building.collapsed {
                let building_type = types
                    .get(&building.building_type)
                    .ok_or(RegionError::MissingBuildingType(building.building_type))?;
                maintenance +=
                    building_type.base_cost as f64 * self.config.collapsed_maintenance_rate;
                collapsed_count += 1;
                continue;
            }
            if building.on_fire {
                burning_count += 1;
            }
            gross += building.calculated_profit as f64
                * health_factor(building.damage_percent, self.config.damage_penalty_factor);
            total_value += building.calculated_value;
            total_market_value += building.market_value;
        }

        let gross = gross.round() as Money;
        let tax = (gross as f64 * tax_rate).round() as Money;
        let security_cost =
            (security_monthly as f64 / f64::from(self.config.ticks_per_month.max(1))).round()
                as Money;
        let collapsed_maintenance = maintenance.round() as Money;
        let building_count = owned.len() as u32;

        Ok(IncomeAssessment {
            breakdown: TransactionBreakdown::new(gross, tax, security_cost, collapsed_maintenance),
            building_count,
            collapsed_count,
            burning_count,
            average_damage: if building_count > 0 {
                damage_sum / f64::from(building_count)
            } else {
                0.0
            },
            total_value,
            total_market_value,
        })
    }
}
