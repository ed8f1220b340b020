use std::{collections::BTreeSet, time::Instant};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::{
    config::SimulationConfig,
    rng::{RandomSource, SeededRandom},
    store::{Store, StoreError, TickLease},
    systems::{
        ExitExecutor, ExitFailure, ExitRequest, FireReport, FireSpreadEngine, ForcedExitEvaluator,
        IdleEntityUpdater, LandReport, LandStreakTracker, ProfitReport, ProfitTaxDistributor,
        RegionContext, RegionError, TickActivity,
    },
    world::{
        CompanyId, ErrorPayload, Money, Region, RegionId, TickHistoryRecord, TickId, TickStatus,
    },
};

/// A failure that stops the whole tick. Per-region failures never surface here.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("another tick holds the lease")]
    AlreadyRunning,
    #[error("failed to acquire tick lease: {0}")]
    Lease(#[source] StoreError),
    #[error("failed to list active regions: {0}")]
    Regions(#[source] StoreError),
    #[error("failed to advance idle companies: {0}")]
    Idle(#[source] StoreError),
    #[error("failed to write tick history: {0}")]
    History(#[source] StoreError),
}

impl TickError {
    fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            message: self.to_string(),
            detail: format!("{self:?}"),
        }
    }
}

/// Everything one region contributed to a tick.
#[derive(Debug, Clone)]
pub struct RegionReport {
    pub region_id: RegionId,
    pub fire: FireReport,
    pub profit: ProfitReport,
    pub land: LandReport,
    pub forced_exits: Vec<ExitRequest>,
    pub exit_failures: Vec<ExitFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFailure {
    pub region_id: RegionId,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct TickSummary {
    pub tick_id: TickId,
    pub sequence: u64,
    pub status: TickStatus,
    pub started_at: DateTime<Utc>,
    pub duration_ms: f64,
    pub regions_processed: u32,
    pub region_failures: Vec<RegionFailure>,
    pub companies_updated: u32,
    pub buildings_recalculated: u32,
    pub total_gross: Money,
    pub total_tax: Money,
    pub total_net: Money,
    pub fires_started: u32,
    pub fires_extinguished: u32,
    pub buildings_damaged: u32,
    pub buildings_collapsed: u32,
    pub forced_exits: Vec<ExitRequest>,
    pub exit_failures: Vec<ExitFailure>,
    pub idle_companies: u32,
    updated_companies: BTreeSet<CompanyId>,
}

impl TickSummary {
    fn new(tick_id: TickId, sequence: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            tick_id,
            sequence,
            status: TickStatus::Completed,
            started_at,
            duration_ms: 0.0,
            regions_processed: 0,
            region_failures: Vec::new(),
            companies_updated: 0,
            buildings_recalculated: 0,
            total_gross: 0,
            total_tax: 0,
            total_net: 0,
            fires_started: 0,
            fires_extinguished: 0,
            buildings_damaged: 0,
            buildings_collapsed: 0,
            forced_exits: Vec::new(),
            exit_failures: Vec::new(),
            idle_companies: 0,
            updated_companies: BTreeSet::new(),
        }
    }

    fn absorb(&mut self, report: RegionReport) {
        self.regions_processed += 1;
        // A company with holdings in several regions counts once.
        self.updated_companies.extend(report.profit.companies);
        self.companies_updated = self.updated_companies.len() as u32;
        self.buildings_recalculated += report.profit.buildings_recalculated;
        self.total_gross += report.profit.total_gross;
        self.total_tax += report.profit.total_tax;
        self.total_net += report.profit.total_net;
        self.fires_started += report.fire.fires_started;
        self.fires_extinguished += report.fire.fires_extinguished;
        self.buildings_damaged += report.fire.buildings_damaged;
        self.buildings_collapsed += report.fire.buildings_collapsed;
        self.forced_exits.extend(report.forced_exits);
        self.exit_failures.extend(report.exit_failures);
    }

    pub fn history_record(&self, error: Option<ErrorPayload>) -> TickHistoryRecord {
        TickHistoryRecord {
            tick_id: self.tick_id,
            status: self.status,
            started_at: self.started_at,
            duration_ms: self.duration_ms,
            regions_processed: self.regions_processed,
            regions_failed: self.region_failures.len() as u32,
            companies_updated: self.companies_updated,
            buildings_recalculated: self.buildings_recalculated,
            total_gross: self.total_gross,
            total_tax: self.total_tax,
            total_net: self.total_net,
            fires_started: self.fires_started,
            fires_extinguished: self.fires_extinguished,
            buildings_damaged: self.buildings_damaged,
            buildings_collapsed: self.buildings_collapsed,
            forced_exits: self.forced_exits.len() as u32,
            idle_companies: self.idle_companies,
            error,
        }
    }
}

pub struct TickSchedulerBuilder {
    config: SimulationConfig,
    random: Option<Box<dyn RandomSource>>,
}

impl TickSchedulerBuilder {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            random: None,
        }
    }

    pub fn with_random(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Some(Box::new(random));
        self
    }

    pub fn build<S: Store, E: ExitExecutor>(self, store: S, exits: E) -> TickScheduler<S, E> {
        let random: Box<dyn RandomSource> = match self.random {
            Some(random) => random,
            None => Box::new(match self.config.scheduler.seed {
                Some(seed) => SeededRandom::new(seed),
                None => SeededRandom::from_entropy(),
            }),
        };
        TickScheduler {
            fire: FireSpreadEngine::new(self.config.fire.clone()),
            profit: ProfitTaxDistributor::new(self.config.economy.clone()),
            exit: ForcedExitEvaluator::new(self.config.exit.clone()),
            land: LandStreakTracker::new(),
            idle: IdleEntityUpdater::new(),
            config: self.config,
            random,
            store,
            exits,
            sequence: 0,
        }
    }
}

/// Advances every active region by one step per call to [`TickScheduler::run_tick`].
pub struct TickScheduler<S, E> {
    config: SimulationConfig,
    store: S,
    exits: E,
    random: Box<dyn RandomSource>,
    fire: FireSpreadEngine,
    profit: ProfitTaxDistributor,
    exit: ForcedExitEvaluator,
    land: LandStreakTracker,
    idle: IdleEntityUpdater,
    sequence: u64,
}

impl<S: Store, E: ExitExecutor> TickScheduler<S, E> {
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn ticks_run(&self) -> u64 {
        self.sequence
    }

    pub async fn run_tick(&mut self) -> Result<TickSummary, TickError> {
        self.sequence += 1;
        let tick_id = TickId::generate();
        let started_at = Utc::now();
        let timer = Instant::now();
        let mut summary = TickSummary::new(tick_id, self.sequence, started_at);

        let ttl = self.config.scheduler.lease_ttl_secs.min(u64::from(u32::MAX));
        let lease = TickLease {
            tick_id,
            expires_at: started_at + Duration::seconds(ttl as i64),
        };
        match self.store.try_acquire_tick_lease(lease, started_at).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(target: "tycoon::tick", tick = %tick_id, "tick.skipped.overlap");
                summary.status = TickStatus::Skipped;
                let err = TickError::AlreadyRunning;
                self.record(&summary, Some(err.payload())).await;
                return Err(err);
            }
            Err(source) => {
                return Err(self.fail(summary, timer, TickError::Lease(source)).await);
            }
        }

        let outcome = self.advance(&mut summary).await;
        if let Err(err) = self.store.release_tick_lease(tick_id).await {
            tracing::warn!(target: "tycoon::tick", tick = %tick_id, error = %err, "tick.lease.release_failed");
        }
        if let Err(err) = outcome {
            return Err(self.fail(summary, timer, err).await);
        }

        summary.duration_ms = timer.elapsed().as_secs_f64() * 1_000.0;
        summary.status = if summary.region_failures.is_empty() {
            TickStatus::Completed
        } else {
            TickStatus::CompletedWithPartialErrors
        };
        if let Err(source) = self
            .store
            .insert_tick_history(summary.history_record(None))
            .await
        {
            let err = TickError::History(source);
            tracing::error!(target: "tycoon::tick", tick = %tick_id, error = %err, "tick.failed");
            return Err(err);
        }

        tracing::info!(
            target: "tycoon::tick",
            tick = %tick_id,
            sequence = summary.sequence,
            regions = summary.regions_processed,
            regions_failed = summary.region_failures.len(),
            companies = summary.companies_updated,
            net = summary.total_net,
            fires_started = summary.fires_started,
            collapsed = summary.buildings_collapsed,
            forced_exits = summary.forced_exits.len(),
            duration_ms = summary.duration_ms,
            "tick.completed"
        );
        Ok(summary)
    }

    async fn advance(&mut self, summary: &mut TickSummary) -> Result<(), TickError> {
        let regions = self.store.active_regions().await.map_err(TickError::Regions)?;
        if regions.is_empty() {
            tracing::info!(target: "tycoon::tick", tick = %summary.tick_id, "tick.no_active_regions");
            return Ok(());
        }

        let mut activity = TickActivity::new();
        for region in &regions {
            match self
                .process_region(summary.tick_id, region, &mut activity)
                .await
            {
                Ok(report) => summary.absorb(report),
                Err(err) => {
                    tracing::warn!(
                        target: "tycoon::tick",
                        tick = %summary.tick_id,
                        region = %region.id,
                        error = %err,
                        "tick.region.failed"
                    );
                    summary.region_failures.push(RegionFailure {
                        region_id: region.id,
                        error: err.to_string(),
                    });
                }
            }
        }

        summary.idle_companies = self.idle.run(&self.store).await.map_err(TickError::Idle)?;
        Ok(())
    }

    /// Fire, then profit, then forced exits, then land streaks. Forced exits read
    /// the land streak persisted on the previous tick.
    pub async fn process_region(
        &mut self,
        tick_id: TickId,
        region: &Region,
        activity: &mut TickActivity,
    ) -> Result<RegionReport, RegionError> {
        let ctx = RegionContext {
            tick_id,
            region,
            config: &self.config,
        };
        let fire = self.fire.run(&ctx, &self.store, self.random.as_mut()).await?;
        let profit = self.profit.run(&ctx, &self.store, activity).await?;
        let exits = self.exit.run(&ctx, &self.store, &self.exits).await?;
        let land = self.land.run(&ctx, &self.store).await?;
        Ok(RegionReport {
            region_id: region.id,
            fire,
            profit,
            land,
            forced_exits: exits.forced,
            exit_failures: exits.failures,
        })
    }

    async fn fail(&self, mut summary: TickSummary, timer: Instant, err: TickError) -> TickError {
        summary.duration_ms = timer.elapsed().as_secs_f64() * 1_000.0;
        summary.status = TickStatus::Failed;
        tracing::error!(target: "tycoon::tick", tick = %summary.tick_id, error = %err, "tick.failed");
        self.record(&summary, Some(err.payload())).await;
        err
    }

    async fn record(&self, summary: &TickSummary, error: Option<ErrorPayload>) {
        if let Err(err) = self
            .store
            .insert_tick_history(summary.history_record(error))
            .await
        {
            tracing::error!(
                target: "tycoon::tick",
                tick = %summary.tick_id,
                error = %err,
                "tick.history.write_failed"
            );
        }
    }
}
