use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::{
    engine::TickSummary,
    store::InMemoryStore,
    world::{Building, Company, Region, TickId, TickStatus},
};

#[derive(Clone, Debug)]
pub struct SnapshotConfig {
    pub interval: u64,
    pub output_dir: PathBuf,
}

impl SnapshotConfig {
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            interval: 6,
            output_dir: PathBuf::from("snapshots"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Snapshot<'a> {
    sequence: u64,
    tick_id: TickId,
    status: TickStatus,
    started_at: DateTime<Utc>,
    regions: &'a [Region],
    companies: &'a [Company],
    buildings: &'a [Building],
}

/// Writes the store contents to `<dir>/<scenario>/tick_NNNNNN.json` every `interval` ticks.
pub struct SnapshotManager {
    config: SnapshotConfig,
}

impl SnapshotManager {
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    pub fn maybe_snapshot(
        &self,
        scenario_name: &str,
        summary: &TickSummary,
        store: &InMemoryStore,
    ) -> Result<Option<PathBuf>, SnapshotError> {
        if self.config.interval == 0 || summary.sequence % self.config.interval != 0 {
            return Ok(None);
        }

        let dir = Path::new(&self.config.output_dir).join(scenario_name);
        fs::create_dir_all(&dir)?;
        let file_path = dir.join(format!("tick_{:06}.json", summary.sequence));
        let regions = store.regions();
        let companies = store.companies();
        let buildings = store.all_buildings();
        let snapshot = Snapshot {
            sequence: summary.sequence,
            tick_id: summary.tick_id,
            status: summary.status,
            started_at: summary.started_at,
            regions: &regions,
            companies: &companies,
            buildings: &buildings,
        };
        fs::write(&file_path, serde_json::to_string_pretty(&snapshot)?)?;
        tracing::debug!(target: "tycoon::snapshot", path = %file_path.display(), "snapshot.written");
        Ok(Some(file_path))
    }
}
