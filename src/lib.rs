pub mod config;
pub mod engine;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod spatial;
pub mod store;
pub mod systems;
pub mod world;

pub use config::SimulationConfig;
pub use engine::{TickError, TickScheduler, TickSchedulerBuilder, TickSummary};
pub use scenario::{Scenario, ScenarioLoader};
pub use store::{InMemoryStore, Store};
