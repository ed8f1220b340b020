use serde::{Deserialize, Serialize};

use crate::world::Tier;

fn default_damage_per_tick() -> u8 {
    10
}

fn default_sprinkler_damage_per_tick() -> u8 {
    5
}

fn default_extinguish_chance() -> f64 {
    0.60
}

fn default_spread_chance() -> f64 {
    0.20
}

fn default_jump_chance() -> f64 {
    0.35
}

fn default_inactivity_threshold() -> u32 {
    6
}

fn default_ticks_per_month() -> u32 {
    144
}

fn default_collapsed_maintenance_rate() -> f64 {
    0.05
}

fn default_damage_penalty_factor() -> f64 {
    1.176
}

fn default_forced_exit_ticks() -> u32 {
    6
}

fn default_lease_ttl_secs() -> u64 {
    900
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub fire: FireConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub exit: ExitConfig,
    #[serde(default)]
    pub tiers: TierTable,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireConfig {
    #[serde(default = "default_damage_per_tick")]
    pub damage_per_tick: u8,
    #[serde(default = "default_sprinkler_damage_per_tick")]
    pub sprinkler_damage_per_tick: u8,
    #[serde(default = "default_extinguish_chance")]
    pub extinguish_chance: f64,
    #[serde(default = "default_spread_chance")]
    pub spread_chance: f64,
    #[serde(default = "default_jump_chance")]
    pub jump_chance: f64,
}

impl Default for FireConfig {
    fn default() -> Self {
        Self {
            damage_per_tick: default_damage_per_tick(),
            sprinkler_damage_per_tick: default_sprinkler_damage_per_tick(),
            extinguish_chance: default_extinguish_chance(),
            spread_chance: default_spread_chance(),
            jump_chance: default_jump_chance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Profit is only paid while `ticks_since_action` is below this.
    #[serde(default = "default_inactivity_threshold")]
    pub inactivity_threshold: u32,
    #[serde(default = "default_ticks_per_month")]
    pub ticks_per_month: u32,
    #[serde(default = "default_collapsed_maintenance_rate")]
    pub collapsed_maintenance_rate: f64,
    #[serde(default = "default_damage_penalty_factor")]
    pub damage_penalty_factor: f64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            inactivity_threshold: default_inactivity_threshold(),
            ticks_per_month: default_ticks_per_month(),
            collapsed_maintenance_rate: default_collapsed_maintenance_rate(),
            damage_penalty_factor: default_damage_penalty_factor(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitConfig {
    #[serde(default = "default_forced_exit_ticks")]
    pub default_forced_exit_ticks: u32,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            default_forced_exit_ticks: default_forced_exit_ticks(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_lease_ttl_secs")]
    pub lease_ttl_secs: u64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lease_ttl_secs: default_lease_ttl_secs(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRules {
    pub tax_rate: f64,
    pub land_threshold_percent: f64,
    pub land_streak_ticks: u32,
    pub net_worth_threshold: i64,
    pub cash_threshold: i64,
    #[serde(default)]
    pub unlocks: Option<Tier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    pub town: TierRules,
    pub city: TierRules,
    pub capital: TierRules,
}

impl TierTable {
    pub fn rules(&self, tier: Tier) -> &TierRules {
        match tier {
            Tier::Town => &self.town,
            Tier::City => &self.city,
            Tier::Capital => &self.capital,
        }
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            town: TierRules {
                tax_rate: 0.10,
                land_threshold_percent: 25.0,
                land_streak_ticks: 6,
                net_worth_threshold: 5_000_000,
                cash_threshold: 2_000_000,
                unlocks: Some(Tier::City),
            },
            city: TierRules {
                tax_rate: 0.15,
                land_threshold_percent: 30.0,
                land_streak_ticks: 6,
                net_worth_threshold: 25_000_000,
                cash_threshold: 10_000_000,
                unlocks: Some(Tier::Capital),
            },
            capital: TierRules {
                tax_rate: 0.20,
                land_threshold_percent: 35.0,
                land_streak_ticks: 6,
                net_worth_threshold: 100_000_000,
                cash_threshold: 50_000_000,
                unlocks: None,
            },
        }
    }
}
