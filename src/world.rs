use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whole currency units.
pub type Money = i64;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(RegionId);
id_type!(TileId);
id_type!(BuildingId);
id_type!(BuildingTypeId);
id_type!(CompanyId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickId(pub Uuid);

impl TickId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Town,
    City,
    Capital,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Town => "town",
            Tier::City => "city",
            Tier::Capital => "capital",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Land,
    Trees,
    Road,
    Water,
    Mountain,
}

impl Terrain {
    /// Counts towards a region's ownable land.
    pub fn is_ownable(self) -> bool {
        matches!(self, Terrain::Land | Terrain::Trees)
    }

    /// Fire can jump across this terrain to the tile beyond it.
    pub fn is_flammable(self) -> bool {
        matches!(self, Terrain::Trees)
    }

    pub fn adjacency_key(self) -> Option<AdjacencyKey> {
        match self {
            Terrain::Trees => Some(AdjacencyKey::Trees),
            Terrain::Road => Some(AdjacencyKey::Road),
            Terrain::Water => Some(AdjacencyKey::Water),
            Terrain::Land | Terrain::Mountain => None,
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(Terrain::Land),
            'T' => Some(Terrain::Trees),
            '=' => Some(Terrain::Road),
            '~' => Some(Terrain::Water),
            '^' => Some(Terrain::Mountain),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingCategory {
    Residential,
    Commercial,
    Industrial,
    Leisure,
    Civic,
}

impl BuildingCategory {
    pub fn adjacency_key(self) -> AdjacencyKey {
        match self {
            BuildingCategory::Residential => AdjacencyKey::Residential,
            BuildingCategory::Commercial => AdjacencyKey::Commercial,
            BuildingCategory::Industrial => AdjacencyKey::Industrial,
            BuildingCategory::Leisure => AdjacencyKey::Leisure,
            BuildingCategory::Civic => AdjacencyKey::Civic,
        }
    }
}

/// What a neighboring tile can contribute to a building's adjacency modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjacencyKey {
    Residential,
    Commercial,
    Industrial,
    Leisure,
    Civic,
    Water,
    Trees,
    Road,
    Collapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyRule {
    pub key: AdjacencyKey,
    #[serde(default)]
    pub profit_percent: f64,
    #[serde(default)]
    pub value_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingType {
    pub id: BuildingTypeId,
    pub name: String,
    pub category: BuildingCategory,
    pub base_profit: Money,
    pub base_value: Money,
    pub base_cost: Money,
    #[serde(default)]
    pub adjacency: Vec<AdjacencyRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub tier: Tier,
    pub active: bool,
    pub total_land_tiles: u32,
    /// Overrides the configured default when set.
    pub forced_exit_ticks: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub region_id: RegionId,
    pub x: u32,
    pub y: u32,
    pub terrain: Terrain,
    pub owner: Option<CompanyId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SecuritySystem {
    #[serde(default)]
    pub cameras: bool,
    #[serde(default)]
    pub dogs: bool,
    #[serde(default)]
    pub guards: bool,
    #[serde(default)]
    pub sprinklers: bool,
    #[serde(default)]
    pub monthly_cost: Money,
}

pub const MAX_DAMAGE: u8 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub region_id: RegionId,
    pub tile_id: TileId,
    pub owner: CompanyId,
    pub building_type: BuildingTypeId,
    pub damage_percent: u8,
    pub on_fire: bool,
    pub collapsed: bool,
    pub for_sale: bool,
    pub calculated_profit: Money,
    pub calculated_value: Money,
    pub market_value: Money,
    pub needs_recalculation: bool,
    pub security: Option<SecuritySystem>,
}

impl Building {
    pub fn has_sprinklers(&self) -> bool {
        self.security.map(|s| s.sprinklers).unwrap_or(false)
    }

    pub fn security_monthly_cost(&self) -> Money {
        self.security.map(|s| s.monthly_cost).unwrap_or(0)
    }

    /// Can catch fire from a neighbor this tick.
    pub fn is_ignitable(&self) -> bool {
        !self.collapsed && !self.on_fire && !self.has_sprinklers()
    }

    /// Adds damage, clamping at `MAX_DAMAGE`. Reaching full damage collapses
    /// the building and puts the fire out. Returns whether damage increased.
    pub fn apply_damage(&mut self, amount: u8) -> bool {
        if self.collapsed {
            return false;
        }
        let before = self.damage_percent;
        self.damage_percent = self.damage_percent.saturating_add(amount).min(MAX_DAMAGE);
        if self.damage_percent >= MAX_DAMAGE {
            self.collapse();
        }
        self.damage_percent > before
    }

    pub fn collapse(&mut self) {
        self.damage_percent = MAX_DAMAGE;
        self.collapsed = true;
        self.on_fire = false;
    }

    pub fn ignite(&mut self) -> bool {
        if self.collapsed || self.on_fire {
            return false;
        }
        self.on_fire = true;
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub cash: Money,
    pub offshore: Money,
    pub region_id: Option<RegionId>,
    pub tier: Tier,
    pub ticks_since_action: u32,
    pub land_percentage: f64,
    pub land_streak: u32,
    pub hero_streak: u32,
}

/// Per-tick figures for a company in one region, kept whether or not it was paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyStatistics {
    pub company_id: CompanyId,
    pub region_id: RegionId,
    pub tick_id: TickId,
    pub building_count: u32,
    pub collapsed_count: u32,
    pub burning_count: u32,
    pub average_damage: f64,
    pub total_value: Money,
    pub total_market_value: Money,
    pub breakdown: TransactionBreakdown,
    pub eligible: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBreakdown {
    pub gross: Money,
    pub tax: Money,
    pub security_cost: Money,
    pub collapsed_maintenance: Money,
    pub net: Money,
}

impl TransactionBreakdown {
    pub fn new(gross: Money, tax: Money, security_cost: Money, collapsed_maintenance: Money) -> Self {
        Self {
            gross,
            tax,
            security_cost,
            collapsed_maintenance,
            net: gross - tax - security_cost - collapsed_maintenance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    TickIncome,
    Liquidation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub company_id: CompanyId,
    pub region_id: RegionId,
    pub tick_id: Option<TickId>,
    pub kind: TransactionKind,
    pub amount: Money,
    pub breakdown: Option<TransactionBreakdown>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickStatus {
    Completed,
    CompletedWithPartialErrors,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickHistoryRecord {
    pub tick_id: TickId,
    pub status: TickStatus,
    pub started_at: DateTime<Utc>,
    pub duration_ms: f64,
    pub regions_processed: u32,
    pub regions_failed: u32,
    pub companies_updated: u32,
    pub buildings_recalculated: u32,
    pub total_gross: Money,
    pub total_tax: Money,
    pub total_net: Money,
    pub fires_started: u32,
    pub fires_extinguished: u32,
    pub buildings_damaged: u32,
    pub buildings_collapsed: u32,
    pub forced_exits: u32,
    pub idle_companies: u32,
    pub error: Option<ErrorPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn building(damage: u8) -> Building {
        Building {
            id: BuildingId(1),
            region_id: RegionId(1),
            tile_id: TileId(1),
            owner: CompanyId(1),
            building_type: BuildingTypeId(1),
            damage_percent: damage,
            on_fire: true,
            collapsed: false,
            for_sale: false,
            calculated_profit: 0,
            calculated_value: 0,
            market_value: 0,
            needs_recalculation: false,
            security: None,
        }
    }

    #[test]
    fn damage_clamps_and_collapses() {
        let mut b = building(95);
        assert!(b.apply_damage(10));
        assert_eq!(b.damage_percent, MAX_DAMAGE);
        assert!(b.collapsed);
        assert!(!b.on_fire);
    }

    #[test]
    fn collapsed_building_stays_collapsed() {
        let mut b = building(100);
        b.collapse();
        assert!(!b.apply_damage(10));
        assert!(!b.ignite());
        assert!(b.collapsed);
        assert!(!b.on_fire);
    }

    #[test]
    fn breakdown_net_is_conserved() {
        let breakdown = TransactionBreakdown::new(1_000, 100, 25, 40);
        assert_eq!(breakdown.net, 835);
    }

    #[test]
    fn trees_are_ownable_and_flammable() {
        assert!(Terrain::Trees.is_ownable());
        assert!(Terrain::Trees.is_flammable());
        assert!(!Terrain::Road.is_ownable());
        assert!(!Terrain::Land.is_flammable());
    }
}
