//! Serde data file structs for catalog definitions.
//!
//! These structs define the on-disk format for resources, buildings and
//! theurgies. They are deserialized from RON, JSON, or TOML data files and
//! then resolved into a core [`Catalog`](hearth_core::catalog::Catalog) by the
//! loader. Resources are referenced by name; amounts accept numbers or
//! decimal strings.

use hearth_core::building::ResourceEffects;
use hearth_core::decimal::Amount;
use serde::Deserialize;
use std::collections::BTreeMap;

/// A whole catalog file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub resources: Vec<ResourceData>,
    #[serde(default)]
    pub buildings: Vec<BuildingData>,
    #[serde(default)]
    pub theurgies: Vec<TheurgyData>,
    #[serde(default)]
    pub roles: RolesData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceData {
    pub name: String,
    #[serde(default)]
    pub initial: Amount,
    #[serde(default)]
    pub cap: Option<Amount>,
    #[serde(default)]
    pub discovered: bool,
}

/// A building definition. Every map is keyed by resource name.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildingData {
    pub name: String,
    #[serde(default)]
    pub workers_per_building: u64,
    #[serde(default)]
    pub effects: BTreeMap<String, ResourceEffects>,
    #[serde(default)]
    pub build_cost: BTreeMap<String, Amount>,
    #[serde(default)]
    pub sell_reward: BTreeMap<String, Amount>,
    #[serde(default)]
    pub cap_increase: BTreeMap<String, Amount>,
    #[serde(default)]
    pub unlocked: bool,
}

/// A manual action: signed deltas keyed by resource name.
#[derive(Debug, Clone, Deserialize)]
pub struct TheurgyData {
    pub name: String,
    pub changes: BTreeMap<String, Amount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RolesData {
    #[serde(default)]
    pub food: Option<String>,
    #[serde(default)]
    pub workers: Option<String>,
}
