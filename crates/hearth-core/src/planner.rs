//! Action planning: how many units of build, sell, hire or furlough are
//! feasible right now, and how the player's selected increment resolves
//! against that limit.

use crate::building::BuildingState;
use crate::catalog::Catalog;
use crate::config::Increment;
use crate::decimal::{floor_count, whole_units, Amount};
use crate::effect::{compute_effect, Effect, EffectContext};
use crate::id::{BuildingTypeId, ResourceId};
use crate::resource::Resource;
use crate::upgrade::UpgradeRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Build,
    Sell,
    Hire,
    Furlough,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Build => "build",
            Action::Sell => "sell",
            Action::Hire => "hire",
            Action::Furlough => "furlough",
        };
        f.write_str(name)
    }
}

/// Upper bound on units for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Nothing constrains the action (a building with no cost).
    Unbounded,
    Units(u64),
}

impl Limit {
    pub fn min(self, units: u64) -> u64 {
        match self {
            Limit::Unbounded => units,
            Limit::Units(n) => n.min(units),
        }
    }

    pub fn units(self) -> Option<u64> {
        match self {
            Limit::Unbounded => None,
            Limit::Units(n) => Some(n),
        }
    }

    pub fn is_zero(self) -> bool {
        self == Limit::Units(0)
    }
}

/// A resolved action request, for execution and for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionPlan {
    pub selected: Increment,
    /// What the player asked for: the limit under `Max`, else the fixed
    /// increment (at least 1).
    pub target: Limit,
    /// What would actually happen.
    pub actual: u64,
    pub limit: Limit,
}

impl ActionPlan {
    pub fn resolve(selected: Increment, limit: Limit) -> Self {
        let (target, actual) = match selected {
            Increment::Fixed(n) => {
                let n = n.max(1);
                (Limit::Units(n), limit.min(n))
            }
            // An unbounded max still acts one unit at a time.
            Increment::Max => (limit, limit.units().unwrap_or(1)),
        };
        Self {
            selected,
            target,
            actual,
            limit,
        }
    }
}

/// Read-only view of industry state used to plan actions.
#[derive(Debug, Clone, Copy)]
pub struct ActionPlanner<'a> {
    pub catalog: &'a Catalog,
    pub resources: &'a [Resource],
    pub buildings: &'a [BuildingState],
    pub upgrades: &'a UpgradeRegistry,
}

impl<'a> ActionPlanner<'a> {
    pub fn stock(&self, resource: ResourceId) -> Amount {
        self.resources
            .get(resource.index())
            .map(Resource::value)
            .unwrap_or(Amount::ZERO)
    }

    fn state(&self, id: BuildingTypeId) -> Option<&'a BuildingState> {
        self.buildings.get(id.index())
    }

    /// Resolved build costs for `units` buildings of type `id`.
    pub fn costs(&self, id: BuildingTypeId, units: u64) -> Vec<Effect> {
        let (Some(def), Some(state)) = (self.catalog.building(id), self.state(id)) else {
            return Vec::new();
        };
        def.build_cost
            .iter()
            .map(|(&resource, &base)| {
                compute_effect(
                    self.upgrades,
                    EffectContext::cost(id, resource, base, units, state.count),
                )
            })
            .collect()
    }

    /// Resolved sell refunds for `units` buildings of type `id`.
    pub fn rewards(&self, id: BuildingTypeId, units: u64) -> Vec<Effect> {
        let (Some(def), Some(state)) = (self.catalog.building(id), self.state(id)) else {
            return Vec::new();
        };
        def.sell_reward
            .iter()
            .map(|(&resource, &base)| {
                compute_effect(
                    self.upgrades,
                    EffectContext::reward(id, resource, base, units, state.count),
                )
            })
            .collect()
    }

    /// Whether every cost of `units` buildings is covered by current stock.
    pub fn can_afford(&self, id: BuildingTypeId, units: u64) -> bool {
        self.costs(id, units)
            .iter()
            .all(|cost| self.stock(cost.resource()) >= cost.value)
    }

    /// Worker pool stock minus every assigned worker.
    pub fn unassigned_workers(&self) -> u64 {
        let Some(pool) = self.catalog.roles().workers else {
            return 0;
        };
        let assigned = self
            .buildings
            .iter()
            .fold(0u64, |acc, b| acc.saturating_add(b.workers));
        floor_count(self.stock(pool)).saturating_sub(assigned)
    }

    pub fn limit(&self, action: Action, id: BuildingTypeId) -> Limit {
        let (Some(def), Some(state)) = (self.catalog.building(id), self.state(id)) else {
            return Limit::Units(0);
        };
        match action {
            Action::Build => {
                if !state.unlocked {
                    return Limit::Units(0);
                }
                self.costs(id, 1)
                    .iter()
                    .filter(|cost| cost.value > Amount::ZERO)
                    .map(|cost| whole_units(self.stock(cost.resource()), cost.value))
                    .min()
                    .map_or(Limit::Unbounded, Limit::Units)
            }
            Action::Sell => Limit::Units(state.count),
            Action::Hire => {
                if !state.unlocked {
                    return Limit::Units(0);
                }
                Limit::Units(self.unassigned_workers().min(state.free_slots(def)))
            }
            Action::Furlough => Limit::Units(state.workers),
        }
    }

    pub fn plan(&self, action: Action, id: BuildingTypeId, selected: Increment) -> ActionPlan {
        ActionPlan::resolve(selected, self.limit(action, id))
    }
}
