use crate::decimal::Amount;
use crate::effect::Direction;
use crate::id::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Effect tables
// ---------------------------------------------------------------------------

/// Base magnitudes for one resource in one effect table. Both are
/// non-negative; the direction comes from which field is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectLine {
    #[serde(default)]
    pub gain: Option<Amount>,
    #[serde(default)]
    pub drain: Option<Amount>,
}

impl EffectLine {
    /// Non-zero entries as (direction, magnitude), gain first.
    pub fn entries(&self) -> impl Iterator<Item = (Direction, Amount)> {
        [
            self.gain.map(|v| (Direction::Gain, v)),
            self.drain.map(|v| (Direction::Drain, v)),
        ]
        .into_iter()
        .flatten()
        .filter(|(_, v)| *v > Amount::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }
}

/// Effects of a building type on a single resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceEffects {
    /// Applies once per building built.
    #[serde(default)]
    pub base: EffectLine,
    /// Applies once per assigned worker.
    #[serde(default)]
    pub worker: EffectLine,
}

// ---------------------------------------------------------------------------
// Building type (static definition)
// ---------------------------------------------------------------------------

/// A building template. Immutable once the catalog is frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingType {
    pub name: String,
    pub workers_per_building: u64,
    pub effects: BTreeMap<ResourceId, ResourceEffects>,
    /// Cost of one building, per resource.
    pub build_cost: BTreeMap<ResourceId, Amount>,
    /// Refund for selling one building, per resource.
    pub sell_reward: BTreeMap<ResourceId, Amount>,
    /// Cap increase per building, per resource.
    pub cap_increase: BTreeMap<ResourceId, Amount>,
    /// Whether a fresh industry starts with this type unlocked.
    pub unlocked: bool,
}

impl BuildingType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workers_per_building: 0,
            effects: BTreeMap::new(),
            build_cost: BTreeMap::new(),
            sell_reward: BTreeMap::new(),
            cap_increase: BTreeMap::new(),
            unlocked: false,
        }
    }

    pub fn workers(mut self, per_building: u64) -> Self {
        self.workers_per_building = per_building;
        self
    }

    pub fn base_gain(mut self, resource: ResourceId, v: Amount) -> Self {
        self.effects.entry(resource).or_default().base.gain = Some(v);
        self
    }

    pub fn base_drain(mut self, resource: ResourceId, v: Amount) -> Self {
        self.effects.entry(resource).or_default().base.drain = Some(v);
        self
    }

    pub fn worker_gain(mut self, resource: ResourceId, v: Amount) -> Self {
        self.effects.entry(resource).or_default().worker.gain = Some(v);
        self
    }

    pub fn worker_drain(mut self, resource: ResourceId, v: Amount) -> Self {
        self.effects.entry(resource).or_default().worker.drain = Some(v);
        self
    }

    pub fn cost(mut self, resource: ResourceId, v: Amount) -> Self {
        self.build_cost.insert(resource, v);
        self
    }

    pub fn reward(mut self, resource: ResourceId, v: Amount) -> Self {
        self.sell_reward.insert(resource, v);
        self
    }

    pub fn cap_increase(mut self, resource: ResourceId, v: Amount) -> Self {
        self.cap_increase.insert(resource, v);
        self
    }

    pub fn unlocked(mut self) -> Self {
        self.unlocked = true;
        self
    }

    /// Every resource this definition references.
    pub fn referenced_resources(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.effects
            .keys()
            .chain(self.build_cost.keys())
            .chain(self.sell_reward.keys())
            .chain(self.cap_increase.keys())
            .copied()
    }

    /// Whether any worker effect drains `resource`.
    pub fn worker_drains(&self, resource: ResourceId) -> bool {
        self.effects
            .get(&resource)
            .and_then(|e| e.worker.drain)
            .is_some_and(|v| v > Amount::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Building state (per type, mutable)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingState {
    pub count: u64,
    pub workers: u64,
    pub unlocked: bool,
    /// The building card has been revealed to the player.
    pub dropped: bool,
}

impl BuildingState {
    pub fn for_type(def: &BuildingType) -> Self {
        Self {
            unlocked: def.unlocked,
            ..Self::default()
        }
    }

    pub fn worker_capacity(&self, def: &BuildingType) -> u64 {
        self.count.saturating_mul(def.workers_per_building)
    }

    pub fn free_slots(&self, def: &BuildingType) -> u64 {
        self.worker_capacity(def).saturating_sub(self.workers)
    }

    /// Drop workers down to the current capacity. Returns how many were let go.
    pub fn clamp_workers(&mut self, def: &BuildingType) -> u64 {
        let capacity = self.worker_capacity(def);
        if self.workers <= capacity {
            return 0;
        }
        let removed = self.workers - capacity;
        self.workers = capacity;
        removed
    }
}
