//! Read-only views for UI consumers.
//!
//! Every type here is an owned copy; nothing borrows into the industry.

use crate::config::Increment;
use crate::decimal::Amount;
use crate::effect::EffectTag;
use crate::id::{BuildingTypeId, ResourceId};
use crate::scaler::Bottleneck;
use std::fmt;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceView {
    pub id: ResourceId,
    pub name: String,
    pub value: Amount,
    /// Effective cap, including building bonuses.
    pub cap: Option<Amount>,
    /// Net per-second rate after throttling.
    pub rate: Amount,
    pub is_discovered: bool,
    pub expanded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingView {
    pub id: BuildingTypeId,
    pub name: String,
    pub count: u64,
    pub workers: u64,
    pub worker_capacity: u64,
    pub unlocked: bool,
    pub dropped: bool,
}

/// The renderable snapshot handed to broadcast listeners.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndustryData {
    pub resources: Vec<ResourceView>,
    pub buildings: Vec<BuildingView>,
    pub workers_on_strike: bool,
    pub unassigned_workers: u64,
    pub increment: Increment,
    pub bottlenecks: Vec<Bottleneck>,
}

impl IndustryData {
    pub fn resource(&self, name: &str) -> Option<&ResourceView> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn building(&self, name: &str) -> Option<&BuildingView> {
        self.buildings.iter().find(|b| b.name == name)
    }
}

// ---------------------------------------------------------------------------
// Effect summaries
// ---------------------------------------------------------------------------

/// A signed change to one resource: a theurgy result or an action preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceChange {
    pub resource: ResourceId,
    pub delta: Amount,
}

/// Per-second total of every rate effect sharing a resource and tag.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateEffect {
    pub resource: ResourceId,
    pub tag: EffectTag,
    /// Signed: gains positive, drains negative.
    pub total: Amount,
}

// ---------------------------------------------------------------------------
// Disabled reasons
// ---------------------------------------------------------------------------

/// Why an action cannot currently be taken.
#[derive(Debug, Clone, PartialEq)]
pub enum DisabledReason {
    UnknownBuilding,
    Locked,
    InsufficientResources {
        resource: String,
        needed: Amount,
        available: Amount,
    },
    NoBuildings,
    NoWorkerSlots,
    NoUnassignedWorkers,
    NoWorkers,
}

impl fmt::Display for DisabledReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisabledReason::UnknownBuilding => f.write_str("Unknown building"),
            DisabledReason::Locked => f.write_str("Not yet unlocked"),
            DisabledReason::InsufficientResources {
                resource,
                needed,
                available,
            } => write!(
                f,
                "Not enough {resource} ({} / {})",
                available.normalize(),
                needed.normalize()
            ),
            DisabledReason::NoBuildings => f.write_str("None built"),
            DisabledReason::NoWorkerSlots => f.write_str("No free worker slots"),
            DisabledReason::NoUnassignedWorkers => f.write_str("No unassigned workers"),
            DisabledReason::NoWorkers => f.write_str("No workers assigned"),
        }
    }
}
