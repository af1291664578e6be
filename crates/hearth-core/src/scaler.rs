//! Worker scarcity: how much worker-driven consumption can actually be met.
//!
//! Only resources that workers drain and whose stock has run dry constrain
//! the scale. For each such resource the achievable fraction is its
//! non-worker net production divided by the worker demand; the global factor
//! is the smallest fraction, clamped to `[0, 1]`.

use crate::decimal::Amount;
use crate::id::ResourceId;
use crate::rates::ResourceFlow;
use std::collections::BTreeMap;

/// A resource currently limiting worker output.
#[derive(Debug, Clone, PartialEq)]
pub struct Bottleneck {
    pub resource: ResourceId,
    /// Achievable fraction of worker demand for this resource.
    pub scale: Amount,
    /// Per-second worker demand.
    pub demand: Amount,
    /// Per-second non-worker net production.
    pub production: Amount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerScale {
    pub factor: Amount,
    pub bottlenecks: Vec<Bottleneck>,
}

impl Default for WorkerScale {
    fn default() -> Self {
        Self {
            factor: Amount::ONE,
            bottlenecks: Vec::new(),
        }
    }
}

/// Compute the global worker scale from per-resource flows and current stock.
pub fn worker_scale(
    flows: &BTreeMap<ResourceId, ResourceFlow>,
    stock: impl Fn(ResourceId) -> Amount,
) -> WorkerScale {
    let mut scale = WorkerScale::default();

    for (&resource, flow) in flows {
        let demand = flow.worker_drain;
        if demand <= Amount::ZERO {
            continue;
        }
        if stock(resource) > Amount::ZERO {
            continue;
        }
        let production = flow.base_net().max(Amount::ZERO);
        let achievable = production
            .checked_div(demand)
            .unwrap_or(Amount::ZERO)
            .clamp(Amount::ZERO, Amount::ONE);
        if achievable < Amount::ONE {
            scale.bottlenecks.push(Bottleneck {
                resource,
                scale: achievable,
                demand,
                production,
            });
        }
        scale.factor = scale.factor.min(achievable);
    }

    scale
}
