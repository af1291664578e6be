//! Rate aggregation: turns building counts and worker assignments into
//! per-resource net rates.
//!
//! The expensive part, resolving every effect line through the upgrade
//! registry, is cached per building type and only redone for the types the
//! [`DirtyTracker`] marks; the per-resource [`ResourceFlow`] totals are then
//! summed from those contributions. The cheap part, folding worker
//! scarcity and the strike state into final net rates, runs on every tick
//! because it depends on current stock.

use crate::building::{BuildingState, BuildingType};
use crate::catalog::Catalog;
use crate::decimal::Amount;
use crate::dirty::DirtyTracker;
use crate::effect::{compute_effect, Direction, Effect, EffectContext, EffectSource};
use crate::id::{BuildingTypeId, ResourceId};
use crate::scaler::{worker_scale, WorkerScale};
use crate::upgrade::UpgradeRegistry;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Per-resource flow
// ---------------------------------------------------------------------------

/// Resolved per-second magnitudes for one resource, split by source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceFlow {
    pub base_gain: Amount,
    pub base_drain: Amount,
    pub worker_gain: Amount,
    pub worker_drain: Amount,
}

impl ResourceFlow {
    /// Net rate from building base effects alone.
    pub fn base_net(&self) -> Amount {
        self.base_gain.saturating_sub(self.base_drain)
    }

    /// Net rate before any throttling.
    pub fn raw_net(&self) -> Amount {
        self.base_net()
            .saturating_add(self.worker_gain)
            .saturating_sub(self.worker_drain)
    }

    fn record(&mut self, effect: &Effect) {
        let slot = match (effect.context.source, effect.context.direction) {
            (EffectSource::Base, Direction::Gain) => &mut self.base_gain,
            (EffectSource::Base, Direction::Drain) => &mut self.base_drain,
            (EffectSource::Worker, Direction::Gain) => &mut self.worker_gain,
            (EffectSource::Worker, Direction::Drain) => &mut self.worker_drain,
        };
        *slot = slot.saturating_add(effect.value);
    }

    fn absorb(&mut self, other: &ResourceFlow) {
        self.base_gain = self.base_gain.saturating_add(other.base_gain);
        self.base_drain = self.base_drain.saturating_add(other.base_drain);
        self.worker_gain = self.worker_gain.saturating_add(other.worker_gain);
        self.worker_drain = self.worker_drain.saturating_add(other.worker_drain);
    }
}

// ---------------------------------------------------------------------------
// Effect enumeration
// ---------------------------------------------------------------------------

/// Every rate effect a building type currently contributes: base lines
/// scaled by building count, worker lines scaled by assigned workers.
pub fn building_rate_effects(
    upgrades: &UpgradeRegistry,
    id: BuildingTypeId,
    def: &BuildingType,
    state: &BuildingState,
) -> Vec<Effect> {
    let mut effects = Vec::new();
    for (&resource, lines) in &def.effects {
        if state.count > 0 {
            for (direction, base) in lines.base.entries() {
                let ctx = EffectContext::rate(
                    id,
                    resource,
                    direction,
                    EffectSource::Base,
                    base,
                    state.count,
                    state.count,
                );
                effects.push(compute_effect(upgrades, ctx));
            }
        }
        if state.workers > 0 {
            for (direction, base) in lines.worker.entries() {
                let ctx = EffectContext::rate(
                    id,
                    resource,
                    direction,
                    EffectSource::Worker,
                    base,
                    state.workers,
                    state.count,
                );
                effects.push(compute_effect(upgrades, ctx));
            }
        }
    }
    effects
}

/// Cap increases a building type currently provides.
pub fn building_cap_effects(
    upgrades: &UpgradeRegistry,
    id: BuildingTypeId,
    def: &BuildingType,
    state: &BuildingState,
) -> Vec<Effect> {
    if state.count == 0 {
        return Vec::new();
    }
    def.cap_increase
        .iter()
        .filter(|(_, v)| **v > Amount::ZERO)
        .map(|(&resource, &v)| {
            compute_effect(
                upgrades,
                EffectContext::cap(id, resource, v, state.count, state.count),
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// One building type's resolved rate and cap lines.
#[derive(Debug, Clone, Default)]
struct Contribution {
    flows: BTreeMap<ResourceId, ResourceFlow>,
    caps: BTreeMap<ResourceId, Amount>,
}

impl Contribution {
    fn sweep(
        upgrades: &UpgradeRegistry,
        id: BuildingTypeId,
        def: &BuildingType,
        state: &BuildingState,
    ) -> Self {
        let mut contribution = Self::default();
        for effect in building_rate_effects(upgrades, id, def, state) {
            contribution
                .flows
                .entry(effect.resource())
                .or_default()
                .record(&effect);
        }
        for effect in building_cap_effects(upgrades, id, def, state) {
            let total = contribution
                .caps
                .entry(effect.resource())
                .or_insert(Amount::ZERO);
            *total = total.saturating_add(effect.value);
        }
        contribution
    }
}

#[derive(Debug, Default)]
pub struct RateAggregator {
    dirty: DirtyTracker,
    contributions: BTreeMap<BuildingTypeId, Contribution>,
    flows: BTreeMap<ResourceId, ResourceFlow>,
    cap_bonus: BTreeMap<ResourceId, Amount>,
    net: BTreeMap<ResourceId, Amount>,
    scale: WorkerScale,
}

impl RateAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_building(&mut self, id: BuildingTypeId) {
        self.dirty.mark_building(id);
    }

    pub fn mark_upgrades(&mut self) {
        self.dirty.mark_upgrades();
    }

    pub fn mark_all(&mut self) {
        self.dirty.mark_all();
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    /// Re-resolve effect lines if the cache is dirty. Only marked building
    /// types are re-swept unless upgrades changed or a full refresh was
    /// requested. Returns whether a sweep actually ran.
    pub fn recalculate(
        &mut self,
        catalog: &Catalog,
        buildings: &[BuildingState],
        upgrades: &UpgradeRegistry,
    ) -> bool {
        if !self.dirty.begin_recalculation() {
            return false;
        }

        let full = self.dirty.needs_full_sweep();
        if full {
            self.contributions.clear();
        }
        let mut swept = 0usize;
        for (id, def) in catalog.buildings() {
            if !full && !self.dirty.is_building_dirty(id) {
                continue;
            }
            swept += 1;
            match buildings.get(id.index()) {
                Some(state) => {
                    let contribution = Contribution::sweep(upgrades, id, def, state);
                    self.contributions.insert(id, contribution);
                }
                None => {
                    self.contributions.remove(&id);
                }
            }
        }

        let mut flows: BTreeMap<ResourceId, ResourceFlow> = BTreeMap::new();
        let mut caps: BTreeMap<ResourceId, Amount> = BTreeMap::new();
        for contribution in self.contributions.values() {
            for (&resource, flow) in &contribution.flows {
                flows.entry(resource).or_default().absorb(flow);
            }
            for (&resource, &bonus) in &contribution.caps {
                let total = caps.entry(resource).or_insert(Amount::ZERO);
                *total = total.saturating_add(bonus);
            }
        }

        log::trace!(
            "recalculated rates: swept {swept} building types ({}), {} flows, {} cap bonuses",
            if full { "full" } else { "partial" },
            flows.len(),
            caps.len()
        );

        self.flows = flows;
        self.cap_bonus = caps;
        self.dirty.finish_recalculation();
        true
    }

    /// Fold worker scarcity and the strike state into final net rates.
    ///
    /// On strike every worker drain is dropped and any remaining negative
    /// net rate is zeroed. Otherwise every negative net rate, whatever its
    /// source, is multiplied by the worker scale. Positive rates are never
    /// throttled directly.
    pub fn apply_throttle(&mut self, stock: impl Fn(ResourceId) -> Amount, on_strike: bool) {
        self.scale = worker_scale(&self.flows, stock);
        self.net.clear();
        for (&resource, flow) in &self.flows {
            let mut net = if on_strike {
                flow.base_net().saturating_add(flow.worker_gain)
            } else {
                flow.raw_net()
            };
            if net < Amount::ZERO {
                net = if on_strike {
                    Amount::ZERO
                } else {
                    net.saturating_mul(self.scale.factor)
                };
            }
            self.net.insert(resource, net);
        }
    }

    pub fn flow(&self, resource: ResourceId) -> ResourceFlow {
        self.flows.get(&resource).copied().unwrap_or_default()
    }

    pub fn flows(&self) -> &BTreeMap<ResourceId, ResourceFlow> {
        &self.flows
    }

    /// Final net rate after throttling. Zero for untouched resources.
    pub fn net_rate(&self, resource: ResourceId) -> Amount {
        self.net.get(&resource).copied().unwrap_or(Amount::ZERO)
    }

    /// Total cap increase from buildings, if any building contributes.
    pub fn cap_bonus(&self, resource: ResourceId) -> Option<Amount> {
        self.cap_bonus.get(&resource).copied()
    }

    pub fn scale(&self) -> &WorkerScale {
        &self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::resource::ResourceOptions;
    use crate::upgrade::{FnModifier, Modification};
    use rust_decimal_macros::dec;

    struct Fixture {
        catalog: Catalog,
        food: ResourceId,
        crops: ResourceId,
        farm: BuildingTypeId,
        silo: BuildingTypeId,
    }

    fn fixture() -> Fixture {
        let mut b = CatalogBuilder::new();
        let crops = b.register_resource("crops", dec!(0), ResourceOptions::default());
        let food = b.register_resource("food", dec!(0), ResourceOptions::default());
        let farm = b.register_building(
            BuildingType::new("farm")
                .workers(2)
                .base_gain(crops, dec!(0.5))
                .worker_gain(crops, dec!(1))
                .worker_drain(food, dec!(1)),
        );
        let silo = b.register_building(
            BuildingType::new("silo")
                .base_drain(food, dec!(0.25))
                .cap_increase(food, dec!(50)),
        );
        Fixture {
            catalog: b.build().unwrap(),
            food,
            crops,
            farm,
            silo,
        }
    }

    fn states(farm: (u64, u64), silo: u64) -> Vec<BuildingState> {
        vec![
            BuildingState {
                count: farm.0,
                workers: farm.1,
                unlocked: true,
                dropped: false,
            },
            BuildingState {
                count: silo,
                workers: 0,
                unlocked: true,
                dropped: false,
            },
        ]
    }

    #[test]
    fn flows_split_by_source() {
        let f = fixture();
        let mut agg = RateAggregator::new();
        assert!(agg.recalculate(&f.catalog, &states((2, 3), 1), &UpgradeRegistry::new()));

        let crops = agg.flow(f.crops);
        assert_eq!(crops.base_gain, dec!(1.0));
        assert_eq!(crops.worker_gain, dec!(3));
        let food = agg.flow(f.food);
        assert_eq!(food.worker_drain, dec!(3));
        assert_eq!(food.base_drain, dec!(0.25));
        assert_eq!(food.raw_net(), dec!(-3.25));
        assert_eq!(agg.cap_bonus(f.food), Some(dec!(50)));
    }

    #[test]
    fn recalculate_is_cached_until_marked() {
        let f = fixture();
        let upgrades = UpgradeRegistry::new();
        let mut agg = RateAggregator::new();
        assert!(agg.recalculate(&f.catalog, &states((1, 0), 0), &upgrades));
        assert!(!agg.recalculate(&f.catalog, &states((5, 0), 0), &upgrades));
        assert_eq!(agg.flow(f.crops).base_gain, dec!(0.5));

        agg.mark_building(f.farm);
        assert!(agg.recalculate(&f.catalog, &states((5, 0), 0), &upgrades));
        assert_eq!(agg.flow(f.crops).base_gain, dec!(2.5));
    }

    #[test]
    fn partial_sweep_only_touches_marked_types() {
        let f = fixture();
        let upgrades = UpgradeRegistry::new();
        let mut agg = RateAggregator::new();
        agg.recalculate(&f.catalog, &states((1, 0), 1), &upgrades);
        assert_eq!(agg.flow(f.food).base_drain, dec!(0.25));

        // Silo count moved without a mark, so its cached lines stay.
        agg.mark_building(f.farm);
        assert!(agg.recalculate(&f.catalog, &states((2, 0), 3), &upgrades));
        assert_eq!(agg.flow(f.crops).base_gain, dec!(1.0));
        assert_eq!(agg.flow(f.food).base_drain, dec!(0.25));
        assert_eq!(agg.cap_bonus(f.food), Some(dec!(50)));

        agg.mark_building(f.silo);
        agg.recalculate(&f.catalog, &states((2, 0), 3), &upgrades);
        assert_eq!(agg.flow(f.food).base_drain, dec!(0.75));
        assert_eq!(agg.cap_bonus(f.food), Some(dec!(150)));
        assert_eq!(agg.flow(f.crops).base_gain, dec!(1.0));
    }

    #[test]
    fn upgrade_change_resweeps_everything() {
        let f = fixture();
        let mut upgrades = UpgradeRegistry::new();
        let mut agg = RateAggregator::new();
        agg.recalculate(&f.catalog, &states((1, 0), 1), &upgrades);

        upgrades.register(
            Box::new(FnModifier::new("double", |_| Some(Modification::mult(dec!(2))))),
            0,
        );
        agg.mark_upgrades();
        agg.recalculate(&f.catalog, &states((1, 0), 1), &upgrades);
        assert_eq!(agg.flow(f.crops).base_gain, dec!(1.0));
        assert_eq!(agg.flow(f.food).base_drain, dec!(0.50));
    }

    #[test]
    fn upgrades_flow_into_rates() {
        let f = fixture();
        let mut upgrades = UpgradeRegistry::new();
        upgrades.register(
            Box::new(FnModifier::new("double", |_| Some(Modification::mult(dec!(2))))),
            0,
        );
        let mut agg = RateAggregator::new();
        agg.recalculate(&f.catalog, &states((1, 0), 1), &upgrades);
        assert_eq!(agg.flow(f.crops).base_gain, dec!(1.0));
        assert_eq!(agg.cap_bonus(f.food), Some(dec!(100)));
        assert_eq!(agg.flow(f.food).base_drain, dec!(0.50));
    }

    #[test]
    fn throttle_scales_all_negative_rates() {
        let f = fixture();
        let mut agg = RateAggregator::new();
        // Silo base drain 0.25 on food; no worker demand without workers.
        agg.recalculate(&f.catalog, &states((1, 2), 1), &UpgradeRegistry::new());
        // Food depleted, no base food production: scale 0.
        agg.apply_throttle(|_| Amount::ZERO, false);
        assert_eq!(agg.scale().factor, Amount::ZERO);
        assert_eq!(agg.net_rate(f.food), Amount::ZERO);
        // Production untouched.
        assert_eq!(agg.net_rate(f.crops), dec!(2.5));

        // With stock, no scarcity.
        agg.apply_throttle(|_| dec!(10), false);
        assert_eq!(agg.scale().factor, Amount::ONE);
        assert_eq!(agg.net_rate(f.food), dec!(-2.25));
    }

    #[test]
    fn partial_scale_throttles_base_drains_too() {
        let mut b = CatalogBuilder::new();
        let food = b.register_resource("food", dec!(0), ResourceOptions::default());
        let wood = b.register_resource("wood", dec!(10), ResourceOptions::default());
        b.register_building(BuildingType::new("mill").base_gain(food, dec!(1)));
        b.register_building(BuildingType::new("hall").workers(2).worker_drain(food, dec!(1)));
        b.register_building(BuildingType::new("pyre").base_drain(wood, dec!(0.5)));
        let catalog = b.build().unwrap();
        let states: Vec<BuildingState> = [(1, 0), (1, 2), (1, 0)]
            .into_iter()
            .map(|(count, workers)| BuildingState {
                count,
                workers,
                unlocked: true,
                dropped: false,
            })
            .collect();

        let mut agg = RateAggregator::new();
        agg.recalculate(&catalog, &states, &UpgradeRegistry::new());
        // Food is empty: the mill covers 1 of the 2 food/s the hall wants.
        agg.apply_throttle(|id| if id == wood { dec!(10) } else { Amount::ZERO }, false);
        assert_eq!(agg.scale().factor, dec!(0.5));
        assert_eq!(agg.scale().bottlenecks.len(), 1);
        assert_eq!(agg.scale().bottlenecks[0].resource, food);
        assert_eq!(agg.net_rate(food), dec!(-0.5));
        // Wood has no worker demand, yet its base drain is halved as well.
        assert_eq!(agg.net_rate(wood), dec!(-0.25));
    }

    #[test]
    fn strike_drops_worker_drains() {
        let f = fixture();
        let mut agg = RateAggregator::new();
        agg.recalculate(&f.catalog, &states((1, 2), 0), &UpgradeRegistry::new());
        agg.apply_throttle(|_| Amount::ZERO, true);
        assert_eq!(agg.net_rate(f.food), Amount::ZERO);
        assert_eq!(agg.net_rate(f.crops), dec!(2.5));
    }

    #[test]
    fn missing_state_is_skipped() {
        let f = fixture();
        let mut agg = RateAggregator::new();
        assert!(agg.recalculate(&f.catalog, &[], &UpgradeRegistry::new()));
        assert!(agg.flows().is_empty());
        assert_eq!(agg.net_rate(f.crops), Amount::ZERO);
        let _ = f.silo;
    }
}
