//! The industry manager: owns every resource and building state and
//! orchestrates rate aggregation, worker throttling and integration.
//!
//! # Tick
//!
//! Each [`IndustryManager::tick`] runs:
//! 1. **Recalculate** -- refresh cached rates if anything changed.
//! 2. **Strike** -- decide from unthrottled food rates whether workers strike;
//!    refold rates if the state flipped.
//! 3. **Integrate** -- every resource advances by its net rate and clamps.
//! 4. **Broadcast** -- listeners receive the new [`IndustryData`].
//!
//! Mutating actions refresh the rate cache before returning, so queries
//! never observe stale rates.

use crate::building::BuildingState;
use crate::catalog::Catalog;
use crate::config::{Increment, IndustryConfigs, IndustrySettings};
use crate::decimal::{duration, fraction, seconds, Amount};
use crate::effect::{Direction, Effect, EffectSource};
use crate::event::{Broadcaster, Listener};
use crate::id::{BuildingTypeId, ListenerId, ResourceId, TheurgyId, UpgradeKey};
use crate::planner::{Action, ActionPlan, ActionPlanner, Limit};
use crate::query::{
    AggregateEffect, BuildingView, DisabledReason, IndustryData, ResourceChange, ResourceView,
};
use crate::rates::{building_rate_effects, RateAggregator};
use crate::resource::{Resource, INDUSTRY_GROWTH};
use crate::scaler::Bottleneck;
use crate::upgrade::{Modifier, UpgradeRegistry};
use log::{debug, info};
use std::collections::BTreeMap;
use std::time::Duration;

/// Trail entry attached to worker drains suppressed by a strike.
pub const STRIKE_MODIFIER: &str = "workers on strike";

#[derive(Debug)]
pub struct IndustryManager {
    pub(crate) catalog: Catalog,
    pub(crate) settings: IndustrySettings,
    pub(crate) resources: Vec<Resource>,
    pub(crate) buildings: Vec<BuildingState>,
    pub(crate) access: BTreeMap<String, bool>,
    pub(crate) workers_on_strike: bool,
    pub(crate) configs: IndustryConfigs,
    upgrades: UpgradeRegistry,
    rates: RateAggregator,
    broadcaster: Broadcaster,
}

impl IndustryManager {
    pub fn new(catalog: Catalog) -> Self {
        Self::with_settings(catalog, IndustrySettings::default())
    }

    pub fn with_settings(catalog: Catalog, settings: IndustrySettings) -> Self {
        let resources = catalog
            .resources()
            .map(|(_, def)| Resource::new(def.initial, def.options.clone()))
            .collect();
        let buildings = catalog
            .buildings()
            .map(|(_, def)| BuildingState::for_type(def))
            .collect();
        let mut manager = Self {
            catalog,
            settings,
            resources,
            buildings,
            access: BTreeMap::new(),
            workers_on_strike: false,
            configs: IndustryConfigs::default(),
            upgrades: UpgradeRegistry::new(),
            rates: RateAggregator::new(),
            broadcaster: Broadcaster::new(),
        };
        manager.refresh_rates();
        manager
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Advance the simulation by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        let dt = seconds(dt);
        self.refresh_rates();

        let strike = self.strike_condition(dt);
        if strike != self.workers_on_strike {
            if strike {
                info!("workers on strike: food cannot cover worker upkeep");
            } else {
                info!("strike over: food covers worker upkeep again");
            }
            self.workers_on_strike = strike;
            self.refresh_rates();
        }

        for resource in &mut self.resources {
            resource.update(dt);
        }
        // Stock moved, so scarcity may have too.
        self.refresh_rates();
        self.broadcast();
    }

    /// Workers strike when the unthrottled food rate is negative and the
    /// drain over `dt` exceeds the food in stock. An empty interval leaves
    /// the current state alone.
    fn strike_condition(&self, dt: Amount) -> bool {
        let Some(food) = self.catalog.roles().food else {
            return false;
        };
        if dt <= Amount::ZERO {
            return self.workers_on_strike;
        }
        let raw = self.rates.flow(food).raw_net();
        raw < Amount::ZERO && (-raw).saturating_mul(dt) > self.stock(food)
    }

    /// Recalculate cached rates if dirty, apply dynamic caps, refold the
    /// throttle against current stock and publish rates to every resource.
    fn refresh_rates(&mut self) {
        if self
            .rates
            .recalculate(&self.catalog, &self.buildings, &self.upgrades)
        {
            self.apply_caps();
        }
        let resources = &self.resources;
        self.rates.apply_throttle(
            |id| resources.get(id.index()).map(Resource::value).unwrap_or(Amount::ZERO),
            self.workers_on_strike,
        );
        for (index, resource) in self.resources.iter_mut().enumerate() {
            resource.set_growth(INDUSTRY_GROWTH, self.rates.net_rate(ResourceId(index as u32)));
        }
    }

    /// Only resources with a static cap get building bonuses.
    fn apply_caps(&mut self) {
        for (index, resource) in self.resources.iter_mut().enumerate() {
            let Some(base) = resource.cap() else {
                continue;
            };
            let bonus = self.rates.cap_bonus(ResourceId(index as u32));
            resource.set_dynamic_cap(bonus.map(|b| base.saturating_add(b)));
        }
    }

    fn broadcast(&mut self) {
        if self.broadcaster.is_empty() {
            return;
        }
        let data = self.data();
        self.broadcaster.emit(&data);
    }

    fn planner(&self) -> ActionPlanner<'_> {
        ActionPlanner {
            catalog: &self.catalog,
            resources: &self.resources,
            buildings: &self.buildings,
            upgrades: &self.upgrades,
        }
    }

    fn stock(&self, resource: ResourceId) -> Amount {
        self.planner().stock(resource)
    }

    fn building_name(&self, id: BuildingTypeId) -> &str {
        self.catalog.building(id).map_or("?", |d| d.name.as_str())
    }

    /// An explicit amount, or the current plan when `None`.
    fn resolve_amount(&self, action: Action, id: BuildingTypeId, amount: Option<u64>) -> u64 {
        match amount {
            Some(n) => n,
            None => self.action_plan(action, id).map_or(0, |plan| plan.actual),
        }
    }

    fn after_building_change(&mut self, id: BuildingTypeId) {
        self.rates.mark_building(id);
        self.refresh_rates();
        self.broadcast();
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Build `amount` buildings (or the planned amount). Costs are deducted
    /// all-or-nothing. Returns the number built, 0 on any failure.
    pub fn build(&mut self, id: BuildingTypeId, amount: Option<u64>) -> u64 {
        let unlocked = self.building(id).is_some_and(|s| s.unlocked);
        if !unlocked {
            return 0;
        }
        let units = self.resolve_amount(Action::Build, id, amount);
        if units == 0 {
            return 0;
        }
        let costs = self.planner().costs(id, units);
        if !costs.iter().all(|c| self.stock(c.resource()) >= c.value) {
            return 0;
        }
        for cost in &costs {
            if let Some(resource) = self.resources.get_mut(cost.resource().index()) {
                resource.subtract(cost.value);
            }
        }
        let state = &mut self.buildings[id.index()];
        state.count = state.count.saturating_add(units);
        debug!("built {units} {} (now {})", self.building_name(id), self.buildings[id.index()].count);
        self.after_building_change(id);
        units
    }

    /// Sell up to `amount` buildings, refunding the sell reward for what was
    /// actually sold and clamping workers to the reduced capacity.
    pub fn sell(&mut self, id: BuildingTypeId, amount: Option<u64>) -> u64 {
        let (Some(def), Some(count)) = (self.catalog.building(id), self.building(id).map(|s| s.count))
        else {
            return 0;
        };
        let units = self.resolve_amount(Action::Sell, id, amount).min(count);
        if units == 0 {
            return 0;
        }
        let rewards = self.planner().rewards(id, units);
        for reward in &rewards {
            if let Some(resource) = self.resources.get_mut(reward.resource().index()) {
                resource.add(reward.value);
            }
        }
        let state = &mut self.buildings[id.index()];
        state.count -= units;
        let released = state.clamp_workers(def);
        debug!(
            "sold {units} {} (released {released} workers)",
            self.building_name(id)
        );
        self.after_building_change(id);
        units
    }

    /// Assign up to `amount` unassigned workers, bounded by free slots.
    pub fn hire(&mut self, id: BuildingTypeId, amount: Option<u64>) -> u64 {
        let units = self.resolve_amount(Action::Hire, id, amount);
        let units = self.planner().limit(Action::Hire, id).min(units);
        if units == 0 {
            return 0;
        }
        let state = &mut self.buildings[id.index()];
        state.workers = state.workers.saturating_add(units);
        debug!("hired {units} workers at {}", self.building_name(id));
        self.after_building_change(id);
        units
    }

    /// Release up to `amount` assigned workers back to the pool.
    pub fn furlough(&mut self, id: BuildingTypeId, amount: Option<u64>) -> u64 {
        let units = self.resolve_amount(Action::Furlough, id, amount);
        let units = self.planner().limit(Action::Furlough, id).min(units);
        if units == 0 {
            return 0;
        }
        let state = &mut self.buildings[id.index()];
        state.workers -= units;
        debug!("furloughed {units} workers at {}", self.building_name(id));
        self.after_building_change(id);
        units
    }

    /// Apply a manual action. Fails with an empty list unless every negative
    /// delta is covered by current stock. Returns the applied changes.
    pub fn perform_theurgy(&mut self, id: TheurgyId) -> Vec<ResourceChange> {
        let Some(def) = self.catalog.theurgy(id) else {
            return Vec::new();
        };
        let changes = def.changes.clone();
        let affordable = changes
            .iter()
            .all(|&(resource, delta)| delta >= Amount::ZERO || self.stock(resource) >= -delta);
        if !affordable {
            return Vec::new();
        }

        let mut applied = Vec::with_capacity(changes.len());
        for (resource, delta) in changes {
            let Some(target) = self.resources.get_mut(resource.index()) else {
                continue;
            };
            let before = target.value();
            target.add(delta);
            applied.push(ResourceChange {
                resource,
                delta: target.value() - before,
            });
        }
        debug!("performed {}", def.name);
        self.refresh_rates();
        self.broadcast();
        applied
    }

    /// Unlock a building type. Returns `false` if unknown or already unlocked.
    pub fn unlock(&mut self, id: BuildingTypeId) -> bool {
        let Some(state) = self.buildings.get_mut(id.index()) else {
            return false;
        };
        if state.unlocked {
            return false;
        }
        state.unlocked = true;
        debug!("unlocked {}", self.building_name(id));
        self.broadcast();
        true
    }

    /// Mark a building card as revealed.
    pub fn mark_dropped(&mut self, id: BuildingTypeId) -> bool {
        let Some(state) = self.buildings.get_mut(id.index()) else {
            return false;
        };
        let changed = !state.dropped;
        state.dropped = true;
        if changed {
            self.broadcast();
        }
        changed
    }

    pub fn cycle_increment(&mut self) -> Increment {
        self.configs.increment = self.configs.increment.next();
        self.broadcast();
        self.configs.increment
    }

    pub fn set_increment(&mut self, increment: Increment) {
        self.configs.increment = increment;
        self.broadcast();
    }

    pub fn set_expanded(&mut self, resource: ResourceId, expanded: bool) {
        let Some(name) = self.catalog.resource_name(resource) else {
            return;
        };
        self.configs.expanded.insert(name.to_string(), expanded);
        self.broadcast();
    }

    pub fn grant_access(&mut self, feature: &str) {
        self.access.insert(feature.to_string(), true);
        self.broadcast();
    }

    pub fn has_access(&self, feature: &str) -> bool {
        self.access.get(feature).copied().unwrap_or(false)
    }

    /// Reveal a resource. Returns `false` if unknown or already discovered.
    pub fn discover(&mut self, resource: ResourceId) -> bool {
        let Some(target) = self.resources.get_mut(resource.index()) else {
            return false;
        };
        if target.is_discovered() {
            return false;
        }
        target.discover();
        self.broadcast();
        true
    }

    /// Add `amount` to a resource outside the rate system.
    pub fn grant(&mut self, resource: ResourceId, amount: Amount) {
        let Some(target) = self.resources.get_mut(resource.index()) else {
            return;
        };
        target.add(amount);
        self.refresh_rates();
        self.broadcast();
    }

    pub fn set_resource_value(&mut self, resource: ResourceId, value: Amount) {
        let Some(target) = self.resources.get_mut(resource.index()) else {
            return;
        };
        target.set_value(value);
        self.refresh_rates();
        self.broadcast();
    }

    // -----------------------------------------------------------------------
    // Upgrades and listeners
    // -----------------------------------------------------------------------

    pub fn register_upgrade(&mut self, modifier: Box<dyn Modifier>, priority: i32) -> UpgradeKey {
        let key = self.upgrades.register(modifier, priority);
        self.invalidate_rates();
        key
    }

    /// Remove an upgrade and restore rates to what they were without it.
    pub fn unregister_upgrade(&mut self, key: UpgradeKey) -> bool {
        if self.upgrades.unregister(key).is_none() {
            return false;
        }
        self.invalidate_rates();
        true
    }

    /// Force a recalculation, e.g. after a stat read by an upgrade changed.
    pub fn invalidate_rates(&mut self) {
        self.rates.mark_upgrades();
        self.refresh_rates();
        self.broadcast();
    }

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        self.broadcaster.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.broadcaster.unsubscribe(id)
    }

    // -----------------------------------------------------------------------
    // State accessors
    // -----------------------------------------------------------------------

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &IndustrySettings {
        &self.settings
    }

    pub fn configs(&self) -> &IndustryConfigs {
        &self.configs
    }

    pub fn upgrades(&self) -> &UpgradeRegistry {
        &self.upgrades
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index())
    }

    pub fn value(&self, id: ResourceId) -> Amount {
        self.stock(id)
    }

    pub fn building(&self, id: BuildingTypeId) -> Option<&BuildingState> {
        self.buildings.get(id.index())
    }

    pub fn workers_on_strike(&self) -> bool {
        self.workers_on_strike
    }

    pub fn net_rate(&self, resource: ResourceId) -> Amount {
        self.rates.net_rate(resource)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn action_limit(&self, action: Action, id: BuildingTypeId) -> Limit {
        self.planner().limit(action, id)
    }

    /// The plan under the current increment. `None` for unknown buildings.
    pub fn action_plan(&self, action: Action, id: BuildingTypeId) -> Option<ActionPlan> {
        self.catalog.building(id)?;
        Some(self.planner().plan(action, id, self.configs.increment))
    }

    pub fn unassigned_workers(&self) -> u64 {
        self.planner().unassigned_workers()
    }

    pub fn bottlenecks(&self) -> &[Bottleneck] {
        &self.rates.scale().bottlenecks
    }

    /// Effective cap of a resource, including building bonuses.
    pub fn cap(&self, resource: ResourceId) -> Option<Amount> {
        self.resource(resource).and_then(Resource::effective_cap)
    }

    /// Every rate effect of every building, unthrottled.
    fn rate_effects(&self) -> Vec<Effect> {
        self.catalog
            .buildings()
            .filter_map(|(id, def)| {
                let state = self.buildings.get(id.index())?;
                Some(building_rate_effects(&self.upgrades, id, def, state))
            })
            .flatten()
            .collect()
    }

    /// Per-second totals grouped by resource and tag.
    pub fn aggregate_effects(&self) -> Vec<AggregateEffect> {
        let mut totals: BTreeMap<(ResourceId, u8), AggregateEffect> = BTreeMap::new();
        for effect in self.rate_effects() {
            let tag = effect.context.tag;
            let entry = totals
                .entry((effect.resource(), tag as u8))
                .or_insert(AggregateEffect {
                    resource: effect.resource(),
                    tag,
                    total: Amount::ZERO,
                });
            entry.total = entry.total.saturating_add(effect.signed());
        }
        totals.into_values().collect()
    }

    /// Every rate effect on one resource, for tooltip breakdowns. During a
    /// strike worker drains show as zero with a strike trail entry.
    pub fn resource_effects(&self, resource: ResourceId) -> Vec<Effect> {
        self.rate_effects()
            .into_iter()
            .filter(|e| e.resource() == resource)
            .map(|mut e| {
                let suppressed = e.context.source == EffectSource::Worker
                    && e.context.direction == Direction::Drain;
                if self.workers_on_strike && suppressed {
                    e.value = Amount::ZERO;
                    e.modifiers.push(STRIKE_MODIFIER.to_string());
                }
                e
            })
            .collect()
    }

    /// Preview of the resource changes the planned action would cause: one-off
    /// costs and refunds for build and sell, per-second rate changes for hire
    /// and furlough. Previews at least one unit.
    pub fn action_effects(&self, action: Action, id: BuildingTypeId) -> Vec<ResourceChange> {
        let Some(plan) = self.action_plan(action, id) else {
            return Vec::new();
        };
        let units = plan.actual.max(1);
        let planner = self.planner();
        match action {
            Action::Build => planner
                .costs(id, units)
                .iter()
                .map(|e| ResourceChange {
                    resource: e.resource(),
                    delta: -e.value,
                })
                .collect(),
            Action::Sell => planner
                .rewards(id, units)
                .iter()
                .map(|e| ResourceChange {
                    resource: e.resource(),
                    delta: e.value,
                })
                .collect(),
            Action::Hire | Action::Furlough => {
                let (Some(def), Some(state)) = (self.catalog.building(id), self.building(id))
                else {
                    return Vec::new();
                };
                let preview = BuildingState {
                    count: state.count,
                    workers: units,
                    ..state.clone()
                };
                let sign = if action == Action::Hire {
                    Amount::ONE
                } else {
                    Amount::NEGATIVE_ONE
                };
                building_rate_effects(&self.upgrades, id, def, &preview)
                    .into_iter()
                    .filter(|e| e.context.source == EffectSource::Worker)
                    .map(|e| ResourceChange {
                        resource: e.resource(),
                        delta: e.signed() * sign,
                    })
                    .collect()
            }
        }
    }

    /// Fraction of one building's cost covered by stock, taken at the
    /// scarcest resource. 1 for free buildings.
    pub fn build_progress(&self, id: BuildingTypeId) -> Amount {
        self.planner()
            .costs(id, 1)
            .iter()
            .filter(|c| c.value > Amount::ZERO)
            .map(|c| fraction(self.stock(c.resource()), c.value))
            .min()
            .unwrap_or(Amount::ONE)
    }

    /// Assigned workers over worker capacity.
    pub fn hire_progress(&self, id: BuildingTypeId) -> Amount {
        let (Some(def), Some(state)) = (self.catalog.building(id), self.building(id)) else {
            return Amount::ZERO;
        };
        fraction(Amount::from(state.workers), Amount::from(state.worker_capacity(def)))
    }

    /// Value over effective cap. `None` for uncapped resources.
    pub fn resource_progress(&self, resource: ResourceId) -> Option<Amount> {
        let r = self.resource(resource)?;
        let cap = r.effective_cap()?;
        Some(if cap <= Amount::ZERO {
            Amount::ONE
        } else {
            fraction(r.value(), cap)
        })
    }

    /// How long until one more building is affordable at current rates.
    /// `None` if a lacking resource is not growing or can never hold enough.
    pub fn time_until_next_building(&self, id: BuildingTypeId) -> Option<Duration> {
        self.catalog.building(id)?;
        if !self.building(id)?.unlocked {
            return None;
        }
        let mut longest = Amount::ZERO;
        for cost in self.planner().costs(id, 1) {
            let stock = self.stock(cost.resource());
            if stock >= cost.value {
                continue;
            }
            if self.cap(cost.resource()).is_some_and(|cap| cap < cost.value) {
                return None;
            }
            let rate = self.net_rate(cost.resource());
            if rate <= Amount::ZERO {
                return None;
            }
            let wait = (cost.value - stock).checked_div(rate)?;
            longest = longest.max(wait);
        }
        duration(longest)
    }

    /// Why `action` is unavailable for `id`, or `None` if it can be taken.
    pub fn disabled_reason(&self, action: Action, id: BuildingTypeId) -> Option<DisabledReason> {
        let (Some(def), Some(state)) = (self.catalog.building(id), self.building(id)) else {
            return Some(DisabledReason::UnknownBuilding);
        };
        match action {
            Action::Build => {
                if !state.unlocked {
                    return Some(DisabledReason::Locked);
                }
                let units = self.action_plan(action, id).map_or(1, |p| p.actual.max(1));
                self.planner().costs(id, units).into_iter().find_map(|cost| {
                    let available = self.stock(cost.resource());
                    (available < cost.value).then(|| DisabledReason::InsufficientResources {
                        resource: self
                            .catalog
                            .resource_name(cost.resource())
                            .unwrap_or("?")
                            .to_string(),
                        needed: cost.value,
                        available,
                    })
                })
            }
            Action::Sell => (state.count == 0).then_some(DisabledReason::NoBuildings),
            Action::Hire => {
                if !state.unlocked {
                    Some(DisabledReason::Locked)
                } else if state.count == 0 {
                    Some(DisabledReason::NoBuildings)
                } else if state.free_slots(def) == 0 {
                    Some(DisabledReason::NoWorkerSlots)
                } else if self.unassigned_workers() == 0 {
                    Some(DisabledReason::NoUnassignedWorkers)
                } else {
                    None
                }
            }
            Action::Furlough => (state.workers == 0).then_some(DisabledReason::NoWorkers),
        }
    }

    /// The renderable snapshot passed to listeners.
    pub fn data(&self) -> IndustryData {
        let resources = self
            .catalog
            .resources()
            .filter_map(|(id, def)| {
                let r = self.resource(id)?;
                Some(ResourceView {
                    id,
                    name: def.name.clone(),
                    value: r.value(),
                    cap: r.effective_cap(),
                    rate: self.net_rate(id),
                    is_discovered: r.is_discovered(),
                    expanded: self.configs.expanded.get(&def.name).copied().unwrap_or(false),
                })
            })
            .collect();
        let buildings = self
            .catalog
            .buildings()
            .filter_map(|(id, def)| {
                let s = self.building(id)?;
                Some(BuildingView {
                    id,
                    name: def.name.clone(),
                    count: s.count,
                    workers: s.workers,
                    worker_capacity: s.worker_capacity(def),
                    unlocked: s.unlocked,
                    dropped: s.dropped,
                })
            })
            .collect();
        IndustryData {
            resources,
            buildings,
            workers_on_strike: self.workers_on_strike,
            unassigned_workers: self.unassigned_workers(),
            increment: self.configs.increment,
            bottlenecks: self.bottlenecks().to_vec(),
        }
    }

    /// Replace all mutable state at once and rebuild derived state. Values
    /// are applied after dynamic caps so saved stock above the static cap
    /// survives.
    pub(crate) fn install(
        &mut self,
        resources: Vec<Resource>,
        values: Vec<Amount>,
        buildings: Vec<BuildingState>,
        access: BTreeMap<String, bool>,
        configs: IndustryConfigs,
        workers_on_strike: bool,
    ) {
        self.resources = resources;
        self.buildings = buildings;
        self.access = access;
        self.configs = configs;
        self.workers_on_strike = workers_on_strike;
        self.rates.mark_all();
        self.refresh_rates();
        for (resource, value) in self.resources.iter_mut().zip(values) {
            resource.set_value(value);
        }
        self.refresh_rates();
    }

    pub(crate) fn notify(&mut self) {
        self.broadcast();
    }
}
