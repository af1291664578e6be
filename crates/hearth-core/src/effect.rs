//! Effect records and the single compute path that resolves them.
//!
//! Every quantity the industry derives from building definitions (production
//! and consumption rates, build costs, sell rewards, cap increases) is built
//! as an [`EffectContext`] and resolved through [`compute_effect`], which
//! folds every registered upgrade over it in priority order. The resolved
//! [`Effect`] keeps the modifier trail so UI breakdowns can explain a number.

use crate::decimal::Amount;
use crate::id::{BuildingTypeId, ResourceId};
use crate::upgrade::{MetaTarget, Modification, UpgradeRegistry};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// What kind of quantity an effect describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectCategory {
    Rate,
    Cost,
    Reward,
    Cap,
}

/// Whether the effect adds to or removes from the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Gain,
    Drain,
}

/// Semantic tag used by upgrades to select what they touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectTag {
    /// Production from buildings or workers.
    Prod,
    /// Inputs consumed by running buildings.
    Input,
    /// Upkeep paid to assigned workers.
    Pay,
    /// One-time construction cost.
    Build,
    /// One-time refund from selling.
    Sell,
    /// Storage cap increase.
    Cap,
}

/// Which effect table of a building the line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectSource {
    /// Applies per building built.
    Base,
    /// Applies per worker assigned.
    Worker,
}

impl EffectTag {
    /// Map a category/direction/source triple to its semantic tag.
    pub fn classify(category: EffectCategory, direction: Direction, source: EffectSource) -> Self {
        match category {
            EffectCategory::Rate => match (direction, source) {
                (Direction::Gain, _) => EffectTag::Prod,
                (Direction::Drain, EffectSource::Base) => EffectTag::Input,
                (Direction::Drain, EffectSource::Worker) => EffectTag::Pay,
            },
            EffectCategory::Cost => EffectTag::Build,
            EffectCategory::Reward => EffectTag::Sell,
            EffectCategory::Cap => EffectTag::Cap,
        }
    }
}

// ---------------------------------------------------------------------------
// Context and result
// ---------------------------------------------------------------------------

/// Everything an upgrade may inspect when deciding whether and how to modify
/// a base quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectContext {
    pub category: EffectCategory,
    pub resource: ResourceId,
    pub direction: Direction,
    pub tag: EffectTag,
    /// Per-unit magnitude from the building definition. Never negative.
    pub base_value: Amount,
    /// Number of units (buildings or workers) the effect is scaled by.
    pub units: Amount,
    pub building: Option<BuildingTypeId>,
    pub source: EffectSource,
    /// Number of buildings of this type currently built.
    pub building_count: u64,
}

impl EffectContext {
    /// A production or consumption line for a running building.
    pub fn rate(
        building: BuildingTypeId,
        resource: ResourceId,
        direction: Direction,
        source: EffectSource,
        base_value: Amount,
        units: u64,
        building_count: u64,
    ) -> Self {
        Self {
            category: EffectCategory::Rate,
            resource,
            direction,
            tag: EffectTag::classify(EffectCategory::Rate, direction, source),
            base_value,
            units: Amount::from(units),
            building: Some(building),
            source,
            building_count,
        }
    }

    /// The build cost of `units` buildings.
    pub fn cost(
        building: BuildingTypeId,
        resource: ResourceId,
        base_value: Amount,
        units: u64,
        building_count: u64,
    ) -> Self {
        Self::one_time(EffectCategory::Cost, Direction::Drain, building, resource, base_value, units, building_count)
    }

    /// The refund for selling `units` buildings.
    pub fn reward(
        building: BuildingTypeId,
        resource: ResourceId,
        base_value: Amount,
        units: u64,
        building_count: u64,
    ) -> Self {
        Self::one_time(EffectCategory::Reward, Direction::Gain, building, resource, base_value, units, building_count)
    }

    /// The cap increase provided by `units` buildings.
    pub fn cap(
        building: BuildingTypeId,
        resource: ResourceId,
        base_value: Amount,
        units: u64,
        building_count: u64,
    ) -> Self {
        Self::one_time(EffectCategory::Cap, Direction::Gain, building, resource, base_value, units, building_count)
    }

    fn one_time(
        category: EffectCategory,
        direction: Direction,
        building: BuildingTypeId,
        resource: ResourceId,
        base_value: Amount,
        units: u64,
        building_count: u64,
    ) -> Self {
        Self {
            category,
            resource,
            direction,
            tag: EffectTag::classify(category, direction, EffectSource::Base),
            base_value,
            units: Amount::from(units),
            building: Some(building),
            source: EffectSource::Base,
            building_count,
        }
    }
}

/// A resolved effect: the context it was computed from, the final magnitude
/// and the display strings of every modification that touched it.
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    pub context: EffectContext,
    /// Final magnitude, `value * mult * units`. Direction lives in the context.
    pub value: Amount,
    pub modifiers: Vec<String>,
}

impl Effect {
    /// The magnitude signed by direction: gains positive, drains negative.
    pub fn signed(&self) -> Amount {
        match self.context.direction {
            Direction::Gain => self.value,
            Direction::Drain => -self.value,
        }
    }

    pub fn resource(&self) -> ResourceId {
        self.context.resource
    }
}

// ---------------------------------------------------------------------------
// Compute
// ---------------------------------------------------------------------------

/// Resolve a base effect against every registered upgrade.
///
/// Upgrades are visited highest priority first. An upgrade whose predicate
/// matches and which returns a modification first offers that modification
/// to every other upgrade's meta hook (one level deep, each hook seeing the
/// result of the previous one), then applies it: `set` overrides the running
/// value, `add` increments it, `mult` multiplies the running multiplier.
pub fn compute_effect(upgrades: &UpgradeRegistry, context: EffectContext) -> Effect {
    let mut value = context.base_value;
    let mut mult = Amount::ONE;
    let mut trail = Vec::new();

    for (key, upgrade) in upgrades.iter() {
        if !upgrade.matches(&context) {
            continue;
        }
        let Some(mut modification) = upgrade.apply(&context) else {
            continue;
        };

        for (meta_key, meta) in upgrades.iter() {
            if meta_key == key || !meta.matches(&context) {
                continue;
            }
            let target = MetaTarget {
                key,
                name: upgrade.name(),
                result: &modification,
            };
            if let Some(replaced) = meta.apply_meta(&context, &target) {
                modification = replaced;
            }
        }

        apply_modification(&mut value, &mut mult, &mut trail, modification);
    }

    let resolved = value.saturating_mul(mult).saturating_mul(context.units);
    Effect {
        context,
        value: resolved.max(Amount::ZERO),
        modifiers: trail,
    }
}

fn apply_modification(
    value: &mut Amount,
    mult: &mut Amount,
    trail: &mut Vec<String>,
    modification: Modification,
) {
    if let Some(set) = modification.set {
        *value = set;
    }
    if let Some(add) = modification.add {
        *value = value.saturating_add(add);
    }
    if let Some(m) = modification.mult {
        *mult = mult.saturating_mul(m);
    }
    trail.extend(modification.modifiers);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upgrade::{FnModifier, Modification};
    use rust_decimal_macros::dec;

    fn prod(base: Amount, units: u64) -> EffectContext {
        EffectContext::rate(
            BuildingTypeId(0),
            ResourceId(0),
            Direction::Gain,
            EffectSource::Worker,
            base,
            units,
            1,
        )
    }

    #[test]
    fn classify_tags() {
        use EffectCategory::*;
        assert_eq!(EffectTag::classify(Rate, Direction::Gain, EffectSource::Base), EffectTag::Prod);
        assert_eq!(EffectTag::classify(Rate, Direction::Drain, EffectSource::Base), EffectTag::Input);
        assert_eq!(EffectTag::classify(Rate, Direction::Drain, EffectSource::Worker), EffectTag::Pay);
        assert_eq!(EffectTag::classify(Cost, Direction::Drain, EffectSource::Base), EffectTag::Build);
        assert_eq!(EffectTag::classify(Reward, Direction::Gain, EffectSource::Base), EffectTag::Sell);
        assert_eq!(EffectTag::classify(Cap, Direction::Gain, EffectSource::Base), EffectTag::Cap);
    }

    #[test]
    fn no_upgrades_scales_by_units() {
        let registry = UpgradeRegistry::new();
        let effect = compute_effect(&registry, prod(dec!(1.5), 4));
        assert_eq!(effect.value, dec!(6));
        assert!(effect.modifiers.is_empty());
        assert_eq!(effect.signed(), dec!(6));
    }

    #[test]
    fn drain_is_signed_negative() {
        let registry = UpgradeRegistry::new();
        let ctx = EffectContext::cost(BuildingTypeId(0), ResourceId(0), dec!(10), 2, 0);
        let effect = compute_effect(&registry, ctx);
        assert_eq!(effect.value, dec!(20));
        assert_eq!(effect.signed(), dec!(-20));
    }

    #[test]
    fn set_add_and_mult_compose() {
        let mut registry = UpgradeRegistry::new();
        registry.register(
            Box::new(FnModifier::new("setter", |_| Some(Modification::set(dec!(2))))),
            10,
        );
        registry.register(
            Box::new(FnModifier::new("adder", |_| Some(Modification::add(dec!(1))))),
            5,
        );
        registry.register(
            Box::new(FnModifier::new("doubler", |_| {
                Some(Modification::mult(dec!(2)).with_modifier("x2"))
            })),
            0,
        );

        // (set 2, then +1) * 2 * 3 units
        let effect = compute_effect(&registry, prod(dec!(1), 3));
        assert_eq!(effect.value, dec!(18));
        assert_eq!(effect.modifiers, vec!["x2".to_string()]);
    }

    #[test]
    fn priority_decides_set_versus_add() {
        let mut registry = UpgradeRegistry::new();
        // Lower priority set runs after the add and wipes it out.
        registry.register(
            Box::new(FnModifier::new("adder", |_| Some(Modification::add(dec!(1))))),
            5,
        );
        registry.register(
            Box::new(FnModifier::new("setter", |_| Some(Modification::set(dec!(2))))),
            0,
        );
        let effect = compute_effect(&registry, prod(dec!(1), 1));
        assert_eq!(effect.value, dec!(2));
    }

    #[test]
    fn predicate_filters_upgrades() {
        let mut registry = UpgradeRegistry::new();
        registry.register(
            Box::new(
                FnModifier::new("costs", |_| Some(Modification::mult(dec!(0.5))))
                    .with_predicate(|ctx| ctx.tag == EffectTag::Build),
            ),
            0,
        );
        let cost = EffectContext::cost(BuildingTypeId(0), ResourceId(0), dec!(10), 1, 0);
        assert_eq!(compute_effect(&registry, cost).value, dec!(5));
        assert_eq!(compute_effect(&registry, prod(dec!(1), 1)).value, dec!(1));
    }

    #[test]
    fn resolved_value_never_negative() {
        let mut registry = UpgradeRegistry::new();
        registry.register(
            Box::new(FnModifier::new("penalty", |_| Some(Modification::add(dec!(-5))))),
            0,
        );
        assert_eq!(compute_effect(&registry, prod(dec!(1), 2)).value, Amount::ZERO);
    }
}
