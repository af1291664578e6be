//! Upgrade registry: modifiers that rewrite effects before they are summed.
//!
//! Modifiers are registered with a priority and held for the lifetime of the
//! industry. Iteration order is priority descending, ties broken by
//! registration order. A modifier may also act as a meta-modifier through
//! [`Modifier::apply_meta`], rewriting another modifier's result.

use crate::decimal::Amount;
use crate::effect::{EffectContext, EffectTag};
use crate::id::UpgradeKey;
use slotmap::SlotMap;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Modification
// ---------------------------------------------------------------------------

/// What a modifier does to an effect. All parts are optional and compose:
/// `set` first, then `add`, then `mult` folds into the running multiplier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modification {
    pub set: Option<Amount>,
    pub add: Option<Amount>,
    pub mult: Option<Amount>,
    /// Display strings for tooltip breakdowns.
    pub modifiers: Vec<String>,
}

impl Modification {
    pub fn set(value: Amount) -> Self {
        Self {
            set: Some(value),
            ..Self::default()
        }
    }

    pub fn add(delta: Amount) -> Self {
        Self {
            add: Some(delta),
            ..Self::default()
        }
    }

    pub fn mult(factor: Amount) -> Self {
        Self {
            mult: Some(factor),
            ..Self::default()
        }
    }

    pub fn with_modifier(mut self, text: impl Into<String>) -> Self {
        self.modifiers.push(text.into());
        self
    }
}

/// The modification another upgrade just produced, offered to meta hooks.
#[derive(Debug)]
pub struct MetaTarget<'a> {
    pub key: UpgradeKey,
    pub name: &'a str,
    pub result: &'a Modification,
}

// ---------------------------------------------------------------------------
// Modifier trait
// ---------------------------------------------------------------------------

/// A registered upgrade.
///
/// `matches` gates both `apply` and `apply_meta`. The default
/// implementations match everything and have no meta behaviour.
pub trait Modifier: fmt::Debug {
    /// Name used in meta targeting and diagnostics.
    fn name(&self) -> &str;

    fn matches(&self, ctx: &EffectContext) -> bool {
        let _ = ctx;
        true
    }

    fn apply(&self, ctx: &EffectContext) -> Option<Modification>;

    /// Optionally replace the result another upgrade produced for `ctx`.
    fn apply_meta(&self, ctx: &EffectContext, target: &MetaTarget<'_>) -> Option<Modification> {
        let _ = (ctx, target);
        None
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct UpgradeEntry {
    modifier: Box<dyn Modifier>,
    priority: i32,
    seq: u64,
}

impl fmt::Debug for UpgradeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeEntry")
            .field("modifier", &self.modifier.name())
            .field("priority", &self.priority)
            .field("seq", &self.seq)
            .finish()
    }
}

/// Holds modifiers in evaluation order.
#[derive(Debug, Default)]
pub struct UpgradeRegistry {
    entries: SlotMap<UpgradeKey, UpgradeEntry>,
    /// Keys sorted by priority descending, then registration order.
    order: Vec<UpgradeKey>,
    next_seq: u64,
}

impl UpgradeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a modifier. Higher priorities are evaluated first.
    pub fn register(&mut self, modifier: Box<dyn Modifier>, priority: i32) -> UpgradeKey {
        let seq = self.next_seq;
        self.next_seq += 1;
        let key = self.entries.insert(UpgradeEntry {
            modifier,
            priority,
            seq,
        });
        self.rebuild_order();
        key
    }

    /// Remove a modifier, returning it if it was registered.
    pub fn unregister(&mut self, key: UpgradeKey) -> Option<Box<dyn Modifier>> {
        let entry = self.entries.remove(key)?;
        self.rebuild_order();
        Some(entry.modifier)
    }

    pub fn contains(&self, key: UpgradeKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn priority(&self, key: UpgradeKey) -> Option<i32> {
        self.entries.get(key).map(|e| e.priority)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate modifiers in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (UpgradeKey, &dyn Modifier)> + '_ {
        self.order
            .iter()
            .filter_map(|&key| self.entries.get(key).map(|e| (key, e.modifier.as_ref())))
    }

    fn rebuild_order(&mut self) {
        let mut keyed: Vec<(i32, u64, UpgradeKey)> = self
            .entries
            .iter()
            .map(|(key, e)| (e.priority, e.seq, key))
            .collect();
        keyed.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        self.order = keyed.into_iter().map(|(_, _, key)| key).collect();
    }
}

// ---------------------------------------------------------------------------
// Closure modifier
// ---------------------------------------------------------------------------

type ApplyFn = Box<dyn Fn(&EffectContext) -> Option<Modification>>;
type PredicateFn = Box<dyn Fn(&EffectContext) -> bool>;

/// A modifier built from a function and an optional predicate.
pub struct FnModifier {
    name: String,
    apply: ApplyFn,
    predicate: Option<PredicateFn>,
}

impl FnModifier {
    pub fn new(
        name: impl Into<String>,
        apply: impl Fn(&EffectContext) -> Option<Modification> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            apply: Box::new(apply),
            predicate: None,
        }
    }

    pub fn with_predicate(mut self, predicate: impl Fn(&EffectContext) -> bool + 'static) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }
}

impl fmt::Debug for FnModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModifier")
            .field("name", &self.name)
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl Modifier for FnModifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, ctx: &EffectContext) -> bool {
        self.predicate.as_ref().is_none_or(|p| p(ctx))
    }

    fn apply(&self, ctx: &EffectContext) -> Option<Modification> {
        (self.apply)(ctx)
    }
}

// ---------------------------------------------------------------------------
// Stat-driven modifiers
// ---------------------------------------------------------------------------

/// Read access to ruler stats (wisdom and friends) owned by the host.
pub trait StatSource {
    fn stat(&self, name: &str) -> Option<Amount>;
}

impl StatSource for BTreeMap<String, Amount> {
    fn stat(&self, name: &str) -> Option<Amount> {
        self.get(name).copied()
    }
}

impl<T: StatSource> StatSource for RefCell<T> {
    fn stat(&self, name: &str) -> Option<Amount> {
        self.borrow().stat(name)
    }
}

/// Multiplies effects with the given tags by `1 + per_point * stat`.
///
/// With `per_point = 0.01` and a stat of 10 a production effect of 1.0
/// resolves to 1.1.
pub struct StatBonus {
    name: String,
    stat: String,
    per_point: Amount,
    tags: Vec<EffectTag>,
    source: Rc<dyn StatSource>,
}

impl StatBonus {
    pub fn new(
        name: impl Into<String>,
        stat: impl Into<String>,
        per_point: Amount,
        tags: Vec<EffectTag>,
        source: Rc<dyn StatSource>,
    ) -> Self {
        Self {
            name: name.into(),
            stat: stat.into(),
            per_point,
            tags,
            source,
        }
    }
}

impl fmt::Debug for StatBonus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatBonus")
            .field("name", &self.name)
            .field("stat", &self.stat)
            .field("per_point", &self.per_point)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl Modifier for StatBonus {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, ctx: &EffectContext) -> bool {
        self.tags.contains(&ctx.tag)
    }

    fn apply(&self, _ctx: &EffectContext) -> Option<Modification> {
        let points = self.source.stat(&self.stat)?;
        let bonus = self.per_point.saturating_mul(points);
        if bonus.is_zero() {
            return None;
        }
        let percent = (bonus * Amount::ONE_HUNDRED).normalize();
        let sign = if bonus.is_sign_negative() { "" } else { "+" };
        Some(
            Modification::mult(Amount::ONE.saturating_add(bonus))
                .with_modifier(format!("{sign}{percent}% {}", self.stat)),
        )
    }
}

/// Meta-modifier scaling the bonus of another upgrade by `factor`.
///
/// A target multiplier `m` becomes `1 + (m - 1) * factor` and a target `add`
/// is multiplied by `factor`; `set` passes through untouched.
#[derive(Debug, Clone)]
pub struct Amplify {
    name: String,
    target: String,
    factor: Amount,
}

impl Amplify {
    pub fn new(name: impl Into<String>, target: impl Into<String>, factor: Amount) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            factor,
        }
    }
}

impl Modifier for Amplify {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, _ctx: &EffectContext) -> Option<Modification> {
        None
    }

    fn apply_meta(&self, _ctx: &EffectContext, target: &MetaTarget<'_>) -> Option<Modification> {
        if target.name != self.target {
            return None;
        }
        let mut result = target.result.clone();
        result.mult = result
            .mult
            .map(|m| Amount::ONE.saturating_add((m - Amount::ONE).saturating_mul(self.factor)));
        result.add = result.add.map(|a| a.saturating_mul(self.factor));
        result.modifiers.push(format!("x{} {}", self.factor.normalize(), self.target));
        Some(result)
    }
}
