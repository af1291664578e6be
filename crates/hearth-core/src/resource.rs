//! A single stock variable: value, optional cap, discovery flag and a set of
//! named growth-rate contributors.
//!
//! Every mutation ends with a clamp to `[0, effective_cap]`. Negative results
//! become zero and production past the cap is lost, never banked.

use crate::decimal::Amount;
use std::collections::BTreeMap;

/// Name of the growth contributor fed by the rate aggregator.
pub const INDUSTRY_GROWTH: &str = "industry";

/// Construction options for a [`Resource`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceOptions {
    /// Static ceiling. `None` means unbounded.
    pub cap: Option<Amount>,
    /// Whether the resource starts visible to the player.
    pub discovered: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    value: Amount,
    cap: Option<Amount>,
    /// Cap computed from buildings; overrides the static cap when present.
    dynamic_cap: Option<Amount>,
    is_discovered: bool,
    /// Net per-second rate applied by the last `update`, for display.
    rate: Amount,
    growth: BTreeMap<String, Amount>,
}

impl Resource {
    pub fn new(value: Amount, options: ResourceOptions) -> Self {
        let mut resource = Self {
            value,
            cap: options.cap,
            dynamic_cap: None,
            is_discovered: options.discovered,
            rate: Amount::ZERO,
            growth: BTreeMap::new(),
        };
        resource.clamp();
        resource
    }

    pub fn value(&self) -> Amount {
        self.value
    }

    /// The static cap, ignoring building contributions.
    pub fn cap(&self) -> Option<Amount> {
        self.cap
    }

    /// The dynamic cap if one is set, else the static cap.
    pub fn effective_cap(&self) -> Option<Amount> {
        self.dynamic_cap.or(self.cap)
    }

    pub fn is_discovered(&self) -> bool {
        self.is_discovered
    }

    pub fn discover(&mut self) {
        self.is_discovered = true;
    }

    pub fn rate(&self) -> Amount {
        self.rate
    }

    pub fn set_cap(&mut self, cap: Option<Amount>) {
        self.cap = cap;
        self.clamp();
    }

    pub fn set_dynamic_cap(&mut self, cap: Option<Amount>) {
        self.dynamic_cap = cap;
        self.clamp();
    }

    /// Overwrite the stock outright (used when restoring a save).
    pub fn set_value(&mut self, value: Amount) {
        self.value = value;
        self.clamp();
    }

    /// Register or replace a named growth contributor.
    pub fn set_growth(&mut self, name: &str, rate: Amount) {
        match self.growth.get_mut(name) {
            Some(existing) => *existing = rate,
            None => {
                self.growth.insert(name.to_string(), rate);
            }
        }
    }

    pub fn remove_growth(&mut self, name: &str) -> Option<Amount> {
        self.growth.remove(name)
    }

    pub fn growth(&self, name: &str) -> Option<Amount> {
        self.growth.get(name).copied()
    }

    /// Sum of every registered growth contributor.
    pub fn net_growth_rate(&self) -> Amount {
        self.growth
            .values()
            .fold(Amount::ZERO, |acc, r| acc.saturating_add(*r))
    }

    /// Integrate the net growth rate over `dt` seconds.
    pub fn update(&mut self, dt: Amount) {
        let net = self.net_growth_rate();
        self.rate = net;
        self.value = self.value.saturating_add(net.saturating_mul(dt));
        self.clamp();
    }

    pub fn add(&mut self, delta: Amount) {
        self.value = self.value.saturating_add(delta);
        self.clamp();
    }

    pub fn subtract(&mut self, delta: Amount) {
        self.value = self.value.saturating_sub(delta);
        self.clamp();
    }

    /// Whether `amount` can be taken out without hitting zero.
    pub fn covers(&self, amount: Amount) -> bool {
        self.value >= amount
    }

    fn clamp(&mut self) {
        if self.value.is_sign_negative() {
            self.value = Amount::ZERO;
        }
        if let Some(cap) = self.effective_cap() {
            let cap = cap.max(Amount::ZERO);
            if self.value > cap {
                self.value = cap;
            }
        }
        if self.value > Amount::ZERO {
            self.is_discovered = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn capped(value: Amount, cap: Amount) -> Resource {
        Resource::new(
            value,
            ResourceOptions {
                cap: Some(cap),
                discovered: false,
            },
        )
    }

    #[test]
    fn new_clamps_initial_value() {
        let r = capped(dec!(150), dec!(100));
        assert_eq!(r.value(), dec!(100));
        let r = Resource::new(dec!(-3), ResourceOptions::default());
        assert_eq!(r.value(), Amount::ZERO);
    }

    #[test]
    fn update_integrates_growth() {
        let mut r = Resource::new(dec!(1), ResourceOptions::default());
        r.set_growth(INDUSTRY_GROWTH, dec!(0.5));
        r.update(dec!(4));
        assert_eq!(r.value(), dec!(3));
        assert_eq!(r.rate(), dec!(0.5));
    }

    #[test]
    fn update_sums_contributors() {
        let mut r = Resource::new(dec!(0), ResourceOptions::default());
        r.set_growth("a", dec!(2));
        r.set_growth("b", dec!(-0.5));
        assert_eq!(r.net_growth_rate(), dec!(1.5));
        r.set_growth("a", dec!(1));
        assert_eq!(r.net_growth_rate(), dec!(0.5));
        assert_eq!(r.remove_growth("b"), Some(dec!(-0.5)));
        assert_eq!(r.net_growth_rate(), dec!(1));
    }

    #[test]
    fn update_clamps_to_cap_and_zero() {
        let mut r = capped(dec!(90), dec!(100));
        r.set_growth(INDUSTRY_GROWTH, dec!(5));
        r.update(dec!(10));
        assert_eq!(r.value(), dec!(100));

        r.set_growth(INDUSTRY_GROWTH, dec!(-50));
        r.update(dec!(10));
        assert_eq!(r.value(), Amount::ZERO);
    }

    #[test]
    fn add_and_subtract_clamp() {
        let mut r = capped(dec!(10), dec!(20));
        r.add(dec!(15));
        assert_eq!(r.value(), dec!(20));
        r.subtract(dec!(25));
        assert_eq!(r.value(), Amount::ZERO);
    }

    #[test]
    fn dynamic_cap_overrides_static_cap() {
        let mut r = capped(dec!(80), dec!(100));
        r.set_dynamic_cap(Some(dec!(150)));
        assert_eq!(r.effective_cap(), Some(dec!(150)));
        r.add(dec!(60));
        assert_eq!(r.value(), dec!(140));

        r.set_dynamic_cap(Some(dec!(120)));
        assert_eq!(r.value(), dec!(120));

        r.set_dynamic_cap(None);
        assert_eq!(r.value(), dec!(100));
    }

    #[test]
    fn positive_value_discovers() {
        let mut r = Resource::new(Amount::ZERO, ResourceOptions::default());
        assert!(!r.is_discovered());
        r.add(dec!(1));
        assert!(r.is_discovered());
    }

    #[test]
    fn covers_checks_stock() {
        let r = Resource::new(dec!(5), ResourceOptions::default());
        assert!(r.covers(dec!(5)));
        assert!(!r.covers(dec!(5.01)));
    }
}
