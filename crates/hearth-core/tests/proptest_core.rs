//! Property-based tests for the industry engine.
//!
//! Uses proptest to drive random action sequences through a farm economy,
//! then verify the structural invariants hold after every step.

use hearth_core::decimal::Amount;
use hearth_core::industry::IndustryManager;
use hearth_core::resource::{Resource, ResourceOptions};
use hearth_core::test_utils::*;
use proptest::prelude::*;
use std::time::Duration;

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone)]
enum Op {
    Build(u8, u64),
    Sell(u8, u64),
    Hire(u8, u64),
    Furlough(u8, u64),
    Grant(u8, i64),
    Theurgy(bool),
    Tick(u64),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3u8, 0..6u64).prop_map(|(b, n)| Op::Build(b, n)),
        (0..3u8, 0..6u64).prop_map(|(b, n)| Op::Sell(b, n)),
        (0..3u8, 0..6u64).prop_map(|(b, n)| Op::Hire(b, n)),
        (0..3u8, 0..6u64).prop_map(|(b, n)| Op::Furlough(b, n)),
        (0..4u8, -50..200i64).prop_map(|(r, v)| Op::Grant(r, v)),
        any::<bool>().prop_map(Op::Theurgy),
        (0..20_000u64).prop_map(Op::Tick),
    ]
}

fn apply(industry: &mut IndustryManager, ids: &FarmIds, op: &Op) {
    let buildings = [ids.farm_plot, ids.granary, ids.kitchen];
    let resources = [ids.crops, ids.food, ids.workers, ids.wood];
    match *op {
        Op::Build(b, n) => {
            industry.build(buildings[b as usize], Some(n));
        }
        Op::Sell(b, n) => {
            industry.sell(buildings[b as usize], Some(n));
        }
        Op::Hire(b, n) => {
            industry.hire(buildings[b as usize], Some(n));
        }
        Op::Furlough(b, n) => {
            industry.furlough(buildings[b as usize], Some(n));
        }
        Op::Grant(r, v) => industry.grant(resources[r as usize], Amount::from(v)),
        Op::Theurgy(plant) => {
            industry.perform_theurgy(if plant { ids.plant } else { ids.harvest });
        }
        Op::Tick(ms) => industry.tick(Duration::from_millis(ms)),
    }
}

fn assert_invariants(industry: &IndustryManager, ids: &FarmIds) {
    for r in [ids.crops, ids.food, ids.workers, ids.wood] {
        let value = industry.value(r);
        assert!(value >= Amount::ZERO, "negative stock");
        if let Some(cap) = industry.cap(r) {
            assert!(value <= cap, "stock above cap");
        }
    }
    for b in [ids.farm_plot, ids.granary, ids.kitchen] {
        let state = industry.building(b).unwrap();
        let def = industry.catalog().building(b).unwrap();
        assert!(state.workers <= state.worker_capacity(def), "workers above capacity");
    }
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #[test]
    fn invariants_hold_under_random_actions(ops in proptest::collection::vec(arb_op(), 1..60)) {
        let (mut industry, ids) = farm_industry();
        industry.unlock(ids.granary);
        for op in &ops {
            apply(&mut industry, &ids, op);
            assert_invariants(&industry, &ids);
        }
    }

    #[test]
    fn resource_clamps_after_any_update(
        start in 0..500i64,
        cap in 1..300i64,
        rate in -100..100i64,
        secs in 0..100i64,
        delta in -400..400i64,
    ) {
        let mut r = Resource::new(
            Amount::from(start),
            ResourceOptions { cap: Some(Amount::from(cap)), discovered: false },
        );
        r.set_growth("test", Amount::from(rate));
        r.update(Amount::from(secs));
        prop_assert!(r.value() >= Amount::ZERO && r.value() <= Amount::from(cap));
        r.add(Amount::from(delta));
        prop_assert!(r.value() >= Amount::ZERO && r.value() <= Amount::from(cap));
        r.subtract(Amount::from(delta));
        prop_assert!(r.value() >= Amount::ZERO && r.value() <= Amount::from(cap));
    }

    #[test]
    fn failed_build_changes_nothing(crops in 0..40i64, units in 1..10u64) {
        let (mut industry, ids) = farm_industry();
        industry.set_resource_value(ids.crops, Amount::from(crops));
        let before = industry.serialize();
        let built = industry.build(ids.farm_plot, Some(units));
        if Amount::from(crops) < Amount::from(units * 10) {
            prop_assert_eq!(built, 0);
            prop_assert_eq!(industry.serialize(), before);
        } else {
            prop_assert_eq!(built, units);
            prop_assert_eq!(industry.value(ids.crops), Amount::from(crops) - Amount::from(units * 10));
        }
    }

    #[test]
    fn tick_splitting_is_exact(food in 91..101i64, workers in 0..3u64, pieces in 1..40u32) {
        let total = Duration::from_secs(60);
        let (mut whole, ids) = farm_industry();
        let (mut split, _) = farm_industry();
        for industry in [&mut whole, &mut split] {
            industry.set_resource_value(ids.food, Amount::from(food));
            industry.grant(ids.crops, Amount::from(10));
            industry.build(ids.farm_plot, Some(2));
            industry.hire(ids.farm_plot, Some(workers));
        }
        whole.tick(total);
        let step = total / pieces;
        let remainder = total - step * pieces;
        for _ in 0..pieces {
            split.tick(step);
        }
        split.tick(remainder);
        prop_assert_eq!(whole.value(ids.crops), split.value(ids.crops));
        prop_assert_eq!(whole.value(ids.food), split.value(ids.food));
    }

    #[test]
    fn snapshot_round_trips(ops in proptest::collection::vec(arb_op(), 0..30)) {
        let (mut industry, ids) = farm_industry();
        for op in &ops {
            apply(&mut industry, &ids, op);
        }
        let snapshot = industry.serialize();
        let (mut restored, _) = farm_industry();
        restored.deserialize(&snapshot, None).unwrap();
        prop_assert_eq!(restored.serialize(), snapshot.clone());
        let bytes = industry.to_bytes().unwrap();
        let (mut from_bytes, _) = farm_industry();
        from_bytes.from_bytes(&bytes, None).unwrap();
        prop_assert_eq!(from_bytes.serialize(), snapshot);
    }
}
