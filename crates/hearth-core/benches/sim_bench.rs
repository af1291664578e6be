//! Criterion benchmarks for the industry engine.
//!
//! Two benchmark groups:
//! - `tick`: a steady farm economy with clean rate caches
//! - `recalculate`: a full effect sweep forced by an upgrade change each iteration

use criterion::{criterion_group, criterion_main, Criterion};
use hearth_core::decimal::Amount;
use hearth_core::effect::EffectTag;
use hearth_core::industry::IndustryManager;
use hearth_core::test_utils::*;
use hearth_core::upgrade::{StatBonus, StatSource};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::hint::black_box;
use std::rc::Rc;
use std::time::Duration;

fn busy_farm() -> IndustryManager {
    let (mut industry, ids) = farm_industry();
    industry.unlock(ids.granary);
    industry.grant(ids.crops, Amount::from(1_000));
    industry.grant(ids.wood, Amount::from(40));
    industry.grant(ids.workers, Amount::from(50));
    industry.build(ids.farm_plot, Some(20));
    industry.build(ids.kitchen, Some(10));
    industry.build(ids.granary, Some(2));
    industry.hire(ids.farm_plot, Some(40));
    industry.grant(ids.food, Amount::from(200));

    let mut stats = BTreeMap::new();
    stats.insert("wisdom".to_string(), Amount::from(12));
    let source: Rc<dyn StatSource> = Rc::new(RefCell::new(stats));
    for i in 0..8 {
        industry.register_upgrade(
            Box::new(StatBonus::new(
                format!("wisdom-{i}"),
                "wisdom",
                Amount::new(1, 2),
                vec![EffectTag::Prod],
                Rc::clone(&source),
            )),
            i,
        );
    }
    industry
}

fn bench_tick(c: &mut Criterion) {
    let mut industry = busy_farm();
    c.bench_function("tick", |b| {
        b.iter(|| industry.tick(black_box(Duration::from_millis(16))))
    });
}

fn bench_recalculate(c: &mut Criterion) {
    let mut industry = busy_farm();
    c.bench_function("recalculate", |b| {
        b.iter(|| {
            industry.invalidate_rates();
            black_box(industry.net_rate(black_box(hearth_core::id::ResourceId(0))))
        })
    });
}

criterion_group!(benches, bench_tick, bench_recalculate);
criterion_main!(benches);
