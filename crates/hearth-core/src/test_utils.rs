//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::building::BuildingType;
use crate::catalog::{Catalog, CatalogBuilder};
use crate::decimal::{amount, Amount};
use crate::id::{BuildingTypeId, ResourceId, TheurgyId};
use crate::industry::IndustryManager;
use crate::resource::ResourceOptions;

/// IDs of everything in [`farm_catalog`].
#[derive(Debug, Clone, Copy)]
pub struct FarmIds {
    pub crops: ResourceId,
    pub food: ResourceId,
    pub workers: ResourceId,
    pub wood: ResourceId,
    pub farm_plot: BuildingTypeId,
    pub granary: BuildingTypeId,
    pub kitchen: BuildingTypeId,
    pub plant: TheurgyId,
    pub harvest: TheurgyId,
}

fn capped(cap: i64) -> ResourceOptions {
    ResourceOptions {
        cap: Some(Amount::from(cap)),
        discovered: false,
    }
}

/// A small farming economy:
///
/// - crops 10 (uncapped, discovered), food 0 (cap 100), workers 3, wood 0 (cap 50)
/// - `farmPlot`: 2 workers each, costs 10 crops, refunds 5; each worker
///   grows 1 crop/s and eats 0.5 food/s
/// - `granary`: locked, costs 20 wood, +50 food cap
/// - `kitchen`: costs 5 crops, turns 1 crop/s into 1 food/s
/// - theurgies `plant` (+1 crops) and `harvest` (-1 crops, +1 food)
pub fn farm_catalog() -> (Catalog, FarmIds) {
    let mut b = CatalogBuilder::new();
    let crops = b.register_resource(
        "crops",
        Amount::from(10),
        ResourceOptions {
            cap: None,
            discovered: true,
        },
    );
    let food = b.register_resource("food", Amount::ZERO, capped(100));
    let workers = b.register_resource("workers", Amount::from(3), ResourceOptions::default());
    let wood = b.register_resource("wood", Amount::ZERO, capped(50));
    b.set_food(food);
    b.set_workers(workers);

    let farm_plot = b.register_building(
        BuildingType::new("farmPlot")
            .workers(2)
            .cost(crops, Amount::from(10))
            .reward(crops, Amount::from(5))
            .worker_gain(crops, Amount::ONE)
            .worker_drain(food, amount(0.5))
            .unlocked(),
    );
    let granary = b.register_building(
        BuildingType::new("granary")
            .cost(wood, Amount::from(20))
            .cap_increase(food, Amount::from(50)),
    );
    let kitchen = b.register_building(
        BuildingType::new("kitchen")
            .cost(crops, Amount::from(5))
            .base_drain(crops, Amount::ONE)
            .base_gain(food, Amount::ONE)
            .unlocked(),
    );

    let plant = b.register_theurgy("plant", vec![(crops, Amount::ONE)]);
    let harvest = b.register_theurgy(
        "harvest",
        vec![(crops, Amount::NEGATIVE_ONE), (food, Amount::ONE)],
    );

    let ids = FarmIds {
        crops,
        food,
        workers,
        wood,
        farm_plot,
        granary,
        kitchen,
        plant,
        harvest,
    };
    match b.build() {
        Ok(catalog) => (catalog, ids),
        Err(e) => panic!("farm catalog is invalid: {e}"),
    }
}

/// A fresh [`IndustryManager`] over [`farm_catalog`].
pub fn farm_industry() -> (IndustryManager, FarmIds) {
    let (catalog, ids) = farm_catalog();
    (IndustryManager::new(catalog), ids)
}
