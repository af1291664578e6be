//! Hearth Core -- the resource and production engine for an idle settlement
//! game.
//!
//! Buildings and their workers produce and consume resources. Every derived
//! quantity (rates, costs, refunds, cap increases) flows through one effect
//! pipeline that folds registered upgrades over it in priority order, so a
//! modifier such as "+1% production per point of wisdom" behaves the same
//! everywhere and every number can explain itself.
//!
//! # Tick Pipeline
//!
//! Each call to [`industry::IndustryManager::tick`]:
//!
//! 1. **Recalculate** -- if buildings, workers or upgrades changed, resolve
//!    every effect line again and cache per-resource flows.
//! 2. **Throttle** -- fold worker scarcity (and the food strike) into final
//!    net rates.
//! 3. **Integrate** -- each [`resource::Resource`] advances by its net rate
//!    and clamps to `[0, cap]`.
//! 4. **Broadcast** -- subscribers receive a fresh [`query::IndustryData`].
//!
//! # Key Types
//!
//! - [`industry::IndustryManager`] -- Owns all state; action and query API.
//! - [`catalog::Catalog`] -- Frozen resource, building and theurgy definitions.
//! - [`effect::compute_effect`] -- The single effect resolution path.
//! - [`upgrade::UpgradeRegistry`] -- Priority-ordered modifiers.
//! - [`rates::RateAggregator`] -- Cached per-resource rate sheet.
//! - [`scaler::worker_scale`] -- Worker scarcity factor and bottlenecks.
//! - [`planner::ActionPlanner`] -- Feasible build/sell/hire/furlough amounts.
//! - [`serialize`] -- Versioned save data (JSON and bitcode).

pub mod building;
pub mod catalog;
pub mod config;
pub mod decimal;
pub mod dirty;
pub mod effect;
pub mod event;
pub mod id;
pub mod industry;
pub mod planner;
pub mod query;
pub mod rates;
pub mod resource;
pub mod scaler;
pub mod serialize;
pub mod upgrade;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
