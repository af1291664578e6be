//! Static content: resources, building types and theurgies.
//!
//! Built in three phases like any frozen registry: register definitions on a
//! [`CatalogBuilder`], adjust them by name, then [`CatalogBuilder::build`]
//! validates every cross-reference and produces an immutable [`Catalog`].

use crate::building::BuildingType;
use crate::decimal::Amount;
use crate::id::{BuildingTypeId, ResourceId, TheurgyId};
use crate::resource::ResourceOptions;
use std::collections::HashMap;

/// A resource definition: name and starting state.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDef {
    pub name: String,
    pub initial: Amount,
    pub options: ResourceOptions,
}

/// A manual player action expressed as signed resource deltas.
#[derive(Debug, Clone, PartialEq)]
pub struct TheurgyDef {
    pub name: String,
    pub changes: Vec<(ResourceId, Amount)>,
}

/// Resources with a special meaning to the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Roles {
    /// Drives the strike condition.
    pub food: Option<ResourceId>,
    /// Its stock is the global worker pool.
    pub workers: Option<ResourceId>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },
    #[error("{owner} references unknown resource {resource:?}")]
    InvalidResourceRef { owner: String, resource: ResourceId },
    #[error("{owner} has a negative amount for resource {resource:?}")]
    NegativeAmount { owner: String, resource: ResourceId },
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct CatalogBuilder {
    resources: Vec<ResourceDef>,
    resource_ids: HashMap<String, ResourceId>,
    buildings: Vec<BuildingType>,
    building_ids: HashMap<String, BuildingTypeId>,
    theurgies: Vec<TheurgyDef>,
    theurgy_ids: HashMap<String, TheurgyId>,
    roles: Roles,
    duplicates: Vec<(&'static str, String)>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register a resource. Returns its ID.
    pub fn register_resource(
        &mut self,
        name: &str,
        initial: Amount,
        options: ResourceOptions,
    ) -> ResourceId {
        let id = ResourceId(self.resources.len() as u32);
        self.resources.push(ResourceDef {
            name: name.to_string(),
            initial,
            options,
        });
        if self.resource_ids.insert(name.to_string(), id).is_some() {
            self.duplicates.push(("resource", name.to_string()));
        }
        id
    }

    /// Phase 1: Register a building type. Returns its ID.
    pub fn register_building(&mut self, def: BuildingType) -> BuildingTypeId {
        let id = BuildingTypeId(self.buildings.len() as u32);
        if self.building_ids.insert(def.name.clone(), id).is_some() {
            self.duplicates.push(("building", def.name.clone()));
        }
        self.buildings.push(def);
        id
    }

    /// Phase 1: Register a theurgy. Returns its ID.
    pub fn register_theurgy(&mut self, name: &str, changes: Vec<(ResourceId, Amount)>) -> TheurgyId {
        let id = TheurgyId(self.theurgies.len() as u32);
        self.theurgies.push(TheurgyDef {
            name: name.to_string(),
            changes,
        });
        if self.theurgy_ids.insert(name.to_string(), id).is_some() {
            self.duplicates.push(("theurgy", name.to_string()));
        }
        id
    }

    pub fn set_food(&mut self, id: ResourceId) {
        self.roles.food = Some(id);
    }

    pub fn set_workers(&mut self, id: ResourceId) {
        self.roles.workers = Some(id);
    }

    /// Phase 2: Mutate an existing building type by name.
    pub fn mutate_building<F>(&mut self, name: &str, f: F) -> Result<(), CatalogError>
    where
        F: FnOnce(&mut BuildingType),
    {
        let id = self
            .building_ids
            .get(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        f(&mut self.buildings[id.index()]);
        Ok(())
    }

    pub fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.resource_ids.get(name).copied()
    }

    pub fn building_id(&self, name: &str) -> Option<BuildingTypeId> {
        self.building_ids.get(name).copied()
    }

    /// Phase 3: Validate and freeze.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        if let Some((kind, name)) = self.duplicates.into_iter().next() {
            return Err(CatalogError::DuplicateName { kind, name });
        }

        let known = |id: ResourceId| id.index() < self.resources.len();

        for def in &self.buildings {
            for resource in def.referenced_resources() {
                if !known(resource) {
                    return Err(CatalogError::InvalidResourceRef {
                        owner: def.name.clone(),
                        resource,
                    });
                }
            }
            let tables = def
                .build_cost
                .iter()
                .chain(def.sell_reward.iter())
                .chain(def.cap_increase.iter());
            for (&resource, amount) in tables {
                if amount.is_sign_negative() {
                    return Err(CatalogError::NegativeAmount {
                        owner: def.name.clone(),
                        resource,
                    });
                }
            }
            for (&resource, effects) in &def.effects {
                let magnitudes = [
                    effects.base.gain,
                    effects.base.drain,
                    effects.worker.gain,
                    effects.worker.drain,
                ];
                if magnitudes.iter().flatten().any(|v| v.is_sign_negative()) {
                    return Err(CatalogError::NegativeAmount {
                        owner: def.name.clone(),
                        resource,
                    });
                }
            }
        }

        for theurgy in &self.theurgies {
            for &(resource, _) in &theurgy.changes {
                if !known(resource) {
                    return Err(CatalogError::InvalidResourceRef {
                        owner: theurgy.name.clone(),
                        resource,
                    });
                }
            }
        }

        for resource in [self.roles.food, self.roles.workers].into_iter().flatten() {
            if !known(resource) {
                return Err(CatalogError::InvalidResourceRef {
                    owner: "roles".to_string(),
                    resource,
                });
            }
        }

        Ok(Catalog {
            resources: self.resources,
            resource_ids: self.resource_ids,
            buildings: self.buildings,
            building_ids: self.building_ids,
            theurgies: self.theurgies,
            theurgy_ids: self.theurgy_ids,
            roles: self.roles,
        })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable catalog. Frozen after build().
#[derive(Debug, Clone)]
pub struct Catalog {
    resources: Vec<ResourceDef>,
    resource_ids: HashMap<String, ResourceId>,
    buildings: Vec<BuildingType>,
    building_ids: HashMap<String, BuildingTypeId>,
    theurgies: Vec<TheurgyDef>,
    theurgy_ids: HashMap<String, TheurgyId>,
    roles: Roles,
}

impl Catalog {
    pub fn resource(&self, id: ResourceId) -> Option<&ResourceDef> {
        self.resources.get(id.index())
    }

    pub fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.resource_ids.get(name).copied()
    }

    pub fn resource_name(&self, id: ResourceId) -> Option<&str> {
        self.resource(id).map(|d| d.name.as_str())
    }

    pub fn resources(&self) -> impl Iterator<Item = (ResourceId, &ResourceDef)> {
        self.resources
            .iter()
            .enumerate()
            .map(|(i, d)| (ResourceId(i as u32), d))
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn building(&self, id: BuildingTypeId) -> Option<&BuildingType> {
        self.buildings.get(id.index())
    }

    pub fn building_id(&self, name: &str) -> Option<BuildingTypeId> {
        self.building_ids.get(name).copied()
    }

    pub fn buildings(&self) -> impl Iterator<Item = (BuildingTypeId, &BuildingType)> {
        self.buildings
            .iter()
            .enumerate()
            .map(|(i, d)| (BuildingTypeId(i as u32), d))
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    pub fn theurgy(&self, id: TheurgyId) -> Option<&TheurgyDef> {
        self.theurgies.get(id.0 as usize)
    }

    pub fn theurgy_id(&self, name: &str) -> Option<TheurgyId> {
        self.theurgy_ids.get(name).copied()
    }

    pub fn theurgies(&self) -> impl Iterator<Item = (TheurgyId, &TheurgyDef)> {
        self.theurgies
            .iter()
            .enumerate()
            .map(|(i, d)| (TheurgyId(i as u32), d))
    }

    pub fn roles(&self) -> Roles {
        self.roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn register_and_lookup() {
        let mut builder = CatalogBuilder::new();
        let crops = builder.register_resource("crops", dec!(10), ResourceOptions::default());
        let farm = builder.register_building(BuildingType::new("farmPlot").cost(crops, dec!(10)));
        let plant = builder.register_theurgy("plant", vec![(crops, dec!(1))]);
        let catalog = builder.build().unwrap();

        assert_eq!(catalog.resource_id("crops"), Some(crops));
        assert_eq!(catalog.resource_name(crops), Some("crops"));
        assert_eq!(catalog.building_id("farmPlot"), Some(farm));
        assert_eq!(catalog.theurgy_id("plant"), Some(plant));
        assert_eq!(catalog.resource_count(), 1);
        assert_eq!(catalog.building_count(), 1);
        assert!(catalog.building(BuildingTypeId(7)).is_none());
    }

    #[test]
    fn mutate_building_by_name() {
        let mut builder = CatalogBuilder::new();
        let crops = builder.register_resource("crops", dec!(0), ResourceOptions::default());
        builder.register_building(BuildingType::new("farmPlot"));
        builder
            .mutate_building("farmPlot", |b| b.workers_per_building = 4)
            .unwrap();
        assert_eq!(
            builder.mutate_building("nope", |_| {}),
            Err(CatalogError::NotFound("nope".to_string()))
        );
        let catalog = builder.build().unwrap();
        let farm = catalog.building_id("farmPlot").unwrap();
        assert_eq!(catalog.building(farm).unwrap().workers_per_building, 4);
        assert_eq!(catalog.resource(crops).unwrap().initial, dec!(0));
    }

    #[test]
    fn build_rejects_unknown_resource() {
        let mut builder = CatalogBuilder::new();
        builder.register_building(BuildingType::new("ghost").cost(ResourceId(3), dec!(1)));
        assert!(matches!(
            builder.build(),
            Err(CatalogError::InvalidResourceRef { .. })
        ));
    }

    #[test]
    fn build_rejects_duplicates() {
        let mut builder = CatalogBuilder::new();
        builder.register_resource("food", dec!(0), ResourceOptions::default());
        builder.register_resource("food", dec!(0), ResourceOptions::default());
        assert_eq!(
            builder.build().unwrap_err(),
            CatalogError::DuplicateName {
                kind: "resource",
                name: "food".to_string()
            }
        );
    }

    #[test]
    fn build_rejects_negative_magnitudes() {
        let mut builder = CatalogBuilder::new();
        let food = builder.register_resource("food", dec!(0), ResourceOptions::default());
        builder.register_building(BuildingType::new("bad").base_gain(food, dec!(-1)));
        assert!(matches!(
            builder.build(),
            Err(CatalogError::NegativeAmount { .. })
        ));
    }

    #[test]
    fn roles_must_exist() {
        let mut builder = CatalogBuilder::new();
        builder.set_food(ResourceId(0));
        assert!(builder.build().is_err());
    }
}
