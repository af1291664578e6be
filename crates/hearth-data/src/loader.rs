//! Resolution pipeline: reads a catalog file, resolves resource names and
//! builds a frozen [`Catalog`].
//!
//! Provides format detection (RON/JSON/TOML) and deserialization helpers on
//! top of the schema types.

use crate::schema::{BuildingData, CatalogData};
use hearth_core::building::BuildingType;
use hearth_core::catalog::{Catalog, CatalogBuilder, CatalogError};
use hearth_core::id::ResourceId;
use hearth_core::resource::ResourceOptions;
use log::debug;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A resource name could not be resolved.
    #[error("unresolved resource '{name}' in {owner}")]
    UnresolvedRef { owner: String, name: String },

    /// The resolved definitions failed catalog validation.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` according to `format`. `file` only labels errors.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    file: &Path,
) -> Result<T, DataLoadError> {
    let parse = |detail: String| DataLoadError::Parse {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Catalog loading
// ===========================================================================

/// Load a catalog file, detecting its format from the extension.
pub fn load_catalog(path: &Path) -> Result<Catalog, DataLoadError> {
    let data: CatalogData = deserialize_file(path)?;
    build_catalog(&data)
}

/// Load a catalog from text already in memory.
pub fn load_catalog_str(content: &str, format: Format) -> Result<Catalog, DataLoadError> {
    let data: CatalogData = deserialize_str(content, format, Path::new("<inline>"))?;
    build_catalog(&data)
}

/// Resolve names and build a validated catalog.
pub fn build_catalog(data: &CatalogData) -> Result<Catalog, DataLoadError> {
    let mut builder = CatalogBuilder::new();

    for resource in &data.resources {
        builder.register_resource(
            &resource.name,
            resource.initial,
            ResourceOptions {
                cap: resource.cap,
                discovered: resource.discovered,
            },
        );
    }

    for building in &data.buildings {
        let def = resolve_building(&builder, building)?;
        builder.register_building(def);
    }

    for theurgy in &data.theurgies {
        let changes = theurgy
            .changes
            .iter()
            .map(|(name, delta)| Ok((resolve(&builder, &theurgy.name, name)?, *delta)))
            .collect::<Result<Vec<_>, DataLoadError>>()?;
        builder.register_theurgy(&theurgy.name, changes);
    }

    if let Some(food) = &data.roles.food {
        let id = resolve(&builder, "roles", food)?;
        builder.set_food(id);
    }
    if let Some(workers) = &data.roles.workers {
        let id = resolve(&builder, "roles", workers)?;
        builder.set_workers(id);
    }

    let catalog = builder.build()?;
    debug!(
        "loaded catalog: {} resources, {} buildings",
        catalog.resource_count(),
        catalog.building_count()
    );
    Ok(catalog)
}

fn resolve(builder: &CatalogBuilder, owner: &str, name: &str) -> Result<ResourceId, DataLoadError> {
    builder
        .resource_id(name)
        .ok_or_else(|| DataLoadError::UnresolvedRef {
            owner: owner.to_string(),
            name: name.to_string(),
        })
}

fn resolve_building(
    builder: &CatalogBuilder,
    data: &BuildingData,
) -> Result<BuildingType, DataLoadError> {
    let mut def = BuildingType::new(&data.name).workers(data.workers_per_building);
    def.unlocked = data.unlocked;
    for (name, effects) in &data.effects {
        def.effects
            .insert(resolve(builder, &data.name, name)?, effects.clone());
    }
    for (name, cost) in &data.build_cost {
        def = def.cost(resolve(builder, &data.name, name)?, *cost);
    }
    for (name, reward) in &data.sell_reward {
        def = def.reward(resolve(builder, &data.name, name)?, *reward);
    }
    for (name, cap) in &data.cap_increase {
        def = def.cap_increase(resolve(builder, &data.name, name)?, *cap);
    }
    Ok(def)
}
