//! Versioned save data for the industry.
//!
//! [`IndustrySnapshot`] is the plain-data form: named fields, decimals as
//! strings, resources and buildings keyed by catalog name. It round-trips
//! through JSON via `serde_json`, or through `bitcode` with a magic/version
//! header for compact binary saves.
//!
//! Restoring is all-or-nothing: every record is parsed and staged before any
//! live state is replaced. Entries naming resources or buildings the current
//! catalog does not know are skipped with a warning.

use crate::building::BuildingState;
use crate::config::IndustryConfigs;
use crate::decimal::Amount;
use crate::industry::IndustryManager;
use crate::resource::{Resource, ResourceOptions};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a binary industry save.
pub const SNAPSHOT_MAGIC: u32 = 0x4845_0001;

/// Current format version. Increment when breaking the save format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("data too short for snapshot header")]
    TooShort,
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("json decoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid amount '{value}' for {field}")]
    InvalidAmount { field: String, value: String },
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    /// Decimal stock as a string, preserving precision.
    pub value: String,
    #[serde(default)]
    pub cap: Option<String>,
    #[serde(default)]
    pub is_discovered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndustrySnapshot {
    pub version: u32,
    #[serde(default)]
    pub access: BTreeMap<String, bool>,
    pub resources: BTreeMap<String, ResourceRecord>,
    #[serde(default)]
    pub workers_on_strike: bool,
    #[serde(default)]
    pub configs: IndustryConfigs,
    pub buildings: BTreeMap<String, BuildingState>,
}

/// Header prepended to every binary save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
}

impl SnapshotHeader {
    pub fn new() -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        Ok(())
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct BinarySave {
    header: SnapshotHeader,
    snapshot: IndustrySnapshot,
}

impl IndustrySnapshot {
    pub fn to_json(&self) -> Result<String, SerializeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, DeserializeError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        let save = BinarySave {
            header: SnapshotHeader::new(),
            snapshot: self.clone(),
        };
        bitcode::serialize(&save).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DeserializeError> {
        if data.is_empty() {
            return Err(DeserializeError::TooShort);
        }
        let save: BinarySave =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        save.header.validate()?;
        Ok(save.snapshot)
    }
}

fn parse_amount(field: &str, value: &str) -> Result<Amount, DeserializeError> {
    Amount::from_str(value).map_err(|_| DeserializeError::InvalidAmount {
        field: field.to_string(),
        value: value.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Manager integration
// ---------------------------------------------------------------------------

impl IndustryManager {
    pub fn serialize(&self) -> IndustrySnapshot {
        let resources = self
            .catalog
            .resources()
            .filter_map(|(id, def)| {
                let r = self.resources.get(id.index())?;
                Some((
                    def.name.clone(),
                    ResourceRecord {
                        value: r.value().to_string(),
                        cap: r.cap().map(|c| c.to_string()),
                        is_discovered: r.is_discovered(),
                    },
                ))
            })
            .collect();
        let buildings = self
            .catalog
            .buildings()
            .filter_map(|(id, def)| {
                let state = self.buildings.get(id.index())?;
                Some((def.name.clone(), state.clone()))
            })
            .collect();
        IndustrySnapshot {
            version: FORMAT_VERSION,
            access: self.access.clone(),
            resources,
            workers_on_strike: self.workers_on_strike,
            configs: self.configs.clone(),
            buildings,
        }
    }

    pub fn to_json(&self) -> Result<String, SerializeError> {
        self.serialize().to_json()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        self.serialize().to_bytes()
    }

    /// Restore from a snapshot, catching up on time since `saved_at` if
    /// offline progress is enabled. Returns the simulated offline time.
    pub fn deserialize(
        &mut self,
        snapshot: &IndustrySnapshot,
        saved_at: Option<SystemTime>,
    ) -> Result<Duration, DeserializeError> {
        self.deserialize_at(snapshot, saved_at, SystemTime::now())
    }

    /// Like [`deserialize`](Self::deserialize) with an explicit current time.
    pub fn deserialize_at(
        &mut self,
        snapshot: &IndustrySnapshot,
        saved_at: Option<SystemTime>,
        now: SystemTime,
    ) -> Result<Duration, DeserializeError> {
        if snapshot.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(snapshot.version));
        }

        // Resources not in the save keep their catalog defaults.
        let mut resources: Vec<Resource> = self
            .catalog
            .resources()
            .map(|(_, def)| Resource::new(Amount::ZERO, def.options.clone()))
            .collect();
        let mut values: Vec<Amount> = self.catalog.resources().map(|(_, def)| def.initial).collect();

        for (name, record) in &snapshot.resources {
            let Some(id) = self.catalog.resource_id(name) else {
                warn!("save references unknown resource '{name}', skipping");
                continue;
            };
            let value = parse_amount(name, &record.value)?;
            let cap = record
                .cap
                .as_deref()
                .map(|c| parse_amount(name, c))
                .transpose()?;
            resources[id.index()] = Resource::new(
                Amount::ZERO,
                ResourceOptions {
                    cap,
                    discovered: record.is_discovered,
                },
            );
            values[id.index()] = value;
        }

        let mut buildings: Vec<BuildingState> = self
            .catalog
            .buildings()
            .map(|(_, def)| BuildingState::for_type(def))
            .collect();
        for (name, record) in &snapshot.buildings {
            let Some(id) = self.catalog.building_id(name) else {
                warn!("save references unknown building '{name}', skipping");
                continue;
            };
            let Some(def) = self.catalog.building(id) else {
                continue;
            };
            let mut state = record.clone();
            state.clamp_workers(def);
            buildings[id.index()] = state;
        }

        self.install(
            resources,
            values,
            buildings,
            snapshot.access.clone(),
            snapshot.configs.clone(),
            snapshot.workers_on_strike,
        );

        let offline = match saved_at {
            Some(saved_at) if self.settings.offline_progress => now
                .duration_since(saved_at)
                .unwrap_or(Duration::ZERO)
                .min(self.settings.max_offline),
            _ => Duration::ZERO,
        };
        if offline > Duration::ZERO {
            info!("catching up {:.0}s of offline progress", offline.as_secs_f64());
            self.tick(offline);
        } else {
            self.notify();
        }
        Ok(offline)
    }

    pub fn from_json(&mut self, text: &str, saved_at: Option<SystemTime>) -> Result<Duration, DeserializeError> {
        let snapshot = IndustrySnapshot::from_json(text)?;
        self.deserialize(&snapshot, saved_at)
    }

    pub fn from_bytes(&mut self, data: &[u8], saved_at: Option<SystemTime>) -> Result<Duration, DeserializeError> {
        let snapshot = IndustrySnapshot::from_bytes(data)?;
        self.deserialize(&snapshot, saved_at)
    }
}
