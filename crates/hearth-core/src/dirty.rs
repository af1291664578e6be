use crate::id::BuildingTypeId;
use std::collections::BTreeSet;

/// Tracks which building types need their rate contributions recomputed,
/// and guards against a recalculation starting while another is in flight.
///
/// Upgrade changes and restores can touch every effect line, so they force a
/// full sweep; count or worker changes only re-sweep the marked types.
#[derive(Debug, Clone)]
pub struct DirtyTracker {
    dirty_buildings: BTreeSet<BuildingTypeId>,
    upgrades_dirty: bool,
    full: bool,
    recalculating: bool,
}

impl Default for DirtyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DirtyTracker {
    /// A fresh tracker needs a full sweep: nothing has been computed yet.
    pub fn new() -> Self {
        Self {
            dirty_buildings: BTreeSet::new(),
            upgrades_dirty: false,
            full: true,
            recalculating: false,
        }
    }

    /// A building's count or worker assignment changed.
    pub fn mark_building(&mut self, id: BuildingTypeId) {
        self.dirty_buildings.insert(id);
    }

    /// An upgrade was registered or unregistered, or a stat it reads changed.
    pub fn mark_upgrades(&mut self) {
        self.upgrades_dirty = true;
    }

    /// Everything changed (state restored from a save).
    pub fn mark_all(&mut self) {
        self.full = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.full || self.upgrades_dirty || !self.dirty_buildings.is_empty()
    }

    /// Whether every building type must be re-swept.
    pub fn needs_full_sweep(&self) -> bool {
        self.full || self.upgrades_dirty
    }

    pub fn is_building_dirty(&self, id: BuildingTypeId) -> bool {
        self.dirty_buildings.contains(&id)
    }

    /// Claim the recalculation. Returns `false` when the cache is clean or a
    /// recalculation is already running; the caller must then skip the work.
    pub fn begin_recalculation(&mut self) -> bool {
        if !self.is_dirty() || self.recalculating {
            return false;
        }
        self.recalculating = true;
        true
    }

    /// Release the recalculation claim and mark everything clean.
    pub fn finish_recalculation(&mut self) {
        self.dirty_buildings.clear();
        self.upgrades_dirty = false;
        self.full = false;
        self.recalculating = false;
    }
}
