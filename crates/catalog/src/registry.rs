use std::collections::BTreeMap;

use grove_core::{Cost, FamilyId, Resources, MS_PER_SEC};

/// Immutable definition of one `(family, level)` creature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatureLevelDef {
    /// Family this level belongs to.
    pub family: FamilyId,
    /// Level, starting at 1.
    pub level: u32,
    /// Display name.
    pub name: String,
    /// Resources yielded per tick.
    pub production: Resources,
    /// Seconds per production tick.
    pub interval_sec: u64,
    /// Shop price; `None` when the level cannot be bought directly.
    pub unlock_cost: Option<Cost>,
}

impl CreatureLevelDef {
    /// Tick length in milliseconds.
    pub fn interval_ms(&self) -> u64 {
        self.interval_sec.saturating_mul(MS_PER_SEC)
    }
}

/// Lookup table of creature definitions keyed by `(family, level)`.
#[derive(Debug, Clone, Default)]
pub struct CreatureRegistry {
    defs: BTreeMap<(FamilyId, u32), CreatureLevelDef>,
}

impl CreatureRegistry {
    /// Build from definitions; later duplicates are rejected by the loader
    /// before this is called.
    pub fn new(defs: Vec<CreatureLevelDef>) -> Self {
        let defs = defs
            .into_iter()
            .map(|def| ((def.family.clone(), def.level), def))
            .collect();
        Self { defs }
    }

    /// Definition for a family and level.
    pub fn get(&self, family: &FamilyId, level: u32) -> Option<&CreatureLevelDef> {
        self.defs.get(&(family.clone(), level))
    }

    /// Highest defined level of a family.
    pub fn max_level(&self, family: &FamilyId) -> Option<u32> {
        self.defs
            .keys()
            .filter(|(f, _)| f == family)
            .map(|(_, level)| *level)
            .max()
    }

    /// Known families in stable order.
    pub fn families(&self) -> Vec<&FamilyId> {
        let mut out: Vec<&FamilyId> = self.defs.keys().map(|(f, _)| f).collect();
        out.dedup();
        out
    }

    /// Whether a family has any definitions.
    pub fn contains_family(&self, family: &FamilyId) -> bool {
        self.defs.keys().any(|(f, _)| f == family)
    }

    /// Iterate all definitions in `(family, level)` order.
    pub fn iter(&self) -> impl Iterator<Item = &CreatureLevelDef> {
        self.defs.values()
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
