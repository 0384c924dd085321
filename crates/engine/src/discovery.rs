//! Bestiary of every `(family, level)` ever obtained.

use grove_core::{FamilyId, Millis};
use serde::{Deserialize, Serialize};

/// One discovered creature kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryEntry {
    /// Family.
    pub family: FamilyId,
    /// Level.
    pub level: u32,
    /// First encounter.
    pub discovered_at: Millis,
    /// Merges that produced this kind.
    pub total_merged: u64,
}

/// Discovery ledger in first-encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryLedger {
    entries: Vec<DiscoveryEntry>,
}

impl DiscoveryLedger {
    /// Entry for a kind.
    pub fn get(&self, family: &FamilyId, level: u32) -> Option<&DiscoveryEntry> {
        self.entries
            .iter()
            .find(|e| &e.family == family && e.level == level)
    }

    /// Record a non-merge encounter (purchase, gift, starter). Creates the
    /// entry with `total_merged = 0` if unseen; returns whether it was new.
    pub fn record_encounter(&mut self, family: &FamilyId, level: u32, now: Millis) -> bool {
        if self.get(family, level).is_some() {
            return false;
        }
        self.entries.push(DiscoveryEntry {
            family: family.clone(),
            level,
            discovered_at: now,
            total_merged: 0,
        });
        true
    }

    /// Record a merge promotion into this kind.
    pub fn record_merge(&mut self, family: &FamilyId, level: u32, now: Millis) {
        match self
            .entries
            .iter_mut()
            .find(|e| &e.family == family && e.level == level)
        {
            Some(entry) => entry.total_merged = entry.total_merged.saturating_add(1),
            None => self.entries.push(DiscoveryEntry {
                family: family.clone(),
                level,
                discovered_at: now,
                total_merged: 1,
            }),
        }
    }

    /// All entries.
    pub fn iter(&self) -> impl Iterator<Item = &DiscoveryEntry> {
        self.entries.iter()
    }

    /// Number of discovered kinds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is discovered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encounter_then_merge() {
        let cat = FamilyId::parse("fairy_cat").unwrap();
        let mut ledger = DiscoveryLedger::default();
        assert!(ledger.record_encounter(&cat, 2, Millis(10)));
        assert!(!ledger.record_encounter(&cat, 2, Millis(20)));
        ledger.record_merge(&cat, 2, Millis(30));
        let entry = ledger.get(&cat, 2).unwrap();
        assert_eq!(entry.total_merged, 1);
        assert_eq!(entry.discovered_at, Millis(10));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn merge_creates_missing_entry_at_one() {
        let dragon = FamilyId::parse("baby_dragon").unwrap();
        let mut ledger = DiscoveryLedger::default();
        ledger.record_merge(&dragon, 3, Millis(5));
        ledger.record_merge(&dragon, 3, Millis(6));
        assert_eq!(ledger.get(&dragon, 3).unwrap().total_merged, 2);
        assert_eq!(ledger.get(&dragon, 3).unwrap().discovered_at, Millis(5));
    }
}
