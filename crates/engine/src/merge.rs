//! Merge resolution: two identical creatures become one of the next level.

use grove_catalog::Catalog;
use grove_core::{FamilyId, Millis};
use serde::Serialize;
use tracing::debug;

use crate::grid::CreatureId;
use crate::quests::QuestEvent;
use crate::{EngineError, GameState};

/// Result of a committed merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    /// Slot holding the promoted creature.
    pub slot: usize,
    /// Its fresh id.
    pub creature_id: CreatureId,
    /// Family.
    pub family: FamilyId,
    /// Resulting level.
    pub new_level: u32,
    /// Experience awarded.
    pub xp_gained: u64,
    /// Player levels gained from that experience.
    pub levels_gained: u32,
}

impl GameState {
    /// Merge the creature at `from` into `to`.
    ///
    /// Everything that can fail is checked before the first write, so either
    /// the grid, experience, bestiary, merge counter and quests all change or
    /// nothing does.
    pub fn merge(
        &mut self,
        catalog: &Catalog,
        from: usize,
        to: usize,
        now: Millis,
    ) -> Result<MergeOutcome, EngineError> {
        self.grid.check_usable(from)?;
        self.grid.check_usable(to)?;
        if from == to {
            return Err(EngineError::NotMergeable { from, to });
        }
        let source = self.grid.get(from).ok_or(EngineError::EmptySlot(from))?;
        let target = self.grid.get(to).ok_or(EngineError::EmptySlot(to))?;
        if !source.same_kind(target) {
            return Err(EngineError::NotMergeable { from, to });
        }
        let family = source.family.clone();
        let level = source.level;
        if level >= catalog.rules().max_creature_level {
            return Err(EngineError::MaxLevelReached { family, level });
        }
        let new_level = level + 1;
        if catalog.creature(&family, new_level).is_none() {
            return Err(EngineError::UnknownCreature {
                family,
                level: new_level,
            });
        }

        let xp_gained = catalog.rules().merge_xp(new_level);
        let promoted = self.mint_creature(family.clone(), new_level, now);
        let creature_id = promoted.id.clone();
        self.grid.take(from);
        self.grid.take(to);
        self.grid.place(to, promoted);
        let levels_gained = self.progression.gain(catalog.rules(), xp_gained);
        self.discovery.record_merge(&family, new_level, now);
        self.total_merges += 1;
        self.quests.record(QuestEvent::Merge);

        debug!(player = %self.owner, %family, new_level, from, to, "merged");
        Ok(MergeOutcome {
            slot: to,
            creature_id,
            family,
            new_level,
            xp_gained,
            levels_gained,
        })
    }
}
