//! Player actions: cell taps, live collection and quest claims.

use grove_catalog::Catalog;
use grove_core::{Millis, Resources};
use serde::Serialize;
use tracing::{debug, trace};

use crate::grid::{plan_tap, Selection, TapPlan};
use crate::merge::MergeOutcome;
use crate::production::{elapsed_ticks, yield_for};
use crate::quests::QuestEvent;
use crate::{EngineError, GameState};

/// Observable effect of a tap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TapOutcome {
    /// Nothing happened.
    Ignored,
    /// Slot selected.
    Selected(usize),
    /// Selection cleared.
    Deselected,
    /// Creature moved into an empty slot.
    Moved {
        /// Source slot.
        from: usize,
        /// Destination slot.
        to: usize,
    },
    /// Merge committed.
    Merged(MergeOutcome),
    /// Two creatures exchanged.
    Swapped {
        /// First slot.
        a: usize,
        /// Second slot.
        b: usize,
    },
}

/// Result of collecting one creature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectOutcome {
    /// Whole ticks harvested.
    pub ticks: u64,
    /// Resources credited.
    pub earned: Resources,
}

impl GameState {
    /// Apply a tap on `index` to the session's `selection`.
    ///
    /// On success the selection holds the next state. A max-level pair
    /// clears the selection and reports [`EngineError::MaxLevelReached`];
    /// other rejections leave it untouched.
    pub fn select_cell(
        &mut self,
        catalog: &Catalog,
        selection: &mut Selection,
        index: usize,
        now: Millis,
    ) -> Result<TapOutcome, EngineError> {
        let plan = plan_tap(&self.grid, *selection, index, catalog.rules().max_creature_level)?;
        trace!(player = %self.owner, index, ?plan, "tap");
        let outcome = match plan {
            TapPlan::Ignore => {
                *selection = Selection::Idle;
                return Ok(TapOutcome::Ignored);
            }
            TapPlan::Select(i) => {
                *selection = Selection::Selected(i);
                return Ok(TapOutcome::Selected(i));
            }
            TapPlan::Deselect => TapOutcome::Deselected,
            TapPlan::Move { from, to } => {
                self.grid.move_creature(from, to);
                TapOutcome::Moved { from, to }
            }
            TapPlan::Merge { from, to } => TapOutcome::Merged(self.merge(catalog, from, to, now)?),
            TapPlan::MaxLevel { family, level } => {
                *selection = Selection::Idle;
                return Err(EngineError::MaxLevelReached { family, level });
            }
            TapPlan::Swap { a, b } => {
                self.grid.swap(a, b);
                TapOutcome::Swapped { a, b }
            }
        };
        *selection = Selection::Idle;
        Ok(outcome)
    }

    /// Harvest every whole tick of the creature at `index`.
    ///
    /// Zero ticks is a no-op: neither the wallet nor the creature's clock
    /// changes, so partial progress carries over.
    pub fn collect_creature(
        &mut self,
        catalog: &Catalog,
        index: usize,
        now: Millis,
    ) -> Result<CollectOutcome, EngineError> {
        self.grid.check_usable(index)?;
        let tier = self.effective_tier(now);
        let creature = self.grid.get(index).ok_or(EngineError::EmptySlot(index))?;
        let def = catalog
            .creature(&creature.family, creature.level)
            .ok_or_else(|| EngineError::UnknownCreature {
                family: creature.family.clone(),
                level: creature.level,
            })?;
        let ticks = elapsed_ticks(creature.last_collected_at, now, def.interval_ms());
        if ticks == 0 {
            return Ok(CollectOutcome {
                ticks,
                earned: Resources::ZERO,
            });
        }
        let earned = yield_for(def, ticks, tier);
        let family = creature.family.clone();

        if let Some(creature) = self.grid.get_mut(index) {
            creature.last_collected_at = now;
            creature.is_collecting = false;
        }
        self.resources += earned;
        self.quests.record(QuestEvent::Collect {
            family: &family,
            earned,
        });
        debug!(player = %self.owner, index, ticks, %earned, "collected");
        Ok(CollectOutcome { ticks, earned })
    }

    /// Claim a completed quest and credit its rewards.
    pub fn claim_quest(&mut self, quest_id: &str, now: Millis) -> Result<Resources, EngineError> {
        let rewards = self.quests.claim(quest_id, now)?;
        self.resources += rewards;
        debug!(player = %self.owner, quest_id, %rewards, "quest claimed");
        Ok(rewards)
    }
}
