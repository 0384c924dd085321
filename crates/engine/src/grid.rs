//! Fixed-size creature grid and the cell-tap selection state machine.
//!
//! [`plan_tap`] is a pure decision over the grid and the current
//! [`Selection`]; the caller executes the returned [`TapPlan`]. Slots at or
//! past `unlocked_slots` are inert: they can hold creatures (and still
//! produce offline) but are never selected, targeted, or collected.

use grove_core::{FamilyId, Millis};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::EngineError;

/// Opaque creature identity token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreatureId(pub String);

impl fmt::Display for CreatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A creature occupying one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCreature {
    /// Unique identity; never compared for merge eligibility.
    pub id: CreatureId,
    /// Family.
    pub family: FamilyId,
    /// Level, 1-based.
    pub level: u32,
    /// Last harvest instant.
    pub last_collected_at: Millis,
    /// Derived: at least one tick is ready. Recomputed on every view.
    pub is_collecting: bool,
}

impl GridCreature {
    /// Fresh creature that starts producing at `now`.
    pub fn new(id: CreatureId, family: FamilyId, level: u32, now: Millis) -> Self {
        Self {
            id,
            family,
            level,
            last_collected_at: now,
            is_collecting: false,
        }
    }

    /// Same family and level; identity is ignored.
    pub fn same_kind(&self, other: &GridCreature) -> bool {
        self.family == other.family && self.level == other.level
    }
}

/// Slot array plus the unlocked boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    slots: Vec<Option<GridCreature>>,
    unlocked_slots: usize,
}

impl Grid {
    /// Empty grid of `size` slots with the first `unlocked` usable.
    pub fn new(size: usize, unlocked: usize) -> Self {
        Self {
            slots: vec![None; size],
            unlocked_slots: unlocked.min(size),
        }
    }

    /// Total slot count.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True for a zero-length grid.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current unlocked boundary.
    pub fn unlocked_slots(&self) -> usize {
        self.unlocked_slots
    }

    /// Whether `index` is below the unlocked boundary.
    pub fn is_unlocked(&self, index: usize) -> bool {
        index < self.unlocked_slots && index < self.slots.len()
    }

    /// Creature at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&GridCreature> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Mutable creature at `index`, if any.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut GridCreature> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Occupied slots with their index, locked ones included.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &GridCreature)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|c| (index, c)))
    }

    /// Mutable view over every occupied slot.
    pub fn occupied_mut(&mut self) -> impl Iterator<Item = &mut GridCreature> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// Number of occupied slots.
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// First empty slot below the unlocked boundary.
    pub fn first_free_unlocked(&self) -> Option<usize> {
        self.slots
            .iter()
            .take(self.unlocked_slots)
            .position(Option::is_none)
    }

    /// Raise the unlocked boundary by `extra`, capped at the grid length.
    /// The boundary never shrinks. Returns the new boundary.
    pub fn unlock(&mut self, extra: usize) -> usize {
        self.unlocked_slots = self
            .unlocked_slots
            .saturating_add(extra)
            .min(self.slots.len());
        self.unlocked_slots
    }

    /// Fail unless `index` addresses an unlocked slot.
    pub fn check_usable(&self, index: usize) -> Result<(), EngineError> {
        if index >= self.slots.len() {
            return Err(EngineError::InvalidSlot {
                index,
                size: self.slots.len(),
            });
        }
        if index >= self.unlocked_slots {
            return Err(EngineError::LockedSlot {
                index,
                unlocked: self.unlocked_slots,
            });
        }
        Ok(())
    }

    /// Put a creature into an empty slot. Callers have already checked the
    /// slot is free.
    pub(crate) fn place(&mut self, index: usize, creature: GridCreature) {
        debug_assert!(self.slots[index].is_none(), "placing into occupied slot");
        self.slots[index] = Some(creature);
    }

    /// Remove and return the creature at `index`.
    pub(crate) fn take(&mut self, index: usize) -> Option<GridCreature> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Move from `from` into the empty slot `to`.
    pub(crate) fn move_creature(&mut self, from: usize, to: usize) {
        let creature = self.take(from);
        self.slots[to] = creature;
    }

    /// Exchange two slots.
    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        self.slots.swap(a, b);
    }
}

/// Selection cursor of a session. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    /// Nothing selected.
    #[default]
    Idle,
    /// One occupied, unlocked slot chosen.
    Selected(usize),
}

/// What a tap should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapPlan {
    /// Tap on a locked or empty slot with nothing selected.
    Ignore,
    /// Select an occupied slot.
    Select(usize),
    /// Tap on the selected slot again.
    Deselect,
    /// Move into an empty slot.
    Move {
        /// Source slot.
        from: usize,
        /// Empty destination.
        to: usize,
    },
    /// Merge two identical creatures; the result lands on `to`.
    Merge {
        /// Consumed source slot.
        from: usize,
        /// Target slot receiving the promoted creature.
        to: usize,
    },
    /// Identical pair already at the top level.
    MaxLevel {
        /// Family of the pair.
        family: FamilyId,
        /// Their level.
        level: u32,
    },
    /// Exchange two different creatures.
    Swap {
        /// Selected slot.
        a: usize,
        /// Tapped slot.
        b: usize,
    },
}

/// Decide the transition for a tap on `index`.
///
/// Out-of-range taps are rejected outright. With nothing selected a locked
/// tap is ignored; with a selection it is rejected as [`EngineError::LockedSlot`]
/// and the selection is left alone. A selection whose creature has vanished
/// or whose slot is no longer usable is treated as `Idle`.
pub fn plan_tap(
    grid: &Grid,
    selection: Selection,
    index: usize,
    max_level: u32,
) -> Result<TapPlan, EngineError> {
    if index >= grid.len() {
        return Err(EngineError::InvalidSlot {
            index,
            size: grid.len(),
        });
    }

    let source = match selection {
        Selection::Selected(i) if grid.is_unlocked(i) => grid.get(i).map(|c| (i, c)),
        _ => None,
    };

    let Some((from, selected)) = source else {
        if !grid.is_unlocked(index) || grid.get(index).is_none() {
            return Ok(TapPlan::Ignore);
        }
        return Ok(TapPlan::Select(index));
    };

    if index == from {
        return Ok(TapPlan::Deselect);
    }
    grid.check_usable(index)?;

    match grid.get(index) {
        None => Ok(TapPlan::Move { from, to: index }),
        Some(target) if target.same_kind(selected) => {
            if selected.level >= max_level {
                Ok(TapPlan::MaxLevel {
                    family: selected.family.clone(),
                    level: selected.level,
                })
            } else {
                Ok(TapPlan::Merge { from, to: index })
            }
        }
        Some(_) => Ok(TapPlan::Swap { a: from, b: index }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creature(id: &str, family: &str, level: u32) -> GridCreature {
        GridCreature::new(
            CreatureId(id.to_string()),
            FamilyId::parse(family).unwrap(),
            level,
            Millis::ZERO,
        )
    }

    fn grid() -> Grid {
        let mut grid = Grid::new(8, 4);
        grid.place(0, creature("a", "fairy_cat", 1));
        grid.place(1, creature("b", "fairy_cat", 1));
        grid.place(2, creature("c", "mushroom_sprite", 1));
        grid.place(5, creature("d", "fairy_cat", 1));
        grid
    }

    #[test]
    fn idle_taps() {
        let grid = grid();
        assert_eq!(plan_tap(&grid, Selection::Idle, 0, 5).unwrap(), TapPlan::Select(0));
        assert_eq!(plan_tap(&grid, Selection::Idle, 3, 5).unwrap(), TapPlan::Ignore);
        assert_eq!(plan_tap(&grid, Selection::Idle, 5, 5).unwrap(), TapPlan::Ignore);
        assert!(matches!(
            plan_tap(&grid, Selection::Idle, 8, 5),
            Err(EngineError::InvalidSlot { index: 8, size: 8 })
        ));
    }

    #[test]
    fn selected_taps() {
        let grid = grid();
        let sel = Selection::Selected(0);
        assert_eq!(plan_tap(&grid, sel, 0, 5).unwrap(), TapPlan::Deselect);
        assert_eq!(plan_tap(&grid, sel, 3, 5).unwrap(), TapPlan::Move { from: 0, to: 3 });
        assert_eq!(plan_tap(&grid, sel, 1, 5).unwrap(), TapPlan::Merge { from: 0, to: 1 });
        assert_eq!(plan_tap(&grid, sel, 2, 5).unwrap(), TapPlan::Swap { a: 0, b: 2 });
    }

    #[test]
    fn locked_target_is_rejected_even_when_mergeable() {
        let grid = grid();
        assert!(matches!(
            plan_tap(&grid, Selection::Selected(0), 5, 5),
            Err(EngineError::LockedSlot { index: 5, unlocked: 4 })
        ));
    }

    #[test]
    fn max_level_pair_is_flagged() {
        let mut grid = Grid::new(4, 4);
        grid.place(0, creature("a", "baby_dragon", 5));
        grid.place(1, creature("b", "baby_dragon", 5));
        assert!(matches!(
            plan_tap(&grid, Selection::Selected(0), 1, 5).unwrap(),
            TapPlan::MaxLevel { level: 5, .. }
        ));
    }

    #[test]
    fn stale_selection_reevaluates_tap() {
        let mut grid = grid();
        grid.take(0);
        assert_eq!(plan_tap(&grid, Selection::Selected(0), 1, 5).unwrap(), TapPlan::Select(1));
        assert_eq!(plan_tap(&grid, Selection::Selected(0), 3, 5).unwrap(), TapPlan::Ignore);
        // a selection pointing past the boundary is stale too
        assert_eq!(plan_tap(&grid, Selection::Selected(5), 2, 5).unwrap(), TapPlan::Select(2));
    }

    #[test]
    fn unlock_only_grows_and_caps() {
        let mut grid = Grid::new(8, 4);
        assert_eq!(grid.unlock(3), 7);
        assert_eq!(grid.unlock(5), 8);
        assert_eq!(grid.unlock(0), 8);
    }

    #[test]
    fn first_free_ignores_locked_slots() {
        let mut grid = Grid::new(3, 2);
        grid.place(0, creature("a", "fairy_cat", 1));
        assert_eq!(grid.first_free_unlocked(), Some(1));
        grid.place(1, creature("b", "fairy_cat", 1));
        assert_eq!(grid.first_free_unlocked(), None);
    }
}
