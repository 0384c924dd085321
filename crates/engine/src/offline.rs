//! Offline catch-up at session start.
//!
//! The batch is computed from the length of the offline gap alone: every
//! occupied slot (locked ones included) contributes `gap / interval` whole
//! ticks, independent of when that creature was last collected. The sum is
//! multiplied once by the effective subscription tier.

use grove_catalog::Catalog;
use grove_core::{Millis, Resources};
use serde::Serialize;
use tracing::{debug, info};

use crate::GameState;

/// Why no catch-up was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Account created this session.
    NewAccount,
    /// Gap at or below the minimum.
    ShortGap,
}

/// Outcome of [`GameState::reconcile_offline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OfflineReport {
    /// Real gap since `last_online_at`.
    pub offline_ms: u64,
    /// Gap after the cap.
    pub credited_ms: u64,
    /// Resources granted.
    pub bonus: Resources,
    /// Set when nothing was granted.
    pub skipped: Option<SkipReason>,
}

impl GameState {
    /// Grant production for the time since `last_online_at`, capped, and move
    /// the online clock to `now` in every case.
    pub fn reconcile_offline(&mut self, catalog: &Catalog, now: Millis, is_new: bool) -> OfflineReport {
        let rules = catalog.rules();
        let offline_ms = now.since(self.last_online_at);
        let credited_ms = offline_ms.min(rules.max_offline_ms());
        self.last_online_at = now;

        let skipped = if is_new {
            Some(SkipReason::NewAccount)
        } else if credited_ms <= rules.min_offline_ms {
            Some(SkipReason::ShortGap)
        } else {
            None
        };
        if skipped.is_some() {
            debug!(player = %self.owner, offline_ms, ?skipped, "offline catch-up skipped");
            return OfflineReport {
                offline_ms,
                credited_ms,
                bonus: Resources::ZERO,
                skipped,
            };
        }

        let mut batch = Resources::ZERO;
        for (_, creature) in self.grid.occupied() {
            let Some(def) = catalog.creature(&creature.family, creature.level) else {
                continue;
            };
            let ticks = credited_ms / def.interval_ms().max(1);
            batch += def.production.times(ticks);
        }
        let bonus = self.effective_tier(now).apply(batch);
        self.resources += bonus;
        self.catchup_bonus = bonus;

        info!(player = %self.owner, offline_ms, credited_ms, %bonus, "offline catch-up granted");
        OfflineReport {
            offline_ms,
            credited_ms,
            bonus,
            skipped: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_core::{PlayerId, SubscriptionTier, MS_PER_HOUR};

    fn state(now: Millis) -> (Catalog, GameState) {
        let catalog = Catalog::builtin().unwrap();
        let state = GameState::new_player(&catalog, PlayerId(5), "CODE0005".into(), now);
        (catalog, state)
    }

    #[test]
    fn new_account_gets_nothing() {
        let (catalog, mut state) = state(Millis::ZERO);
        let report = state.reconcile_offline(&catalog, Millis::from_hours(3), true);
        assert_eq!(report.skipped, Some(SkipReason::NewAccount));
        assert!(state.catchup_bonus.is_zero());
        assert_eq!(state.last_online_at, Millis::from_hours(3));
    }

    #[test]
    fn exactly_thirty_seconds_is_still_short() {
        let (catalog, mut state) = state(Millis::ZERO);
        let report = state.reconcile_offline(&catalog, Millis(30_000), false);
        assert_eq!(report.skipped, Some(SkipReason::ShortGap));
        let report = state.reconcile_offline(&catalog, Millis(30_000 + 30_001), false);
        assert_eq!(report.skipped, None);
    }

    #[test]
    fn one_hour_of_starter_grid() {
        let (catalog, mut state) = state(Millis::ZERO);
        let report = state.reconcile_offline(&catalog, Millis::from_hours(1), false);
        // two fairy cats: 3600/30 = 120 ticks of 1 leaf each; sprite: 144 ticks of 3
        assert_eq!(report.bonus, Resources::new(2 * 120 + 3 * 144, 0, 0));
        assert_eq!(state.resources.leaves, 10 + 672);
        assert_eq!(state.catchup_bonus, report.bonus);
    }

    #[test]
    fn ignores_individual_collection_times() {
        let (catalog, mut state) = state(Millis::ZERO);
        let fresh = state.clone();
        // a creature collected moments before going offline gets the same ticks
        state.grid.get_mut(0).unwrap().last_collected_at = Millis::from_hours(1);
        let mut expected = fresh;
        let a = state.reconcile_offline(&catalog, Millis::from_hours(2), false);
        let b = expected.reconcile_offline(&catalog, Millis::from_hours(2), false);
        assert_eq!(a.bonus, b.bonus);
    }

    #[test]
    fn multiplier_applies_to_the_sum() {
        let (catalog, mut state) = state(Millis::ZERO);
        state.subscription.tier = SubscriptionTier::Sprout;
        let report = state.reconcile_offline(&catalog, Millis(MS_PER_HOUR), false);
        assert_eq!(report.bonus.leaves, 672 * 120 / 100);
    }
}
