//! Referral linking and the gift both sides receive.

use grove_catalog::Catalog;
use grove_core::{Millis, PlayerId, Resources};
use serde::Serialize;
use tracing::info;

use crate::grid::CreatureId;
use crate::{EngineError, GameState};

/// What a referral gift turned into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralGiftOutcome {
    /// Gift creature placed in a slot.
    Creature {
        /// Slot used.
        slot: usize,
        /// New creature id.
        creature_id: CreatureId,
    },
    /// Grid full; fallback resources credited.
    Resources(Resources),
}

impl GameState {
    /// Check that this player may be referred by `code`.
    pub fn check_referral(&self, code: &str) -> Result<(), EngineError> {
        if self.referral.referred_by.is_some() {
            return Err(EngineError::ReferralAlreadyUsed);
        }
        if self.referral.code.eq_ignore_ascii_case(code.trim()) {
            return Err(EngineError::SelfReferral);
        }
        Ok(())
    }

    /// Record `referrer` and grant the referred player's gift.
    pub fn accept_referral(
        &mut self,
        catalog: &Catalog,
        referrer: PlayerId,
        code: &str,
        now: Millis,
    ) -> Result<ReferralGiftOutcome, EngineError> {
        self.check_referral(code)?;
        if referrer == self.owner {
            return Err(EngineError::SelfReferral);
        }
        self.referral.referred_by = Some(referrer);
        let gift = self.grant_referral_gift(catalog, now);
        info!(player = %self.owner, %referrer, "referral accepted");
        Ok(gift)
    }

    /// Count a successful referral on the referrer and grant their gift.
    pub fn reward_referrer(&mut self, catalog: &Catalog, now: Millis) -> ReferralGiftOutcome {
        self.referral.count += 1;
        self.grant_referral_gift(catalog, now)
    }

    fn grant_referral_gift(&mut self, catalog: &Catalog, now: Millis) -> ReferralGiftOutcome {
        let gift = &catalog.rules().referral_gift;
        match self.grid.first_free_unlocked() {
            Some(slot) => {
                let creature = self.mint_creature(gift.family.clone(), gift.level, now);
                let creature_id = creature.id.clone();
                self.grid.place(slot, creature);
                self.discovery.record_encounter(&gift.family, gift.level, now);
                ReferralGiftOutcome::Creature { slot, creature_id }
            }
            None => {
                self.resources += gift.fallback;
                ReferralGiftOutcome::Resources(gift.fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_core::FamilyId;

    fn state(id: u64, code: &str) -> (Catalog, GameState) {
        let catalog = Catalog::builtin().unwrap();
        let state = GameState::new_player(&catalog, PlayerId(id), code.into(), Millis(0));
        (catalog, state)
    }

    #[test]
    fn both_sides_get_a_creature() {
        let (catalog, mut referred) = state(1, "AAAA1111");
        let (_, mut referrer) = state(2, "BBBB2222");
        let gift = referred
            .accept_referral(&catalog, referrer.owner, "bbbb2222", Millis(5))
            .unwrap();
        assert!(matches!(gift, ReferralGiftOutcome::Creature { slot: 3, .. }));
        referrer.reward_referrer(&catalog, Millis(5));
        assert_eq!(referrer.referral.count, 1);
        assert_eq!(referred.referral.referred_by, Some(PlayerId(2)));
        let cat = FamilyId::parse("fairy_cat").unwrap();
        assert_eq!(referrer.grid.get(3).unwrap().family, cat);
    }

    #[test]
    fn second_referral_is_rejected() {
        let (catalog, mut referred) = state(1, "AAAA1111");
        referred.accept_referral(&catalog, PlayerId(2), "BBBB2222", Millis(5)).unwrap();
        assert_eq!(
            referred.accept_referral(&catalog, PlayerId(3), "CCCC3333", Millis(6)),
            Err(EngineError::ReferralAlreadyUsed)
        );
    }

    #[test]
    fn own_code_is_rejected() {
        let (catalog, mut state) = state(1, "AAAA1111");
        assert_eq!(
            state.accept_referral(&catalog, PlayerId(1), "AAAA1111", Millis(5)),
            Err(EngineError::SelfReferral)
        );
        assert!(state.referral.referred_by.is_none());
    }

    #[test]
    fn full_grid_falls_back_to_leaves() {
        let (catalog, mut state) = state(1, "AAAA1111");
        let cat = FamilyId::parse("fairy_cat").unwrap();
        for _ in 3..15 {
            state.buy_creature(&catalog, &cat, 1, None, Millis(1)).unwrap();
        }
        let gift = state.reward_referrer(&catalog, Millis(2));
        assert_eq!(gift, ReferralGiftOutcome::Resources(Resources::new(50, 0, 0)));
        assert_eq!(state.resources.leaves, 60);
    }
}
