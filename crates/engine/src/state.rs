//! Per-player aggregate root.

use std::collections::BTreeSet;

use grove_catalog::Catalog;
use grove_core::{FamilyId, Millis, PlayerId, Resources, SubscriptionTier};
use serde::{Deserialize, Serialize};

use crate::discovery::DiscoveryLedger;
use crate::grid::{CreatureId, Grid, GridCreature};
use crate::production::elapsed_ticks;
use crate::progression::Progression;
use crate::quests::QuestLog;

/// Referral bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralInfo {
    /// This player's own code.
    pub code: String,
    /// Players who joined with the code.
    pub count: u64,
    /// Who referred this player.
    pub referred_by: Option<PlayerId>,
}

/// Subscription tier with optional expiry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Purchased tier.
    pub tier: SubscriptionTier,
    /// End of the paid period; `None` never expires.
    pub expires_at: Option<Millis>,
}

impl Subscription {
    /// Tier in force at `now`.
    pub fn effective(&self, now: Millis) -> SubscriptionTier {
        match self.expires_at {
            Some(end) if now >= end => SubscriptionTier::None,
            _ => self.tier,
        }
    }
}

/// Full authoritative state of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Owning player.
    pub owner: PlayerId,
    /// Creature grid.
    pub grid: Grid,
    /// Wallet.
    pub resources: Resources,
    /// Level and experience.
    pub progression: Progression,
    /// Bestiary.
    pub discovery: DiscoveryLedger,
    /// Daily quests.
    pub quests: QuestLog,
    /// Lifetime merge count.
    pub total_merges: u64,
    /// Referral fields.
    pub referral: ReferralInfo,
    /// Subscription.
    pub subscription: Subscription,
    /// Ads disabled.
    pub no_ads: bool,
    /// Owned cosmetic packs.
    pub cosmetics: BTreeSet<String>,
    /// End of the previous session (or its latest action).
    pub last_online_at: Millis,
    /// Most recent offline grant, until acknowledged.
    pub catchup_bonus: Resources,
    /// Payment charges already applied.
    pub processed_charges: BTreeSet<String>,
    /// Next creature id sequence number.
    pub next_creature_seq: u64,
    /// Account creation.
    pub created_at: Millis,
}

impl GameState {
    /// Starter state for a brand-new account.
    pub fn new_player(catalog: &Catalog, owner: PlayerId, referral_code: String, now: Millis) -> Self {
        let rules = catalog.rules();
        let mut state = Self {
            owner,
            grid: Grid::new(rules.grid_size, rules.default_unlocked_slots),
            resources: rules.starter.resources,
            progression: Progression::default(),
            discovery: DiscoveryLedger::default(),
            quests: QuestLog::draw(catalog, owner, now),
            total_merges: 0,
            referral: ReferralInfo {
                code: referral_code,
                ..ReferralInfo::default()
            },
            subscription: Subscription::default(),
            no_ads: false,
            cosmetics: BTreeSet::new(),
            last_online_at: now,
            catchup_bonus: Resources::ZERO,
            processed_charges: BTreeSet::new(),
            next_creature_seq: 0,
            created_at: now,
        };
        for (slot, starter) in rules.starter.creatures.iter().enumerate() {
            let creature = state.mint_creature(starter.family.clone(), starter.level, now);
            state.grid.place(slot, creature);
            state.discovery.record_encounter(&starter.family, starter.level, now);
        }
        state
    }

    /// Create a creature with a fresh id. Ids derive from the owner and a
    /// sequence number that is never reused.
    pub fn mint_creature(&mut self, family: FamilyId, level: u32, now: Millis) -> GridCreature {
        let seq = self.next_creature_seq;
        self.next_creature_seq += 1;
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.owner.0.to_le_bytes());
        hasher.update(&seq.to_le_bytes());
        let hex = hasher.finalize().to_hex();
        GridCreature::new(CreatureId(format!("c_{}", &hex[..12])), family, level, now)
    }

    /// Tier in force at `now`.
    pub fn effective_tier(&self, now: Millis) -> SubscriptionTier {
        self.subscription.effective(now)
    }

    /// Recompute every creature's ready flag against `now`.
    pub fn refresh_ready_flags(&mut self, catalog: &Catalog, now: Millis) {
        for creature in self.grid.occupied_mut() {
            creature.is_collecting = catalog
                .creature(&creature.family, creature.level)
                .map(|def| elapsed_ticks(creature.last_collected_at, now, def.interval_ms()) > 0)
                .unwrap_or(false);
        }
    }

    /// Clear the catch-up bonus once the client has shown it; returns what
    /// was pending.
    pub fn acknowledge_catchup(&mut self) -> Resources {
        std::mem::take(&mut self.catchup_bonus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn starter() -> (Catalog, GameState) {
        let catalog = Catalog::builtin().unwrap();
        let state = GameState::new_player(&catalog, PlayerId(42), "ABCD1234".into(), Millis(1_000));
        (catalog, state)
    }

    #[test]
    fn starter_layout() {
        let (_, state) = starter();
        let cat = FamilyId::parse("fairy_cat").unwrap();
        let sprite = FamilyId::parse("mushroom_sprite").unwrap();
        assert_eq!(state.grid.get(0).unwrap().family, cat);
        assert_eq!(state.grid.get(1).unwrap().family, cat);
        assert_eq!(state.grid.get(2).unwrap().family, sprite);
        assert_eq!(state.grid.count(), 3);
        assert_eq!(state.grid.len(), 40);
        assert_eq!(state.grid.unlocked_slots(), 15);
        assert_eq!(state.resources, Resources::new(10, 0, 0));
        assert_eq!(state.discovery.len(), 2);
        assert_eq!(state.discovery.get(&cat, 1).unwrap().total_merged, 0);
        assert_eq!(state.quests.quests.len(), 4);
    }

    #[test]
    fn creature_ids_are_unique() {
        let (_, state) = starter();
        let ids: BTreeSet<_> = state.grid.occupied().map(|(_, c)| c.id.clone()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| id.0.starts_with("c_") && id.0.len() == 14));
        assert_eq!(state.next_creature_seq, 3);
    }

    #[test]
    fn subscription_expires() {
        let sub = Subscription {
            tier: SubscriptionTier::Grove,
            expires_at: Some(Millis(100)),
        };
        assert_eq!(sub.effective(Millis(99)), SubscriptionTier::Grove);
        assert_eq!(sub.effective(Millis(100)), SubscriptionTier::None);
    }

    #[test]
    fn ready_flags_follow_the_clock() {
        let (catalog, mut state) = starter();
        state.refresh_ready_flags(&catalog, Millis(1_000 + 29_999));
        assert!(!state.grid.get(0).unwrap().is_collecting);
        // mushroom sprites tick every 25s
        assert!(state.grid.get(2).unwrap().is_collecting);
        state.refresh_ready_flags(&catalog, Millis(1_000 + 30_000));
        assert!(state.grid.get(0).unwrap().is_collecting);
    }

    #[test]
    fn acknowledge_clears_bonus() {
        let (_, mut state) = starter();
        state.catchup_bonus = Resources::new(5, 1, 0);
        assert_eq!(state.acknowledge_catchup(), Resources::new(5, 1, 0));
        assert!(state.catchup_bonus.is_zero());
    }
}
