//! Tunable game rules and the leveling curve.

use grove_core::{FamilyId, Resources, MS_PER_HOUR};
use serde::Deserialize;

/// One creature placed by the starter layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StarterCreature {
    /// Family of the creature.
    pub family: FamilyId,
    /// Level of the creature.
    pub level: u32,
}

/// Layout a brand-new account starts with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StarterLayout {
    /// Creatures placed into slots 0.. in order.
    pub creatures: Vec<StarterCreature>,
    /// Opening resource balance.
    #[serde(default)]
    pub resources: Resources,
}

/// Reward granted to both sides of a referral.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReferralGift {
    /// Family of the gifted creature.
    pub family: FamilyId,
    /// Level of the gifted creature.
    pub level: u32,
    /// Granted instead when no unlocked slot is free.
    #[serde(default)]
    pub fallback: Resources,
}

/// Global rules section of the catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameRules {
    /// Total number of grid slots.
    pub grid_size: usize,
    /// Slots usable by a new account.
    pub default_unlocked_slots: usize,
    /// Highest creature level.
    pub max_creature_level: u32,
    /// Cap on offline catch-up.
    pub max_offline_hours: u64,
    /// Gaps at or below this many milliseconds grant no catch-up.
    pub min_offline_ms: u64,
    /// Daily quests refresh once this many hours have passed.
    pub quest_reset_hours: u64,
    /// Number of quests drawn per refresh.
    pub daily_quest_count: usize,
    /// XP per merge is this times the resulting level.
    pub xp_per_merge_level: u64,
    /// XP needed for level 1.
    pub xp_base: u64,
    /// Growth factor of the leveling curve.
    pub xp_growth: f64,
    /// New account layout.
    pub starter: StarterLayout,
    /// Referral reward.
    pub referral_gift: ReferralGift,
}

impl GameRules {
    /// Offline cap in milliseconds.
    pub fn max_offline_ms(&self) -> u64 {
        self.max_offline_hours.saturating_mul(MS_PER_HOUR)
    }

    /// Quest refresh period in milliseconds.
    pub fn quest_reset_ms(&self) -> u64 {
        self.quest_reset_hours.saturating_mul(MS_PER_HOUR)
    }

    /// `floor(xp_base * xp_growth^(level-1))`.
    pub fn xp_required_for(&self, level: u32) -> u64 {
        let exp = level.saturating_sub(1) as i32;
        (self.xp_base as f64 * self.xp_growth.powi(exp)).floor() as u64
    }

    /// XP awarded for a merge producing `result_level`.
    pub fn merge_xp(&self, result_level: u32) -> u64 {
        self.xp_per_merge_level.saturating_mul(u64::from(result_level))
    }
}
