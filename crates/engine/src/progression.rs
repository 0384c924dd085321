//! Player level and experience.

use grove_catalog::GameRules;
use serde::{Deserialize, Serialize};

/// Player level; `experience` always stays below the next threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    /// Current level, starting at 1.
    pub level: u32,
    /// Experience toward the next level.
    pub experience: u64,
}

impl Default for Progression {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0,
        }
    }
}

impl Progression {
    /// Add experience and level up as many times as it pays for.
    /// Returns the number of levels gained.
    pub fn gain(&mut self, rules: &GameRules, xp: u64) -> u32 {
        self.experience = self.experience.saturating_add(xp);
        let mut gained = 0;
        loop {
            let threshold = rules.xp_required_for(self.level + 1);
            if threshold == 0 || self.experience < threshold {
                break;
            }
            self.experience -= threshold;
            self.level += 1;
            gained += 1;
        }
        gained
    }
}
