//! Subscription tiers and their production multiplier.

use crate::Resources;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Paid subscription tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    /// No subscription.
    #[default]
    None,
    /// Entry tier.
    Sprout,
    /// Middle tier.
    Grove,
    /// Top tier.
    Enchanted,
}

impl SubscriptionTier {
    /// Production multiplier as an integer percentage.
    ///
    /// Kept integral so that flooring is exact: 1.2x is 120.
    pub const fn multiplier_percent(self) -> u64 {
        match self {
            SubscriptionTier::None => 100,
            SubscriptionTier::Sprout => 120,
            SubscriptionTier::Grove => 150,
            SubscriptionTier::Enchanted => 200,
        }
    }

    /// Production multiplier as a float, for display.
    pub fn multiplier(self) -> f64 {
        self.multiplier_percent() as f64 / 100.0
    }

    /// Apply the multiplier to a production batch, flooring each channel.
    pub fn apply(self, batch: Resources) -> Resources {
        batch.scale_percent(self.multiplier_percent())
    }

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionTier::None => "none",
            SubscriptionTier::Sprout => "sprout",
            SubscriptionTier::Grove => "grove",
            SubscriptionTier::Enchanted => "enchanted",
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(SubscriptionTier::None),
            "sprout" => Ok(SubscriptionTier::Sprout),
            "grove" => Ok(SubscriptionTier::Grove),
            "enchanted" => Ok(SubscriptionTier::Enchanted),
            other => Err(format!("unknown subscription tier '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipliers_match_tier_table() {
        assert_eq!(SubscriptionTier::None.multiplier(), 1.0);
        assert_eq!(SubscriptionTier::Sprout.multiplier(), 1.2);
        assert_eq!(SubscriptionTier::Grove.multiplier(), 1.5);
        assert_eq!(SubscriptionTier::Enchanted.multiplier(), 2.0);
    }

    #[test]
    fn apply_floors_per_channel() {
        let batch = Resources::new(7, 1, 0);
        assert_eq!(SubscriptionTier::Sprout.apply(batch), Resources::new(8, 1, 0));
        assert_eq!(SubscriptionTier::Grove.apply(batch), Resources::new(10, 1, 0));
    }
}
