//! Production clock: whole elapsed ticks and the resources they yield.

use grove_catalog::CreatureLevelDef;
use grove_core::{Millis, Resources, SubscriptionTier};

/// `floor((now - last) / interval)`; zero when `now` precedes `last` or the
/// interval is zero.
pub fn elapsed_ticks(last_collected_at: Millis, now: Millis, interval_ms: u64) -> u64 {
    if interval_ms == 0 {
        return 0;
    }
    now.since(last_collected_at) / interval_ms
}

/// Output of `ticks` ticks of `def`, scaled by `tier` and floored per channel.
pub fn yield_for(def: &CreatureLevelDef, ticks: u64, tier: SubscriptionTier) -> Resources {
    tier.apply(def.production.times(ticks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_core::FamilyId;

    fn def() -> CreatureLevelDef {
        CreatureLevelDef {
            family: FamilyId::parse("fairy_cat").unwrap(),
            level: 3,
            name: "Cosmic Cat".into(),
            production: Resources::new(8, 1, 0),
            interval_sec: 30,
            unlock_cost: None,
        }
    }

    #[test]
    fn partial_interval_yields_nothing() {
        assert_eq!(elapsed_ticks(Millis(1_000), Millis(30_999), 30_000), 0);
        assert_eq!(elapsed_ticks(Millis(1_000), Millis(31_000), 30_000), 1);
    }

    #[test]
    fn clock_skew_is_zero_ticks() {
        assert_eq!(elapsed_ticks(Millis(50_000), Millis(10_000), 30_000), 0);
    }

    #[test]
    fn multiplier_floors_each_channel() {
        // 3 ticks: 24 leaves, 3 dew; sprout 1.2x -> 28.8 and 3.6
        assert_eq!(yield_for(&def(), 3, SubscriptionTier::Sprout), Resources::new(28, 3, 0));
        assert_eq!(yield_for(&def(), 0, SubscriptionTier::Enchanted), Resources::ZERO);
    }
}
