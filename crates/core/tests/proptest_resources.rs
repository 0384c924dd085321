//! Property-based tests for resource ledger arithmetic
//!
//! Validates ledger invariants:
//! - Debiting an affordable cost never underflows and conserves totals
//! - Scaling by 100% is the identity, larger tiers never shrink a batch

use grove_core::{Resources, SubscriptionTier};
use proptest::prelude::*;

fn resources() -> impl Strategy<Value = Resources> {
    (0u64..10_000, 0u64..10_000, 0u64..10_000).prop_map(|(l, d, b)| Resources::new(l, d, b))
}

proptest! {
    /// Property: an affordable debit removes exactly the cost
    #[test]
    fn affordable_debit_conserves(wallet in resources(), raw in any::<(u64, u64, u64)>()) {
        let cost = Resources::new(
            raw.0 % (wallet.leaves + 1),
            raw.1 % (wallet.dew + 1),
            raw.2 % (wallet.berries + 1),
        );
        prop_assert!(wallet.can_afford(&cost));
        let mut after = wallet;
        after.debit(&cost);
        prop_assert_eq!(after + cost, wallet);
    }

    /// Property: affordability is exactly the per-channel comparison
    #[test]
    fn affordability_is_per_channel(wallet in resources(), cost in resources()) {
        let expected = wallet.leaves >= cost.leaves
            && wallet.dew >= cost.dew
            && wallet.berries >= cost.berries;
        prop_assert_eq!(wallet.can_afford(&cost), expected);
    }

    /// Property: tier multipliers are monotone and never below the base batch
    #[test]
    fn tiers_are_monotone(batch in resources()) {
        let none = SubscriptionTier::None.apply(batch);
        let sprout = SubscriptionTier::Sprout.apply(batch);
        let grove = SubscriptionTier::Grove.apply(batch);
        let enchanted = SubscriptionTier::Enchanted.apply(batch);
        prop_assert_eq!(none, batch);
        prop_assert!(sprout.leaves >= none.leaves && grove.leaves >= sprout.leaves);
        prop_assert!(enchanted.leaves == batch.leaves * 2);
        prop_assert!(enchanted.dew == batch.dew * 2);
    }
}
