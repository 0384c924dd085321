//! Shop: resource-priced creatures and verified premium purchases.

use grove_catalog::{Catalog, PremiumItem, ShopEffect};
use grove_core::{Cost, FamilyId, Millis, SubscriptionTier, MS_PER_DAY};
use serde::Serialize;
use tracing::info;

use crate::grid::CreatureId;
use crate::{EngineError, GameState};

/// A creature bought with resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseOutcome {
    /// Slot the creature was placed in.
    pub slot: usize,
    /// New creature id.
    pub creature_id: CreatureId,
    /// Price debited.
    pub cost: Cost,
}

/// Effect applied for a verified premium charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PremiumEffect {
    /// Unlocked boundary raised to this count.
    SlotsUnlocked(usize),
    /// Ads disabled.
    NoAds,
    /// Cosmetic pack owned.
    Cosmetic(String),
    /// Subscription active until the given instant.
    Subscribed {
        /// Tier.
        tier: SubscriptionTier,
        /// Expiry.
        expires_at: Millis,
    },
}

/// Result of applying a verified charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PremiumOutcome {
    /// Effect applied now.
    Applied(PremiumEffect),
    /// This charge was applied before; nothing changed.
    AlreadyApplied,
}

/// Resolve a premium item id for invoicing.
pub fn premium_item<'a>(catalog: &'a Catalog, item_id: &str) -> Result<PremiumItem<'a>, EngineError> {
    if let Some(item) = catalog.premium_item(item_id) {
        return Ok(item);
    }
    match FamilyId::parse(item_id) {
        Ok(family) if catalog.creatures().contains_family(&family) => {
            Err(EngineError::NotPremiumItem(item_id.to_string()))
        }
        _ => Err(EngineError::UnknownItem(item_id.to_string())),
    }
}

impl GameState {
    /// Buy a creature with resources.
    ///
    /// The price always comes from the catalog; `quoted` is the price the
    /// client displayed and must match when given.
    pub fn buy_creature(
        &mut self,
        catalog: &Catalog,
        family: &FamilyId,
        level: u32,
        quoted: Option<Cost>,
        now: Millis,
    ) -> Result<PurchaseOutcome, EngineError> {
        let def = catalog
            .creature(family, level)
            .ok_or_else(|| EngineError::UnknownCreature {
                family: family.clone(),
                level,
            })?;
        let cost = def.unlock_cost.ok_or_else(|| EngineError::NotForSale {
            family: family.clone(),
            level,
        })?;
        if let Some(quoted) = quoted {
            if quoted != cost {
                return Err(EngineError::PriceMismatch {
                    quoted,
                    actual: cost,
                });
            }
        }
        if !self.resources.can_afford(&cost) {
            return Err(EngineError::InsufficientResources {
                required: cost,
                available: self.resources,
            });
        }
        let slot = self.grid.first_free_unlocked().ok_or(EngineError::NoFreeSlot)?;

        let creature = self.mint_creature(family.clone(), level, now);
        let creature_id = creature.id.clone();
        self.grid.place(slot, creature);
        self.resources.debit(&cost);
        self.discovery.record_encounter(family, level, now);

        info!(player = %self.owner, %family, level, slot, %cost, "creature bought");
        Ok(PurchaseOutcome {
            slot,
            creature_id,
            cost,
        })
    }

    /// Apply the effect of a premium item whose payment was verified under
    /// `charge_ref`. A charge is applied at most once.
    pub fn apply_premium(
        &mut self,
        catalog: &Catalog,
        charge_ref: &str,
        item_id: &str,
        now: Millis,
    ) -> Result<PremiumOutcome, EngineError> {
        if self.processed_charges.contains(charge_ref) {
            return Ok(PremiumOutcome::AlreadyApplied);
        }
        let effect = match premium_item(catalog, item_id)? {
            PremiumItem::Item(item) => match item.effect {
                ShopEffect::ExtraSlots { slots } => {
                    PremiumEffect::SlotsUnlocked(self.grid.unlock(slots))
                }
                ShopEffect::NoAds => {
                    self.no_ads = true;
                    PremiumEffect::NoAds
                }
                ShopEffect::Cosmetic => {
                    self.cosmetics.insert(item.id.clone());
                    PremiumEffect::Cosmetic(item.id.clone())
                }
            },
            PremiumItem::Subscription(offer) => {
                let expires_at = now.advance(offer.duration_days.saturating_mul(MS_PER_DAY));
                self.subscription.tier = offer.tier;
                self.subscription.expires_at = Some(expires_at);
                if offer.grants_no_ads {
                    self.no_ads = true;
                }
                PremiumEffect::Subscribed {
                    tier: offer.tier,
                    expires_at,
                }
            }
        };
        self.processed_charges.insert(charge_ref.to_string());
        info!(player = %self.owner, charge_ref, item_id, ?effect, "premium purchase applied");
        Ok(PremiumOutcome::Applied(effect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_core::{PlayerId, Resources};

    fn state() -> (Catalog, GameState) {
        let catalog = Catalog::builtin().unwrap();
        let state = GameState::new_player(&catalog, PlayerId(8), "CODE0008".into(), Millis(0));
        (catalog, state)
    }

    fn family(name: &str) -> FamilyId {
        FamilyId::parse(name).unwrap()
    }

    #[test]
    fn buys_into_first_free_slot() {
        let (catalog, mut state) = state();
        state.resources = Resources::new(100, 10, 0);
        let outcome = state
            .buy_creature(&catalog, &family("forest_fox"), 1, Some(Resources::new(50, 5, 0)), Millis(9))
            .unwrap();
        assert_eq!(outcome.slot, 3);
        assert_eq!(state.resources, Resources::new(50, 5, 0));
        let entry = state.discovery.get(&family("forest_fox"), 1).unwrap();
        assert_eq!(entry.total_merged, 0);
        assert_eq!(state.grid.get(3).unwrap().last_collected_at, Millis(9));
    }

    #[test]
    fn quoted_price_must_match_catalog() {
        let (catalog, mut state) = state();
        state.resources = Resources::new(100, 10, 0);
        let err = state
            .buy_creature(&catalog, &family("forest_fox"), 1, Some(Resources::ZERO), Millis(9))
            .unwrap_err();
        assert!(matches!(err, EngineError::PriceMismatch { .. }));
        assert_eq!(state.resources, Resources::new(100, 10, 0));
    }

    #[test]
    fn higher_levels_are_not_sold() {
        let (catalog, mut state) = state();
        assert!(matches!(
            state.buy_creature(&catalog, &family("fairy_cat"), 3, None, Millis(1)),
            Err(EngineError::NotForSale { .. })
        ));
        assert!(matches!(
            state.buy_creature(&catalog, &family("fairy_cat"), 9, None, Millis(1)),
            Err(EngineError::UnknownCreature { .. })
        ));
    }

    #[test]
    fn full_grid_rejects_purchase_without_debit() {
        let (catalog, mut state) = state();
        for _ in 3..15 {
            state.buy_creature(&catalog, &family("fairy_cat"), 1, None, Millis(1)).unwrap();
        }
        state.resources = Resources::new(500, 0, 0);
        assert_eq!(
            state.buy_creature(&catalog, &family("mushroom_sprite"), 1, None, Millis(1)),
            Err(EngineError::NoFreeSlot)
        );
        assert_eq!(state.resources, Resources::new(500, 0, 0));
    }

    #[test]
    fn extra_slots_cap_at_grid_size() {
        let (catalog, mut state) = state();
        for n in 0..6 {
            state.apply_premium(&catalog, &format!("ch_{n}"), "extra_slots_5", Millis(1)).unwrap();
        }
        assert_eq!(state.grid.unlocked_slots(), 40);
    }

    #[test]
    fn duplicate_charge_is_not_reapplied() {
        let (catalog, mut state) = state();
        let first = state.apply_premium(&catalog, "ch_1", "extra_slots_5", Millis(1)).unwrap();
        assert_eq!(first, PremiumOutcome::Applied(PremiumEffect::SlotsUnlocked(20)));
        let second = state.apply_premium(&catalog, "ch_1", "extra_slots_5", Millis(2)).unwrap();
        assert_eq!(second, PremiumOutcome::AlreadyApplied);
        assert_eq!(state.grid.unlocked_slots(), 20);
    }

    #[test]
    fn subscription_sets_tier_and_expiry() {
        let (catalog, mut state) = state();
        let now = Millis::from_hours(5);
        state.apply_premium(&catalog, "ch_sub", "enchanted", now).unwrap();
        assert_eq!(state.effective_tier(now), SubscriptionTier::Enchanted);
        assert!(state.no_ads);
        let expiry = now.advance(30 * MS_PER_DAY);
        assert_eq!(state.subscription.expires_at, Some(expiry));
        assert_eq!(state.effective_tier(expiry), SubscriptionTier::None);
    }

    #[test]
    fn unknown_and_non_premium_items() {
        let (catalog, mut state) = state();
        assert_eq!(
            state.apply_premium(&catalog, "ch_x", "golden_hoe", Millis(1)),
            Err(EngineError::UnknownItem("golden_hoe".into()))
        );
        assert_eq!(
            state.apply_premium(&catalog, "ch_x", "fairy_cat", Millis(1)),
            Err(EngineError::NotPremiumItem("fairy_cat".into()))
        );
        assert!(state.processed_charges.is_empty());
    }
}
