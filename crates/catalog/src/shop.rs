//! Premium shop items and subscription offers.

use grove_core::SubscriptionTier;
use serde::Deserialize;

/// Effect of a premium item once its payment is verified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShopEffect {
    /// Raise the unlocked slot count.
    ExtraSlots {
        /// Slots added, capped at the grid size.
        slots: usize,
    },
    /// Disable ads for the account.
    NoAds,
    /// Cosmetic pack, recorded as owned.
    Cosmetic,
}

/// Item priced in premium currency.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShopItem {
    /// Stable item id used in invoices.
    pub id: String,
    /// What the item does.
    #[serde(flatten)]
    pub effect: ShopEffect,
    /// Price in stars.
    pub price_stars: u64,
}

/// Time-limited subscription for sale.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscriptionOffer {
    /// Tier granted; its name doubles as the item id.
    pub tier: SubscriptionTier,
    /// Price in stars.
    pub price_stars: u64,
    /// Duration in days.
    pub duration_days: u64,
    /// Also sets the no-ads flag.
    #[serde(default)]
    pub grants_no_ads: bool,
}

/// Anything that can be bought with premium currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PremiumItem<'a> {
    /// A shop item.
    Item(&'a ShopItem),
    /// A subscription.
    Subscription(&'a SubscriptionOffer),
}

impl PremiumItem<'_> {
    /// Item id as presented to the payment gateway.
    pub fn id(&self) -> &str {
        match self {
            PremiumItem::Item(item) => &item.id,
            PremiumItem::Subscription(offer) => offer.tier.as_str(),
        }
    }

    /// Price in stars.
    pub fn price_stars(&self) -> u64 {
        match self {
            PremiumItem::Item(item) => item.price_stars,
            PremiumItem::Subscription(offer) => offer.price_stars,
        }
    }
}
