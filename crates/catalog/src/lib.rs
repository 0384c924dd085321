#![warn(missing_docs)]
//! Static game catalog: creature levels, shop, subscriptions, quest
//! templates and rules, loaded from JSON and validated once.

mod loader;
mod quests;
mod registry;
mod rules;
mod shop;

pub use loader::{catalog_from_file, catalog_from_str};
pub use quests::{QuestKind, QuestTemplate};
pub use registry::{CreatureLevelDef, CreatureRegistry};
pub use rules::{GameRules, ReferralGift, StarterCreature, StarterLayout};
pub use shop::{PremiumItem, ShopEffect, ShopItem, SubscriptionOffer};

use grove_core::FamilyId;
use thiserror::Error;

/// Catalog shipped with the binary.
const BUILTIN_CATALOG: &str = include_str!("../../../config/catalog.json");

/// Errors emitted while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Wrap IO errors when reading catalog files.
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    /// Wrap serde parsing issues.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    /// Data parsed but is inconsistent.
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

/// Read-only reference data consumed by the engine.
#[derive(Debug, Clone)]
pub struct Catalog {
    version: u32,
    rules: GameRules,
    creatures: CreatureRegistry,
    shop: Vec<ShopItem>,
    subscriptions: Vec<SubscriptionOffer>,
    quest_templates: Vec<QuestTemplate>,
}

impl Catalog {
    /// Parse and validate the built-in catalog.
    pub fn builtin() -> Result<Self, CatalogError> {
        catalog_from_str(BUILTIN_CATALOG)
    }

    /// Data version declared by the file.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Global rules.
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Creature definitions.
    pub fn creatures(&self) -> &CreatureRegistry {
        &self.creatures
    }

    /// Definition for `(family, level)`.
    pub fn creature(&self, family: &FamilyId, level: u32) -> Option<&CreatureLevelDef> {
        self.creatures.get(family, level)
    }

    /// Premium shop items.
    pub fn shop_items(&self) -> &[ShopItem] {
        &self.shop
    }

    /// Subscription offers.
    pub fn subscriptions(&self) -> &[SubscriptionOffer] {
        &self.subscriptions
    }

    /// Quest templates in file order.
    pub fn quest_templates(&self) -> &[QuestTemplate] {
        &self.quest_templates
    }

    /// Resolve a premium item id (shop item or subscription tier name).
    pub fn premium_item(&self, id: &str) -> Option<PremiumItem<'_>> {
        if let Some(item) = self.shop.iter().find(|item| item.id == id) {
            return Some(PremiumItem::Item(item));
        }
        self.subscriptions
            .iter()
            .find(|offer| offer.tier.as_str() == id)
            .map(PremiumItem::Subscription)
    }
}
