use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use grove_core::{Cost, FamilyId, Resources};
use serde::Deserialize;
use tracing::debug;

use crate::{
    Catalog, CatalogError, CreatureLevelDef, CreatureRegistry, GameRules, QuestKind,
    QuestTemplate, ShopEffect, ShopItem, SubscriptionOffer,
};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    version: u32,
    rules: GameRules,
    families: Vec<FamilyDefinition>,
    #[serde(default)]
    shop: Vec<ShopItem>,
    #[serde(default)]
    subscriptions: Vec<SubscriptionOffer>,
    #[serde(default)]
    quest_templates: Vec<QuestTemplate>,
}

#[derive(Debug, Deserialize)]
struct FamilyDefinition {
    id: FamilyId,
    levels: Vec<LevelDefinition>,
}

#[derive(Debug, Deserialize)]
struct LevelDefinition {
    level: u32,
    name: String,
    #[serde(default)]
    production: Resources,
    interval_sec: u64,
    #[serde(default)]
    unlock_cost: Option<Cost>,
}

/// Load a catalog from the provided JSON file path.
pub fn catalog_from_file(path: &Path) -> Result<Catalog, CatalogError> {
    let data = fs::read_to_string(path)?;
    catalog_from_str(&data)
}

/// Load a catalog from an in-memory JSON string.
pub fn catalog_from_str(input: &str) -> Result<Catalog, CatalogError> {
    let file: CatalogFile = serde_json::from_str(input)?;
    let creatures = build_registry(&file.families, file.rules.max_creature_level)?;
    validate_rules(&file.rules, &creatures)?;
    validate_shop(&file.shop, &file.subscriptions)?;
    validate_quests(&file.quest_templates, &creatures)?;

    debug!(
        version = file.version,
        creatures = creatures.len(),
        quests = file.quest_templates.len(),
        "catalog loaded"
    );

    Ok(Catalog {
        version: file.version,
        rules: file.rules,
        creatures,
        shop: file.shop,
        subscriptions: file.subscriptions,
        quest_templates: file.quest_templates,
    })
}

fn invalid(message: impl Into<String>) -> CatalogError {
    CatalogError::Invalid(message.into())
}

fn build_registry(
    families: &[FamilyDefinition],
    max_level: u32,
) -> Result<CreatureRegistry, CatalogError> {
    if max_level == 0 {
        return Err(invalid("max_creature_level must be at least 1"));
    }
    let mut seen = BTreeSet::new();
    let mut defs = Vec::new();
    for family in families {
        if !seen.insert(family.id.clone()) {
            return Err(invalid(format!("duplicate family '{}'", family.id)));
        }
        if family.levels.len() != max_level as usize {
            return Err(invalid(format!(
                "family '{}' defines {} levels, expected {}",
                family.id,
                family.levels.len(),
                max_level
            )));
        }
        let mut levels: Vec<&LevelDefinition> = family.levels.iter().collect();
        levels.sort_by_key(|def| def.level);
        for (expected, def) in (1..).zip(levels) {
            if def.level != expected {
                return Err(invalid(format!(
                    "family '{}' levels must be contiguous from 1 (found {} where {} expected)",
                    family.id, def.level, expected
                )));
            }
            if def.interval_sec == 0 {
                return Err(invalid(format!(
                    "family '{}' level {} has a zero interval",
                    family.id, def.level
                )));
            }
            defs.push(CreatureLevelDef {
                family: family.id.clone(),
                level: def.level,
                name: def.name.clone(),
                production: def.production,
                interval_sec: def.interval_sec,
                unlock_cost: def.unlock_cost,
            });
        }
    }
    if defs.is_empty() {
        return Err(invalid("catalog defines no creatures"));
    }
    Ok(CreatureRegistry::new(defs))
}

fn validate_rules(rules: &GameRules, creatures: &CreatureRegistry) -> Result<(), CatalogError> {
    if rules.grid_size == 0 {
        return Err(invalid("grid_size must be positive"));
    }
    if rules.default_unlocked_slots > rules.grid_size {
        return Err(invalid("default_unlocked_slots exceeds grid_size"));
    }
    if rules.starter.creatures.len() > rules.default_unlocked_slots {
        return Err(invalid("starter layout does not fit the unlocked slots"));
    }
    for starter in &rules.starter.creatures {
        if creatures.get(&starter.family, starter.level).is_none() {
            return Err(invalid(format!(
                "starter creature '{}' level {} is not defined",
                starter.family, starter.level
            )));
        }
    }
    let gift = &rules.referral_gift;
    if creatures.get(&gift.family, gift.level).is_none() {
        return Err(invalid(format!(
            "referral gift '{}' level {} is not defined",
            gift.family, gift.level
        )));
    }
    if rules.xp_base == 0 || rules.xp_growth.is_nan() || rules.xp_growth < 1.0 {
        return Err(invalid("leveling curve must start positive and never shrink"));
    }
    Ok(())
}

fn validate_shop(shop: &[ShopItem], subscriptions: &[SubscriptionOffer]) -> Result<(), CatalogError> {
    let mut ids = BTreeSet::new();
    for item in shop {
        if !ids.insert(item.id.as_str()) {
            return Err(invalid(format!("duplicate shop item '{}'", item.id)));
        }
        if let ShopEffect::ExtraSlots { slots: 0 } = item.effect {
            return Err(invalid(format!("shop item '{}' adds no slots", item.id)));
        }
    }
    for offer in subscriptions {
        if !ids.insert(offer.tier.as_str()) {
            return Err(invalid(format!("duplicate premium id '{}'", offer.tier)));
        }
        if offer.duration_days == 0 {
            return Err(invalid(format!("subscription '{}' has no duration", offer.tier)));
        }
    }
    Ok(())
}

fn validate_quests(
    templates: &[QuestTemplate],
    creatures: &CreatureRegistry,
) -> Result<(), CatalogError> {
    for (index, template) in templates.iter().enumerate() {
        if template.target_amount == 0 {
            return Err(invalid(format!("quest template {index} has a zero target")));
        }
        let collects = matches!(template.kind, QuestKind::Collect | QuestKind::CollectType);
        if collects && template.target_resource.is_none() {
            return Err(invalid(format!(
                "quest template {index} collects without a target_resource"
            )));
        }
        if template.kind == QuestKind::CollectType {
            match &template.target_family {
                Some(family) if creatures.contains_family(family) => {}
                Some(family) => {
                    return Err(invalid(format!(
                        "quest template {index} targets unknown family '{family}'"
                    )))
                }
                None => {
                    return Err(invalid(format!(
                        "quest template {index} is collect_type without a target_family"
                    )))
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "rules": {
            "grid_size": 4, "default_unlocked_slots": 2, "max_creature_level": 2,
            "max_offline_hours": 8, "min_offline_ms": 30000, "quest_reset_hours": 24,
            "daily_quest_count": 1, "xp_per_merge_level": 10, "xp_base": 100, "xp_growth": 1.4,
            "starter": { "creatures": [{ "family": "fairy_cat", "level": 1 }] },
            "referral_gift": { "family": "fairy_cat", "level": 1 }
        },
        "families": [{ "id": "fairy_cat", "levels": [
            { "level": 2, "name": "b", "production": { "leaves": 3 }, "interval_sec": 30 },
            { "level": 1, "name": "a", "production": { "leaves": 1 }, "interval_sec": 30 }
        ]}]
    }"#;

    #[test]
    fn minimal_catalog_loads_with_unsorted_levels() {
        let catalog = catalog_from_str(MINIMAL).unwrap();
        let cat = FamilyId::parse("fairy_cat").unwrap();
        assert_eq!(catalog.creatures().max_level(&cat), Some(2));
        assert!(catalog.shop_items().is_empty());
    }

    #[test]
    fn rejects_gap_in_levels() {
        let broken = MINIMAL.replace("\"level\": 2, \"name\"", "\"level\": 3, \"name\"");
        let err = catalog_from_str(&broken).unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(ref msg) if msg.contains("contiguous")));
    }

    #[test]
    fn rejects_zero_interval() {
        let broken = MINIMAL.replace(
            "\"production\": { \"leaves\": 1 }, \"interval_sec\": 30",
            "\"production\": { \"leaves\": 1 }, \"interval_sec\": 0",
        );
        assert!(matches!(catalog_from_str(&broken), Err(CatalogError::Invalid(_))));
    }

    #[test]
    fn rejects_unknown_starter() {
        let broken = MINIMAL.replace(
            "\"starter\": { \"creatures\": [{ \"family\": \"fairy_cat\"",
            "\"starter\": { \"creatures\": [{ \"family\": \"baby_dragon\"",
        );
        assert!(matches!(catalog_from_str(&broken), Err(CatalogError::Invalid(_))));
    }

    #[test]
    fn rejects_collect_quest_without_resource() {
        let quests = r#""quest_templates": [{ "kind": "collect", "target_amount": 10 }],
        "families""#;
        let broken = MINIMAL.replace("\"families\"", quests);
        let err = catalog_from_str(&broken).unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(ref msg) if msg.contains("target_resource")));

        let fixed = r#""quest_templates": [
            { "kind": "collect", "target_amount": 10, "target_resource": "leaves" }],
        "families""#;
        let catalog = catalog_from_str(&MINIMAL.replace("\"families\"", fixed)).unwrap();
        assert_eq!(catalog.quest_templates().len(), 1);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(catalog_from_str("{"), Err(CatalogError::Parse(_))));
    }
}
