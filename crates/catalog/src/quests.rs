//! Daily quest templates.

use grove_core::{FamilyId, ResourceKind, Resources};
use serde::{Deserialize, Serialize};

/// What a quest counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestKind {
    /// Number of merges.
    Merge,
    /// Amount of a resource collected.
    Collect,
    /// Amount of a resource collected from one family.
    CollectType,
    /// Inert; never advances.
    Login,
}

/// Template a daily quest is instantiated from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestTemplate {
    /// Counter kind.
    pub kind: QuestKind,
    /// Amount needed for completion, at least 1.
    pub target_amount: u64,
    /// Resource counted by collect quests; required for both collect kinds.
    #[serde(default)]
    pub target_resource: Option<ResourceKind>,
    /// Family counted by `collect_type` quests.
    #[serde(default)]
    pub target_family: Option<FamilyId>,
    /// Granted on claim.
    #[serde(default)]
    pub rewards: Resources,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_template_carries_its_resource() {
        let template: QuestTemplate = serde_json::from_str(
            r#"{"kind": "collect", "target_amount": 10, "target_resource": "dew"}"#,
        )
        .unwrap();
        assert_eq!(template.target_resource, Some(ResourceKind::Dew));
        assert!(template.rewards.is_zero());
    }
}
