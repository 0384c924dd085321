//! Daily quests as a projection of merge and collect events.

use grove_catalog::{Catalog, QuestKind};
use grove_core::{scoped_rng, FamilyId, Millis, PlayerId, ResourceKind, Resources};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::EngineError;

/// Salt separating quest draws from other per-player randomness.
const QUEST_DOMAIN: u64 = 0x5155_4553;

/// Active quest instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    /// `q_<hex>` identifier.
    pub id: String,
    /// Counter kind.
    pub kind: QuestKind,
    /// Family counted by `collect_type` quests.
    pub target_family: Option<FamilyId>,
    /// Resource counted by collect quests.
    pub target_resource: Option<ResourceKind>,
    /// Amount needed.
    pub target_amount: u64,
    /// Progress, never above `target_amount`.
    pub current_amount: u64,
    /// Granted on claim.
    pub rewards: Resources,
    /// `current_amount == target_amount`; never reverts.
    pub completed: bool,
    /// Claim instant.
    pub claimed_at: Option<Millis>,
}

impl Quest {
    fn is_inert(&self) -> bool {
        self.completed || self.claimed_at.is_some() || self.kind == QuestKind::Login
    }

    fn advance(&mut self, amount: u64) {
        self.current_amount = self
            .current_amount
            .saturating_add(amount)
            .min(self.target_amount);
        self.completed = self.current_amount == self.target_amount;
    }
}

/// Gameplay event quests react to.
#[derive(Debug, Clone, Copy)]
pub enum QuestEvent<'a> {
    /// One merge.
    Merge,
    /// A harvest from one creature.
    Collect {
        /// Family of the harvesting creature.
        family: &'a FamilyId,
        /// Resources just added.
        earned: Resources,
    },
}

/// Active quests plus the last refresh instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestLog {
    /// Active quests.
    pub quests: Vec<Quest>,
    /// When the current set was drawn.
    pub last_reset: Millis,
}

impl QuestLog {
    /// Draw a fresh daily set for `owner` at `now`.
    ///
    /// The draw depends only on the owner and the day of `now`, so replaying
    /// the same state at the same time gives the same quests.
    pub fn draw(catalog: &Catalog, owner: PlayerId, now: Millis) -> Self {
        let mut rng = scoped_rng(owner, now.day_index() ^ QUEST_DOMAIN);
        let count = catalog.rules().daily_quest_count;
        let picks: Vec<_> = catalog
            .quest_templates()
            .choose_multiple(&mut rng, count)
            .collect();
        let quests = picks
            .into_iter()
            .map(|template| Quest {
                id: format!("q_{:08x}", rng.gen::<u32>()),
                kind: template.kind,
                target_family: template.target_family.clone(),
                target_resource: template.target_resource,
                target_amount: template.target_amount,
                current_amount: 0,
                rewards: template.rewards,
                completed: false,
                claimed_at: None,
            })
            .collect();
        Self {
            quests,
            last_reset: now,
        }
    }

    /// Replace the set when more than the reset period has passed.
    pub fn refresh_if_due(&mut self, catalog: &Catalog, owner: PlayerId, now: Millis) -> bool {
        if now.since(self.last_reset) <= catalog.rules().quest_reset_ms() {
            return false;
        }
        *self = Self::draw(catalog, owner, now);
        debug!(player = %owner, quests = self.quests.len(), "daily quests refreshed");
        true
    }

    /// Apply one event to every active quest it concerns.
    pub fn record(&mut self, event: QuestEvent<'_>) {
        for quest in self.quests.iter_mut().filter(|q| !q.is_inert()) {
            let amount = match (quest.kind, event) {
                (QuestKind::Merge, QuestEvent::Merge) => 1,
                (QuestKind::Collect, QuestEvent::Collect { earned, .. }) => {
                    match quest.target_resource {
                        Some(resource) => earned.get(resource),
                        None => continue,
                    }
                }
                (QuestKind::CollectType, QuestEvent::Collect { family, earned })
                    if quest.target_family.as_ref() == Some(family) =>
                {
                    match quest.target_resource {
                        Some(resource) => earned.get(resource),
                        None => continue,
                    }
                }
                _ => continue,
            };
            quest.advance(amount);
        }
    }

    /// Quest by id.
    pub fn get(&self, id: &str) -> Option<&Quest> {
        self.quests.iter().find(|q| q.id == id)
    }

    /// Stamp a completed quest as claimed and return its rewards.
    /// The caller credits the rewards.
    pub fn claim(&mut self, id: &str, now: Millis) -> Result<Resources, EngineError> {
        let quest = self
            .quests
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| EngineError::UnknownQuest(id.to_string()))?;
        if !quest.completed {
            return Err(EngineError::QuestNotCompleted(id.to_string()));
        }
        if quest.claimed_at.is_some() {
            return Err(EngineError::QuestAlreadyClaimed(id.to_string()));
        }
        quest.claimed_at = Some(now);
        Ok(quest.rewards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quest(kind: QuestKind, target: u64) -> Quest {
        Quest {
            id: "q_1".into(),
            kind,
            target_family: None,
            target_resource: None,
            target_amount: target,
            current_amount: 0,
            rewards: Resources::new(50, 5, 0),
            completed: false,
            claimed_at: None,
        }
    }

    fn log(quests: Vec<Quest>) -> QuestLog {
        QuestLog {
            quests,
            last_reset: Millis::ZERO,
        }
    }

    #[test]
    fn collect_counts_target_resource_and_clamps() {
        let mut q = quest(QuestKind::Collect, 50);
        q.target_resource = Some(ResourceKind::Dew);
        let mut log = log(vec![q]);
        let cat = FamilyId::parse("fairy_cat").unwrap();
        log.record(QuestEvent::Collect {
            family: &cat,
            earned: Resources::new(100, 30, 0),
        });
        assert_eq!(log.quests[0].current_amount, 30);
        log.record(QuestEvent::Collect {
            family: &cat,
            earned: Resources::new(0, 30, 0),
        });
        assert_eq!(log.quests[0].current_amount, 50);
        assert!(log.quests[0].completed);
    }

    #[test]
    fn collect_type_filters_by_family() {
        let mut q = quest(QuestKind::CollectType, 30);
        q.target_family = Some(FamilyId::parse("fairy_cat").unwrap());
        q.target_resource = Some(ResourceKind::Leaves);
        let mut log = log(vec![q]);
        let fox = FamilyId::parse("forest_fox").unwrap();
        log.record(QuestEvent::Collect {
            family: &fox,
            earned: Resources::new(10, 0, 0),
        });
        assert_eq!(log.quests[0].current_amount, 0);
        let cat = FamilyId::parse("fairy_cat").unwrap();
        log.record(QuestEvent::Collect {
            family: &cat,
            earned: Resources::new(10, 0, 0),
        });
        assert_eq!(log.quests[0].current_amount, 10);
    }

    #[test]
    fn collect_quest_without_resource_never_advances() {
        let mut log = log(vec![quest(QuestKind::Collect, 10)]);
        let cat = FamilyId::parse("fairy_cat").unwrap();
        log.record(QuestEvent::Collect {
            family: &cat,
            earned: Resources::new(10, 10, 10),
        });
        assert_eq!(log.quests[0].current_amount, 0);
        assert!(!log.quests[0].completed);
    }

    #[test]
    fn merge_events_ignore_collect_quests() {
        let mut log = log(vec![quest(QuestKind::Collect, 10), quest(QuestKind::Login, 1)]);
        log.record(QuestEvent::Merge);
        assert_eq!(log.quests[0].current_amount, 0);
        assert_eq!(log.quests[1].current_amount, 0);
    }

    #[test]
    fn claim_flow() {
        let mut log = log(vec![quest(QuestKind::Merge, 1)]);
        assert_eq!(
            log.claim("q_1", Millis(1)),
            Err(EngineError::QuestNotCompleted("q_1".into()))
        );
        log.record(QuestEvent::Merge);
        assert_eq!(log.claim("q_1", Millis(2)), Ok(Resources::new(50, 5, 0)));
        assert_eq!(
            log.claim("q_1", Millis(3)),
            Err(EngineError::QuestAlreadyClaimed("q_1".into()))
        );
        assert_eq!(log.get("q_1").unwrap().claimed_at, Some(Millis(2)));
        assert_eq!(
            log.claim("q_x", Millis(3)),
            Err(EngineError::UnknownQuest("q_x".into()))
        );
    }

    #[test]
    fn draw_is_deterministic_per_day() {
        let catalog = Catalog::builtin().unwrap();
        let now = Millis::from_hours(30);
        let a = QuestLog::draw(&catalog, PlayerId(9), now);
        let b = QuestLog::draw(&catalog, PlayerId(9), now.advance(1_000));
        assert_eq!(a.quests, b.quests);
        assert_eq!(a.quests.len(), 4);
        assert!(a.quests.iter().all(|q| q.id.starts_with("q_") && q.current_amount == 0));
    }

    #[test]
    fn refresh_only_after_period() {
        let catalog = Catalog::builtin().unwrap();
        let start = Millis::from_hours(1);
        let mut log = QuestLog::draw(&catalog, PlayerId(1), start);
        assert!(!log.refresh_if_due(&catalog, PlayerId(1), start.advance(24 * 3_600_000)));
        assert!(log.refresh_if_due(&catalog, PlayerId(1), start.advance(24 * 3_600_000 + 1)));
        assert_eq!(log.last_reset, start.advance(24 * 3_600_000 + 1));
    }
}
