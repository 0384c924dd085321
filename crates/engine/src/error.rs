//! Rejection reasons for gameplay actions.

use grove_core::{Cost, FamilyId, Resources};
use thiserror::Error;

/// How a rejection should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request: bad index, locked slot, unknown id.
    Validation,
    /// Expected gameplay outcome the caller reports to the player.
    Outcome,
}

/// Every way an engine operation can be rejected. State is unchanged
/// whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Index beyond the grid.
    #[error("slot {index} is outside the grid (size {size})")]
    InvalidSlot {
        /// Requested index.
        index: usize,
        /// Grid length.
        size: usize,
    },
    /// Index at or beyond the unlocked boundary.
    #[error("slot {index} is locked ({unlocked} unlocked)")]
    LockedSlot {
        /// Requested index.
        index: usize,
        /// Unlocked slot count.
        unlocked: usize,
    },
    /// No creature in the slot.
    #[error("slot {0} is empty")]
    EmptySlot(usize),
    /// Creatures differ in family or level.
    #[error("creatures in slots {from} and {to} cannot merge")]
    NotMergeable {
        /// Source slot.
        from: usize,
        /// Target slot.
        to: usize,
    },
    /// Both creatures are already at the top level.
    #[error("{family} is already at max level {level}")]
    MaxLevelReached {
        /// Family of the creatures.
        family: FamilyId,
        /// Their level.
        level: u32,
    },
    /// Wallet does not cover the price.
    #[error("insufficient resources: need {required}, have {available}")]
    InsufficientResources {
        /// Price.
        required: Cost,
        /// Balance at the time of the check.
        available: Resources,
    },
    /// Every unlocked slot is occupied.
    #[error("no free slot")]
    NoFreeSlot,
    /// `(family, level)` is not in the catalog.
    #[error("unknown creature {family} level {level}")]
    UnknownCreature {
        /// Requested family.
        family: FamilyId,
        /// Requested level.
        level: u32,
    },
    /// Known creature without a shop price.
    #[error("{family} level {level} is not for sale")]
    NotForSale {
        /// Requested family.
        family: FamilyId,
        /// Requested level.
        level: u32,
    },
    /// Client-quoted price differs from the catalog.
    #[error("price mismatch: quoted {quoted}, actual {actual}")]
    PriceMismatch {
        /// Price the client sent.
        quoted: Cost,
        /// Catalog price.
        actual: Cost,
    },
    /// Item id not found in the shop or subscriptions.
    #[error("unknown item '{0}'")]
    UnknownItem(String),
    /// Item exists but is not bought with premium currency.
    #[error("item '{0}' is not a premium item")]
    NotPremiumItem(String),
    /// No active quest with this id.
    #[error("quest '{0}' not found")]
    UnknownQuest(String),
    /// Quest not yet completed.
    #[error("quest '{0}' is not yet completed")]
    QuestNotCompleted(String),
    /// Quest rewards already taken.
    #[error("quest '{0}' was already claimed")]
    QuestAlreadyClaimed(String),
    /// Player already has a referrer.
    #[error("referral already used")]
    ReferralAlreadyUsed,
    /// Player tried to use their own code.
    #[error("cannot use own referral code")]
    SelfReferral,
}

impl EngineError {
    /// Classify the rejection.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InsufficientResources { .. }
            | EngineError::NoFreeSlot
            | EngineError::MaxLevelReached { .. }
            | EngineError::QuestNotCompleted(_)
            | EngineError::QuestAlreadyClaimed(_)
            | EngineError::ReferralAlreadyUsed => ErrorKind::Outcome,
            _ => ErrorKind::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_are_separated_from_validation() {
        assert_eq!(EngineError::NoFreeSlot.kind(), ErrorKind::Outcome);
        assert_eq!(
            EngineError::LockedSlot { index: 20, unlocked: 15 }.kind(),
            ErrorKind::Validation
        );
        let err = EngineError::InsufficientResources {
            required: Resources::new(50, 5, 0),
            available: Resources::new(49, 5, 0),
        };
        assert_eq!(err.kind(), ErrorKind::Outcome);
        assert!(err.to_string().contains("need 50 leaves"));
    }
}
