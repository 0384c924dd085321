#![warn(missing_docs)]
//! Authoritative merge-game rules over an explicit [`GameState`].
//!
//! Every operation takes the catalog and the current instant as arguments and
//! either commits completely or returns an [`EngineError`] with the state
//! untouched. Nothing here reads the clock, performs IO, or locks; callers
//! serialize access per player.

mod actions;
mod discovery;
mod error;
pub mod grid;
mod merge;
mod offline;
pub mod production;
mod progression;
mod quests;
mod referral;
mod shop;
mod state;

pub use actions::{CollectOutcome, TapOutcome};
pub use discovery::{DiscoveryEntry, DiscoveryLedger};
pub use error::{EngineError, ErrorKind};
pub use grid::{CreatureId, Grid, GridCreature, Selection};
pub use merge::MergeOutcome;
pub use offline::{OfflineReport, SkipReason};
pub use progression::Progression;
pub use quests::{Quest, QuestEvent, QuestLog};
pub use referral::ReferralGiftOutcome;
pub use shop::{premium_item, PremiumEffect, PremiumOutcome, PurchaseOutcome};
pub use state::{GameState, ReferralInfo, Subscription};
