//! Error types for the service boundary and its collaborators.

use std::time::Duration;

use grove_core::PlayerId;
use grove_engine::EngineError;
use thiserror::Error;

/// Failures of the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Record could not be encoded or decoded.
    #[error("record codec failed: {0}")]
    Codec(#[from] bincode::Error),
    /// Bytes on disk fail validation (magic, CRC, length).
    #[error("corrupt record: {0}")]
    Corrupt(String),
    /// Backend not reachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failures of the payment gateway round trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// Gateway refused or failed the request.
    #[error("gateway failure: {0}")]
    Gateway(String),
    /// No answer within the configured timeout.
    #[error("gateway timed out after {0:?}")]
    Timeout(Duration),
    /// Charge reference not known to the gateway.
    #[error("unknown charge '{0}'")]
    UnknownCharge(String),
    /// Invoice handle not known to the gateway.
    #[error("unknown invoice '{0}'")]
    UnknownInvoice(String),
    /// Charge exists but belongs to another player or item.
    #[error("charge '{0}' does not match this purchase")]
    Mismatch(String),
}

/// Identity token could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Token malformed or not verifiable.
    #[error("identity token rejected: {0}")]
    Rejected(String),
}

/// Errors returned by [`crate::GameService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Gameplay rejection; state unchanged.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Payment round trip failed; state unchanged.
    #[error(transparent)]
    Payment(#[from] PaymentError),
    /// Authentication failed.
    #[error(transparent)]
    Identity(#[from] IdentityError),
    /// Loading from the store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The action committed in memory but the durable write failed after
    /// every retry. The player stays dirty and is written by the next action
    /// or flush.
    #[error("state committed but not persisted: {0}")]
    Persistence(StoreError),
    /// Action sent before `start_session`.
    #[error("no active session for player {0}")]
    SessionNotStarted(PlayerId),
    /// No such player in the store.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    /// Referral code not assigned to anyone.
    #[error("unknown referral code '{0}'")]
    UnknownReferralCode(String),
}
