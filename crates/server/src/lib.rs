#![warn(missing_docs)]
//! Authoritative game service over the engine.
//!
//! Owns player sessions, serializes each player's actions, writes every
//! committed change through to a [`PlayerStore`], and talks to the payment
//! and identity collaborators behind traits.

mod clock;
mod error;
mod identity;
mod payment;
pub mod persist;
mod service;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{IdentityError, PaymentError, ServiceError, StoreError};
pub use identity::{DevIdentityResolver, IdentityResolver, Profile};
pub use payment::{Invoice, InvoiceRequest, LocalPaymentGateway, PaymentGateway};
pub use persist::FileStore;
pub use service::{GameService, ServiceConfig, SessionStart};
pub use store::{MemoryStore, PlayerRecord, PlayerStore};
