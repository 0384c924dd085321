//! Payment gateway collaborator and an in-process implementation.
//!
//! The gateway issues invoices for premium items and later confirms that a
//! charge reference was actually paid. The service never mutates player
//! state on the strength of an invoice alone.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use grove_core::PlayerId;
use serde::Serialize;
use tracing::debug;

use crate::PaymentError;

/// What the service asks the gateway to bill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRequest {
    /// Paying player.
    pub player: PlayerId,
    /// Premium item id.
    pub item_id: String,
    /// Price in stars.
    pub price_stars: u64,
}

/// Invoice issued by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invoice {
    /// Opaque handle the client opens to pay.
    pub handle: String,
    /// Paying player.
    pub player: PlayerId,
    /// Premium item id.
    pub item_id: String,
    /// Price in stars.
    pub price_stars: u64,
}

/// External payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Issue an invoice. Has no effect on game state.
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<Invoice, PaymentError>;

    /// Confirm that `charge_ref` paid for `item_id` by `player`.
    async fn confirm_charge(
        &self,
        player: PlayerId,
        charge_ref: &str,
        item_id: &str,
    ) -> Result<(), PaymentError>;
}

#[derive(Debug, Default)]
struct Ledger {
    next_invoice: u64,
    invoices: HashMap<String, Invoice>,
    charges: HashMap<String, Invoice>,
}

/// In-memory gateway: invoices are paid by calling [`LocalPaymentGateway::settle`].
#[derive(Debug, Default)]
pub struct LocalPaymentGateway {
    ledger: Mutex<Ledger>,
    latency: Option<Duration>,
}

impl LocalPaymentGateway {
    /// Gateway answering immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway that waits `latency` before every answer.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            ledger: Mutex::default(),
            latency: Some(latency),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Mark an invoice as paid under `charge_ref`.
    pub fn settle(&self, invoice_handle: &str, charge_ref: &str) -> Result<(), PaymentError> {
        let mut ledger = self.ledger();
        let invoice = ledger
            .invoices
            .get(invoice_handle)
            .cloned()
            .ok_or_else(|| PaymentError::UnknownInvoice(invoice_handle.to_string()))?;
        ledger.charges.insert(charge_ref.to_string(), invoice);
        Ok(())
    }

    /// Record a paid charge without a prior invoice, as a webhook would.
    pub fn record_charge(&self, player: PlayerId, item_id: &str, charge_ref: &str) {
        let invoice = Invoice {
            handle: format!("external:{charge_ref}"),
            player,
            item_id: item_id.to_string(),
            price_stars: 0,
        };
        self.ledger().charges.insert(charge_ref.to_string(), invoice);
    }
}

#[async_trait]
impl PaymentGateway for LocalPaymentGateway {
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<Invoice, PaymentError> {
        self.delay().await;
        let mut ledger = self.ledger();
        ledger.next_invoice += 1;
        let invoice = Invoice {
            handle: format!("inv_{:06}", ledger.next_invoice),
            player: request.player,
            item_id: request.item_id,
            price_stars: request.price_stars,
        };
        ledger.invoices.insert(invoice.handle.clone(), invoice.clone());
        debug!(handle = %invoice.handle, player = %invoice.player, "invoice issued");
        Ok(invoice)
    }

    async fn confirm_charge(
        &self,
        player: PlayerId,
        charge_ref: &str,
        item_id: &str,
    ) -> Result<(), PaymentError> {
        self.delay().await;
        let ledger = self.ledger();
        let paid = ledger
            .charges
            .get(charge_ref)
            .ok_or_else(|| PaymentError::UnknownCharge(charge_ref.to_string()))?;
        if paid.player != player || paid.item_id != item_id {
            return Err(PaymentError::Mismatch(charge_ref.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(item: &str) -> InvoiceRequest {
        InvoiceRequest {
            player: PlayerId(1),
            item_id: item.to_string(),
            price_stars: 50,
        }
    }

    #[tokio::test]
    async fn unpaid_invoice_is_not_confirmed() {
        let gateway = LocalPaymentGateway::new();
        let invoice = gateway.create_invoice(request("extra_slots_5")).await.unwrap();
        assert_eq!(
            gateway.confirm_charge(PlayerId(1), "ch_1", "extra_slots_5").await,
            Err(PaymentError::UnknownCharge("ch_1".into()))
        );
        gateway.settle(&invoice.handle, "ch_1").unwrap();
        assert!(gateway.confirm_charge(PlayerId(1), "ch_1", "extra_slots_5").await.is_ok());
    }

    #[tokio::test]
    async fn charge_is_bound_to_player_and_item() {
        let gateway = LocalPaymentGateway::new();
        let invoice = gateway.create_invoice(request("no_ads")).await.unwrap();
        gateway.settle(&invoice.handle, "ch_9").unwrap();
        assert_eq!(
            gateway.confirm_charge(PlayerId(2), "ch_9", "no_ads").await,
            Err(PaymentError::Mismatch("ch_9".into()))
        );
        assert_eq!(
            gateway.confirm_charge(PlayerId(1), "ch_9", "enchanted").await,
            Err(PaymentError::Mismatch("ch_9".into()))
        );
    }

    #[test]
    fn settling_unknown_invoice_fails() {
        let gateway = LocalPaymentGateway::new();
        assert!(matches!(
            gateway.settle("inv_missing", "ch_1"),
            Err(PaymentError::UnknownInvoice(_))
        ));
    }
}
