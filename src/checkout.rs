//! Checkout controller.
//!
//! Ties a submission to the payment watcher: one order is "current" at a
//! time, and its Pix code stays available for copying until the next
//! submission.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::WatchConfig;
use crate::payments::error::{WatchError, WatchResult};
use crate::payments::types::{CheckoutReceipt, OrderId, OrderSummary};
use crate::payments::watcher::{PaymentWatcher, WatchListener};
use crate::storefront::{CheckoutForm, MarkPaidResponse, SaleForm, StorefrontClient};

#[derive(Debug, Clone)]
struct CurrentOrder {
    order_id: OrderId,
    pix_code: Option<String>,
}

/// Drives checkout and staff sale flows for a single payment panel.
pub struct CheckoutController {
    client: Arc<StorefrontClient>,
    watcher: PaymentWatcher,
    current: Mutex<Option<CurrentOrder>>,
}

impl CheckoutController {
    pub fn new(client: StorefrontClient, listener: Arc<dyn WatchListener>, interval: Duration) -> Self {
        let client = Arc::new(client);
        let watcher = PaymentWatcher::new(client.clone(), listener, interval);
        Self {
            client,
            watcher,
            current: Mutex::new(None),
        }
    }

    pub fn from_config(config: &WatchConfig, listener: Arc<dyn WatchListener>) -> WatchResult<Self> {
        let client = StorefrontClient::from_config(config)?;
        Ok(Self::new(
            client,
            listener,
            Duration::from_millis(config.watcher.poll_interval_ms),
        ))
    }

    pub fn watcher(&self) -> &PaymentWatcher {
        &self.watcher
    }

    pub fn client(&self) -> &StorefrontClient {
        &self.client
    }

    /// Finalize a customer checkout and start watching its Pix payment.
    pub async fn submit_checkout(&self, form: &CheckoutForm) -> WatchResult<CheckoutReceipt> {
        let receipt = self.client.finalize_checkout(form).await?;
        let fallback = OrderSummary {
            customer_name: format!("{} {}", form.first_name, form.last_name).trim().to_string(),
            contact: form.whatsapp.clone(),
            total: String::new(),
        };
        self.begin(&receipt, fallback);
        Ok(receipt)
    }

    /// Register a staff sale and start watching its Pix payment.
    pub async fn submit_sale(&self, form: &SaleForm) -> WatchResult<CheckoutReceipt> {
        let receipt = self.client.create_sale(form).await?;
        let fallback = OrderSummary {
            customer_name: form.customer_name.clone(),
            contact: form.whatsapp.clone(),
            total: String::new(),
        };
        self.begin(&receipt, fallback);
        Ok(receipt)
    }

    fn begin(&self, receipt: &CheckoutReceipt, fallback: OrderSummary) {
        self.watcher.stop();
        *self.lock_current() = Some(CurrentOrder {
            order_id: receipt.order_id.clone(),
            pix_code: receipt.pix_code.clone().filter(|code| !code.is_empty()),
        });

        if receipt.awaits_pix_payment() {
            let summary = receipt.order_summary.clone().unwrap_or(fallback);
            self.watcher.start_with_summary(receipt.order_id.clone(), Some(summary));
        } else {
            tracing::info!(
                order_id = %receipt.order_id,
                is_paid = receipt.is_paid,
                "No Pix payment to watch"
            );
        }
    }

    /// Payment panel closed.
    pub fn close(&self) {
        self.watcher.stop();
    }

    pub fn current_order(&self) -> Option<OrderId> {
        self.lock_current().as_ref().map(|c| c.order_id.clone())
    }

    /// Pix copy-paste code of the current order.
    pub fn pix_code(&self) -> WatchResult<String> {
        self.lock_current()
            .as_ref()
            .and_then(|c| c.pix_code.clone())
            .ok_or(WatchError::PixCodeUnavailable)
    }

    /// Staff approval of the current order without waiting for the gateway.
    pub async fn mark_paid(&self) -> WatchResult<MarkPaidResponse> {
        let order_id = self.current_order().ok_or(WatchError::NoActiveOrder)?;
        let response = self.client.mark_paid(&order_id).await?;
        self.watcher.stop();
        Ok(response)
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<CurrentOrder>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
