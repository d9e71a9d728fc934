//! Payment watching types.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Server-assigned order reference.
///
/// The storefront returns either a JSON number or a string; both are kept as
/// their textual form since the id is only ever echoed back into URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n.to_string())),
            Raw::Text(s) => Ok(Self(s)),
        }
    }
}

/// Server-reported payment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Awaiting,
    Paid,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }
}

/// Raw body of the status endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub status_label: Option<String>,
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

/// A single status observation for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub order_id: OrderId,
    pub status: PaymentStatus,
    /// Human label supplied by the server (e.g. "Pago").
    pub label: String,
}

impl StatusReport {
    /// Build a report from a status payload, falling back to `default_label`
    /// when the server omits one.
    pub fn from_payload(requested: &OrderId, payload: StatusPayload, default_label: &str) -> Self {
        let status = if payload.is_paid {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Awaiting
        };
        let label = payload
            .status_label
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| default_label.to_string());

        Self {
            order_id: payload.order_id.unwrap_or_else(|| requested.clone()),
            status,
            label,
        }
    }
}

/// Customer-facing summary captured when the order is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderSummary {
    #[serde(alias = "name")]
    pub customer_name: String,
    #[serde(alias = "whatsapp")]
    pub contact: String,
    pub total: String,
}

/// One line of a cart snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartLine {
    pub id: Option<u64>,
    pub name: String,
    pub price: String,
    pub quantity: u32,
    pub subtotal: String,
}

/// Session cart contents as returned by cart and checkout endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartSnapshot {
    pub items: Vec<CartLine>,
    pub total: String,
    pub count: u32,
}

/// Response of a checkout or staff sale submission.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status_label: String,
    #[serde(default)]
    pub pix_code: Option<String>,
    #[serde(default)]
    pub qr_code_base64: Option<String>,
    #[serde(default)]
    pub cart: Option<CartSnapshot>,
    #[serde(default)]
    pub order_summary: Option<OrderSummary>,
    #[serde(default)]
    pub print_url: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
}

impl CheckoutReceipt {
    /// Only unpaid Pix orders have anything to wait for.
    pub fn awaits_pix_payment(&self) -> bool {
        !self.is_paid && self.qr_code_base64.as_deref().is_some_and(|qr| !qr.is_empty())
    }
}

/// Emitted once per watch session when the order is first observed paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Approval {
    pub order_id: OrderId,
    pub label: String,
    pub summary: Option<OrderSummary>,
}

/// Lifecycle phase of a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
    Idle,
    Polling,
    /// Stopped after emitting the approval notification.
    Approved,
    /// Stopped after a failed status check.
    Failed,
}
