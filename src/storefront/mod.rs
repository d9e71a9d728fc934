//! Storefront HTTP boundary.
//!
//! # Data Flow
//! ```text
//! CheckoutForm / SaleForm
//!     → client.rs (form-encoded POST, CSRF + session headers)
//!     → CheckoutReceipt (order id, Pix code, QR code, summary)
//!
//! Cart change (product id + quantity or CartAction)
//!     → client.rs (form-encoded POST)
//!     → CartSnapshot
//!
//! Watcher tick
//!     → client.rs (GET status endpoint)
//!     → StatusReport
//! ```
//!
//! # Design Decisions
//! - The server owns pricing, stock and the payment gateway; this side only
//!   forwards forms and reads results
//! - Error bodies are read for an `error` message before falling back to a
//!   generic one

pub mod client;
pub mod forms;

pub use client::{MarkPaidResponse, StorefrontClient};
pub use forms::{CartAction, CheckoutForm, SaleForm, SaleItem};
