//! Payment status watching.

pub mod error;
pub mod types;
pub mod watcher;

pub use error::{WatchError, WatchResult};
pub use types::{Approval, CartLine, CartSnapshot, CheckoutReceipt, OrderId, OrderSummary, PaymentStatus, StatusReport, WatchPhase};
pub use watcher::{PaymentWatcher, StatusSource, WatchEvent, WatchListener};
