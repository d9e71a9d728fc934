//! Pix payment status watcher for a storefront checkout.

pub mod checkout;
pub mod config;
pub mod observability;
pub mod payments;
pub mod storefront;

pub use checkout::CheckoutController;
pub use config::schema::WatchConfig;
pub use payments::{PaymentWatcher, WatchError, WatchEvent};
pub use storefront::StorefrontClient;
