//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the watcher.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Placeholder substituted with the order id in endpoint paths.
pub const ORDER_ID_PLACEHOLDER: &str = "{order_id}";

/// Placeholder substituted with the product id in cart endpoint paths.
pub const PRODUCT_ID_PLACEHOLDER: &str = "{product_id}";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WatchConfig {
    /// Storefront endpoints and session credentials.
    pub storefront: StorefrontConfig,

    /// Polling behaviour.
    pub watcher: WatcherConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Storefront server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Base URL of the storefront (e.g., "http://localhost:8000").
    pub base_url: String,

    /// Status endpoint path; must contain `{order_id}`.
    pub status_path: String,

    /// Add-to-cart endpoint path; must contain `{product_id}`.
    pub cart_add_path: String,

    /// Cart line update endpoint path; must contain `{product_id}`.
    pub cart_update_path: String,

    /// Checkout finalize endpoint path.
    pub finalize_path: String,

    /// Staff sale creation endpoint path.
    pub sale_path: String,

    /// Staff mark-paid endpoint path; must contain `{order_id}`.
    pub mark_paid_path: String,

    /// CSRF token sent as `X-CSRFToken` on POST requests.
    pub csrf_token: Option<String>,

    /// Raw `Cookie` header value carrying the storefront session.
    pub session_cookie: Option<String>,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            status_path: "/checkout/status/{order_id}/".to_string(),
            cart_add_path: "/cart/add/{product_id}/".to_string(),
            cart_update_path: "/cart/update/{product_id}/".to_string(),
            finalize_path: "/checkout/finalize/".to_string(),
            sale_path: "/manage/sales/create/".to_string(),
            mark_paid_path: "/manage/sales/{order_id}/mark-paid/".to_string(),
            csrf_token: None,
            session_cookie: None,
            request_timeout_secs: 10,
        }
    }
}

/// Payment status polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Label shown when the server omits one.
    pub default_status_label: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            default_status_label: "Aguardando pagamento".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
