//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (interval > 0, timeout > 0)
//! - Check endpoint templates carry the order id placeholder
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WatchConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::{WatchConfig, ORDER_ID_PLACEHOLDER, PRODUCT_ID_PLACEHOLDER};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &WatchConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let storefront = &config.storefront;

    match Url::parse(&storefront.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "storefront.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("storefront.base_url", e.to_string())),
    }

    for (field, path, placeholder) in [
        ("storefront.status_path", &storefront.status_path, ORDER_ID_PLACEHOLDER),
        ("storefront.mark_paid_path", &storefront.mark_paid_path, ORDER_ID_PLACEHOLDER),
        ("storefront.cart_add_path", &storefront.cart_add_path, PRODUCT_ID_PLACEHOLDER),
        ("storefront.cart_update_path", &storefront.cart_update_path, PRODUCT_ID_PLACEHOLDER),
    ] {
        // Ids are substituted as whole path segments.
        if !path.split('/').any(|segment| segment == placeholder) {
            errors.push(ValidationError::new(
                field,
                format!("must contain {} as a path segment", placeholder),
            ));
        }
    }

    for (field, path) in [
        ("storefront.status_path", &storefront.status_path),
        ("storefront.cart_add_path", &storefront.cart_add_path),
        ("storefront.cart_update_path", &storefront.cart_update_path),
        ("storefront.finalize_path", &storefront.finalize_path),
        ("storefront.sale_path", &storefront.sale_path),
        ("storefront.mark_paid_path", &storefront.mark_paid_path),
    ] {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(field, "must start with '/'"));
        }
    }

    if storefront.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "storefront.request_timeout_secs",
            "must be greater than 0",
        ));
    }

    if config.watcher.poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "watcher.poll_interval_ms",
            "must be greater than 0",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
