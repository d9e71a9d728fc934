//! Storefront HTTP client.
//!
//! # Responsibilities
//! - Read order payment status
//! - Fill the session cart
//! - Submit customer checkouts and staff sales
//! - Mark staff sales as paid
//! - Translate HTTP outcomes into `WatchError` kinds

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::config::schema::{StorefrontConfig, WatchConfig, ORDER_ID_PLACEHOLDER, PRODUCT_ID_PLACEHOLDER};
use crate::payments::error::{WatchError, WatchResult, DEFAULT_REJECTION_MESSAGE};
use crate::payments::types::{CartSnapshot, CheckoutReceipt, OrderId, StatusPayload, StatusReport};
use crate::payments::watcher::StatusSource;
use crate::storefront::forms::{CartAction, CartAddBody, CheckoutForm, SaleForm};

const CSRF_HEADER: &str = "X-CSRFToken";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Response of the staff mark-paid endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkPaidResponse {
    pub message: Option<String>,
}

/// Client for the storefront's checkout and payment endpoints.
#[derive(Clone)]
pub struct StorefrontClient {
    client: Client,
    base_url: Url,
    config: StorefrontConfig,
    default_status_label: String,
}

impl StorefrontClient {
    /// Build a client from the validated configuration.
    pub fn from_config(config: &WatchConfig) -> WatchResult<Self> {
        let storefront = config.storefront.clone();
        let base_url = Url::parse(&storefront.base_url).map_err(|e| {
            WatchError::InvalidConfig(format!("base URL '{}': {}", storefront.base_url, e))
        })?;

        let mut headers = HeaderMap::new();
        if let Some(cookie) = &storefront.session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| WatchError::InvalidConfig(format!("session cookie: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(storefront.request_timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url,
            config: storefront,
            default_status_label: config.watcher.default_status_label.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> WatchResult<Url> {
        self.endpoint_with(path, None)
    }

    /// Append `template` to the base URL. With `Some((placeholder, value))`,
    /// the segment equal to `placeholder` becomes `value`, percent-encoded as
    /// a single path segment.
    fn endpoint_with(&self, template: &str, substitution: Option<(&str, &str)>) -> WatchResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                WatchError::InvalidConfig(format!("base URL '{}' cannot carry a path", self.base_url))
            })?;
            segments.pop_if_empty();
            for segment in template.trim_start_matches('/').split('/') {
                match substitution {
                    Some((placeholder, value)) if segment == placeholder => segments.push(value),
                    _ => segments.push(segment),
                };
            }
        }
        Ok(url)
    }

    fn order_endpoint(&self, template: &str, order_id: &OrderId) -> WatchResult<Url> {
        self.endpoint_with(template, Some((ORDER_ID_PLACEHOLDER, order_id.as_str())))
    }

    fn product_endpoint(&self, template: &str, product_id: u64) -> WatchResult<Url> {
        self.endpoint_with(template, Some((PRODUCT_ID_PLACEHOLDER, &product_id.to_string())))
    }

    fn post(&self, url: Url) -> RequestBuilder {
        let builder = self.client.post(url);
        match &self.config.csrf_token {
            Some(token) => builder.header(CSRF_HEADER, token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> WatchResult<T> {
        let request_id = Uuid::new_v4().to_string();
        let request = request.header(REQUEST_ID_HEADER, &request_id).build()?;

        tracing::debug!(
            request_id = %request_id,
            method = %request.method(),
            url = %request.url(),
            "Sending storefront request"
        );

        let response = self.client.execute(request).await?;
        parse_response(response).await
    }

    /// Read the payment status of `order_id`.
    pub async fn fetch_status(&self, order_id: &OrderId) -> WatchResult<StatusReport> {
        let url = self.order_endpoint(&self.config.status_path, order_id)?;
        let request = self.client.get(url).header("X-Requested-With", "XMLHttpRequest");
        let payload: StatusPayload = self.send(request).await?;
        Ok(StatusReport::from_payload(order_id, payload, &self.default_status_label))
    }

    /// Add `quantity` units of a product to the session cart.
    pub async fn add_to_cart(&self, product_id: u64, quantity: u32) -> WatchResult<CartSnapshot> {
        let url = self.product_endpoint(&self.config.cart_add_path, product_id)?;
        let cart: CartSnapshot = self.send(self.post(url).form(&CartAddBody { quantity })).await?;
        tracing::debug!(product_id, quantity, count = cart.count, "Added to cart");
        Ok(cart)
    }

    /// Change the quantity of one cart line.
    pub async fn update_cart(&self, product_id: u64, action: CartAction) -> WatchResult<CartSnapshot> {
        let url = self.product_endpoint(&self.config.cart_update_path, product_id)?;
        let cart: CartSnapshot = self.send(self.post(url).form(&action.to_body())).await?;
        tracing::debug!(product_id, ?action, count = cart.count, "Cart updated");
        Ok(cart)
    }

    /// Finalize the session cart as a customer order.
    pub async fn finalize_checkout(&self, form: &CheckoutForm) -> WatchResult<CheckoutReceipt> {
        let url = self.endpoint(&self.config.finalize_path)?;
        let receipt: CheckoutReceipt = self.send(self.post(url).form(form)).await?;
        tracing::info!(order_id = %receipt.order_id, "Checkout finalized");
        Ok(receipt)
    }

    /// Register a staff sale.
    pub async fn create_sale(&self, form: &SaleForm) -> WatchResult<CheckoutReceipt> {
        let body = form
            .to_body()
            .map_err(|e| WatchError::MalformedResponse(format!("Unencodable sale items: {}", e)))?;
        let url = self.endpoint(&self.config.sale_path)?;
        let receipt: CheckoutReceipt = self.send(self.post(url).form(&body)).await?;
        tracing::info!(order_id = %receipt.order_id, items = form.items.len(), "Sale created");
        Ok(receipt)
    }

    /// Manually approve a staff sale.
    pub async fn mark_paid(&self, order_id: &OrderId) -> WatchResult<MarkPaidResponse> {
        let url = self.order_endpoint(&self.config.mark_paid_path, order_id)?;
        let response: MarkPaidResponse = self.send(self.post(url)).await?;
        tracing::info!(order_id = %order_id, "Sale marked as paid");
        Ok(response)
    }
}

#[async_trait]
impl StatusSource for StorefrontClient {
    async fn fetch_status(&self, order_id: &OrderId) -> WatchResult<StatusReport> {
        StorefrontClient::fetch_status(self, order_id).await
    }
}

/// Map a storefront response onto a payload or a `WatchError`.
///
/// An unparseable body counts as an empty payload: it becomes the default
/// rejection on error statuses and `MalformedResponse` on success statuses.
async fn parse_response<T: DeserializeOwned>(response: Response) -> WatchResult<T> {
    let status = response.status();
    let text = response.text().await?;
    let payload: Option<Value> = serde_json::from_str(&text).ok();

    if !status.is_success() {
        let message = payload
            .as_ref()
            .and_then(|p| p.get("error"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_REJECTION_MESSAGE)
            .to_string();
        tracing::warn!(status = status.as_u16(), error = %message, "Storefront rejected request");
        return Err(WatchError::ServerRejected {
            status: status.as_u16(),
            message,
        });
    }

    let payload = payload.ok_or_else(|| {
        WatchError::MalformedResponse(format!("expected a JSON body, got {} bytes", text.len()))
    })?;
    serde_json::from_value(payload).map_err(|e| WatchError::MalformedResponse(e.to_string()))
}
