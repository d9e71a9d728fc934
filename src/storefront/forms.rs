//! Form bodies posted to the storefront.

use serde::Serialize;

/// Customer checkout submitted from the cart.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckoutForm {
    pub first_name: String,
    pub last_name: String,
    pub whatsapp: String,
    pub payment_method: String,
}

/// Change applied to one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAction {
    Increment,
    Decrement,
    /// Replace the quantity; zero drops the line.
    Set(u32),
    Remove,
}

/// Wire shape of a cart update: removal is a `set` to zero.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub(crate) struct CartUpdateBody {
    action: &'static str,
    quantity: u32,
}

impl CartAction {
    pub(crate) fn to_body(self) -> CartUpdateBody {
        let (action, quantity) = match self {
            CartAction::Increment => ("inc", 1),
            CartAction::Decrement => ("dec", 1),
            CartAction::Set(quantity) => ("set", quantity),
            CartAction::Remove => ("set", 0),
        };
        CartUpdateBody { action, quantity }
    }
}

/// Body of an add-to-cart request.
#[derive(Debug, Serialize)]
pub(crate) struct CartAddBody {
    pub(crate) quantity: u32,
}

/// One product line of a staff sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleItem {
    pub product_id: u64,
    pub variant_id: Option<u64>,
    pub quantity: u32,
}

/// Staff sale registered from the sales panel.
#[derive(Debug, Clone, Default)]
pub struct SaleForm {
    pub customer_name: String,
    pub whatsapp: String,
    pub payment_method: String,
    pub mark_paid_now: bool,
    pub items: Vec<SaleItem>,
}

/// Wire shape of [`SaleForm`]: flags as "true"/"false", items as a JSON string.
#[derive(Serialize)]
pub(crate) struct SaleFormBody<'a> {
    customer_name: &'a str,
    whatsapp: &'a str,
    payment_method: &'a str,
    mark_paid_now: &'static str,
    items_json: String,
}

impl SaleForm {
    pub(crate) fn to_body(&self) -> Result<SaleFormBody<'_>, serde_json::Error> {
        Ok(SaleFormBody {
            customer_name: &self.customer_name,
            whatsapp: &self.whatsapp,
            payment_method: &self.payment_method,
            mark_paid_now: if self.mark_paid_now { "true" } else { "false" },
            items_json: serde_json::to_string(&self.items)?,
        })
    }
}
