//! Normalized order payload handed to order submission.
//!
//! Field names on the wire follow the backend's `/insertOrder` contract.

use serde::Serialize;

use crate::money::Money;

/// One normalized order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub price_per_unit: Money,
}

impl OrderLine {
    pub fn line_total(&self) -> Money {
        self.price_per_unit * self.quantity
    }
}

/// Immutable order ready for submission.
///
/// Only the cart constructs these, after validation, so a payload in hand is
/// always non-empty and has a customer name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPayload {
    customer_name: String,
    #[serde(rename = "grandTotal")]
    grand_total: Money,
    #[serde(rename = "order_details")]
    line_items: Vec<OrderLine>,
}

impl OrderPayload {
    pub(crate) fn new(customer_name: String, line_items: Vec<OrderLine>) -> Self {
        let grand_total = line_items.iter().map(OrderLine::line_total).sum();
        Self {
            customer_name,
            grand_total,
            line_items,
        }
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn line_items(&self) -> &[OrderLine] {
        &self.line_items
    }

    pub fn grand_total(&self) -> Money {
        self.grand_total
    }
}

/// Backend acknowledgement of an inserted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
