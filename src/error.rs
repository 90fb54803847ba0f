//! Error kinds surfaced by the cart and its collaborators.
//!
//! None of these is fatal to a POS session; the console shows the message and
//! the cashier carries on.

use serde::Serialize;
use thiserror::Error;

use crate::cart::LineId;

/// Failure of a cart operation. A failed operation never mutates the cart.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CartError {
    #[error("Unknown product: {product_id}")]
    UnknownProduct { product_id: String },

    #[error("No order line {line_id}")]
    UnknownLine { line_id: LineId },

    #[error("Quantity must be a whole number of at least 1 (got {input:?})")]
    InvalidQuantity { input: String },

    #[error("Please wait before scanning again ({remaining_ms} ms)")]
    ScanThrottled { remaining_ms: u64 },

    #[error("Please add at least one product to the order")]
    EmptyOrder,

    #[error("Customer name is required")]
    MissingCustomerName,

    #[error("Product catalog is not loaded yet")]
    CatalogNotReady,

    #[error("{message}")]
    SubmissionFailed { message: String },

    #[error("Order {order_id} has already been submitted")]
    OrderClosed { order_id: String },
}

impl CartError {
    pub(crate) fn unknown_product(product_id: &str) -> Self {
        CartError::UnknownProduct {
            product_id: product_id.to_string(),
        }
    }

    /// Stable machine-readable name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            CartError::UnknownProduct { .. } => "unknown_product",
            CartError::UnknownLine { .. } => "unknown_line",
            CartError::InvalidQuantity { .. } => "invalid_quantity",
            CartError::ScanThrottled { .. } => "scan_throttled",
            CartError::EmptyOrder => "empty_order",
            CartError::MissingCustomerName => "missing_customer_name",
            CartError::CatalogNotReady => "catalog_not_ready",
            CartError::SubmissionFailed { .. } => "submission_failed",
            CartError::OrderClosed { .. } => "order_closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_failed_shows_backend_message_verbatim() {
        let err = CartError::SubmissionFailed {
            message: "Insufficient stock".into(),
        };
        assert_eq!(err.to_string(), "Insufficient stock");
        assert_eq!(err.kind(), "submission_failed");
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let v = serde_json::to_value(CartError::unknown_product("P9")).unwrap();
        assert_eq!(v["kind"], "unknownProduct");
        assert_eq!(v["product_id"], "P9");
    }
}
