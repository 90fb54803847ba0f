//! Checkout: what happens after the order is on the backend.
//!
//! A submitted order becomes a [`CheckoutTicket`] held in the session until
//! the customer pays. Payment is either cash or UPI; for UPI the terminal
//! shows a `upi://pay` link (rendered as a QR code by the display).

use reqwest::Url;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::PosConfig;
use crate::money::Money;
use crate::order::{OrderLine, OrderPayload, OrderReceipt};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("No submitted order is waiting for payment")]
    NoPendingCheckout,

    #[error("Grand total must be greater than zero")]
    InvalidTotal,

    #[error("Unknown payment mode {0:?}; use upi or cash")]
    UnknownPaymentMode(String),

    #[error("UPI payee address is not configured")]
    UpiNotConfigured,

    #[error("{message}")]
    PaymentFailed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    Upi,
    Cash,
}

impl FromStr for PaymentMode {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upi" => Ok(PaymentMode::Upi),
            "cash" => Ok(PaymentMode::Cash),
            other => Err(CheckoutError::UnknownPaymentMode(other.to_string())),
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaymentMode::Upi => "upi",
            PaymentMode::Cash => "cash",
        })
    }
}

/// A submitted order waiting for payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutTicket {
    pub order_id: String,
    pub customer_name: String,
    pub grand_total: Money,
    pub lines: Vec<OrderLine>,
}

impl CheckoutTicket {
    pub fn new(receipt: &OrderReceipt, order: &OrderPayload) -> Self {
        Self {
            order_id: receipt.order_id.clone(),
            customer_name: order.customer_name().to_string(),
            grand_total: order.grand_total(),
            lines: order.line_items().to_vec(),
        }
    }

    /// `upi://pay` link for the ticket's total.
    pub fn upi_uri(&self, config: &PosConfig) -> Result<String, CheckoutError> {
        let payee = config.upi_payee_address.trim();
        if payee.is_empty() {
            return Err(CheckoutError::UpiNotConfigured);
        }
        let amount = self.grand_total.to_string();
        let url = Url::parse_with_params(
            "upi://pay",
            &[
                ("pa", payee),
                ("pn", config.upi_payee_name.trim()),
                ("am", amount.as_str()),
                ("cu", config.currency.as_str()),
            ],
        )
        .map_err(|_| CheckoutError::UpiNotConfigured)?;
        Ok(url.to_string())
    }

    /// Build the `/processPayment` request.
    pub fn payment_request(&self, mode: PaymentMode) -> Result<PaymentRequest, CheckoutError> {
        if self.grand_total.cents() <= 0 {
            return Err(CheckoutError::InvalidTotal);
        }
        Ok(PaymentRequest {
            grand_total: self.grand_total.to_string(),
            order_id: self.order_id.clone(),
            customer_name: self.customer_name.clone(),
            payment_mode: mode,
            order_details: self.lines.clone(),
        })
    }
}

/// Body of `/processPayment`. The backend expects the total as a fixed
/// two-decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRequest {
    #[serde(rename = "grandTotal")]
    pub grand_total: String,
    pub order_id: String,
    pub customer_name: String,
    pub payment_mode: PaymentMode,
    pub order_details: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub message: String,
    pub payment_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(total_cents: i64) -> CheckoutTicket {
        CheckoutTicket {
            order_id: "17".into(),
            customer_name: "Asha".into(),
            grand_total: Money::from_cents(total_cents),
            lines: vec![OrderLine {
                product_id: "1".into(),
                product_name: "Rice".into(),
                quantity: 1,
                price_per_unit: Money::from_cents(total_cents),
            }],
        }
    }

    fn upi_config() -> PosConfig {
        PosConfig {
            upi_payee_address: "shop@upi".into(),
            upi_payee_name: "Corner Shop".into(),
            ..PosConfig::default()
        }
    }

    #[test]
    fn test_payment_mode_parse() {
        assert_eq!("UPI".parse::<PaymentMode>(), Ok(PaymentMode::Upi));
        assert_eq!(" cash ".parse::<PaymentMode>(), Ok(PaymentMode::Cash));
        assert_eq!(
            "card".parse::<PaymentMode>(),
            Err(CheckoutError::UnknownPaymentMode("card".into()))
        );
    }

    #[test]
    fn test_upi_uri() {
        let uri = ticket(46000).upi_uri(&upi_config()).unwrap();
        assert!(uri.starts_with("upi://pay?"));
        assert!(uri.contains("pa=shop%40upi"));
        assert!(uri.contains("pn=Corner+Shop"));
        assert!(uri.contains("am=460.00"));
        assert!(uri.ends_with("cu=INR"));
    }

    #[test]
    fn test_upi_requires_payee() {
        assert_eq!(
            ticket(100).upi_uri(&PosConfig::default()),
            Err(CheckoutError::UpiNotConfigured)
        );
    }

    #[test]
    fn test_payment_request_shape() {
        let req = ticket(46000).payment_request(PaymentMode::Cash).unwrap();
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["grandTotal"], "460.00");
        assert_eq!(v["payment_mode"], "cash");
        assert_eq!(v["order_id"], "17");
        assert_eq!(v["order_details"][0]["product_name"], "Rice");
    }

    #[test]
    fn test_zero_total_rejected() {
        assert_eq!(
            ticket(0).payment_request(PaymentMode::Upi),
            Err(CheckoutError::InvalidTotal)
        );
    }
}
