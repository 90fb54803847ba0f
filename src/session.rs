//! One cashier's POS session.
//!
//! Owns the shared catalog handle and scan gate, the cart for the customer at
//! the counter, and the ticket of the last submitted order until it is paid.
//! The session is driven by a single event loop: every method runs to
//! completion before the next event is handled, and the cart is only touched
//! after any awaited backend call has returned.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiError, CatalogProvider, OrderSubmitter, PaymentProcessor};
use crate::cart::{Cart, CartSnapshot, ScanOutcome};
use crate::catalog::CatalogHandle;
use crate::checkout::{CheckoutError, CheckoutTicket, PaymentMode, PaymentReceipt};
use crate::config::PosConfig;
use crate::error::CartError;
use crate::scan_gate::ScanGate;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct PosSession<B> {
    backend: B,
    config: PosConfig,
    catalog: CatalogHandle,
    gate: Arc<ScanGate>,
    cart: Cart,
    pending_checkout: Option<CheckoutTicket>,
}

impl<B> PosSession<B>
where
    B: CatalogProvider + OrderSubmitter + PaymentProcessor,
{
    /// Create a session with an empty cart. The catalog is not loaded yet;
    /// call [`PosSession::refresh_catalog`].
    pub fn new(backend: B, config: PosConfig) -> Self {
        let catalog = CatalogHandle::new();
        let gate = Arc::new(ScanGate::new(config.scan_debounce_ms));
        let cart = Cart::new(catalog.clone(), gate.clone());
        Self {
            backend,
            config,
            catalog,
            gate,
            cart,
            pending_checkout: None,
        }
    }

    pub fn config(&self) -> &PosConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    pub fn snapshot(&self) -> CartSnapshot {
        self.cart.snapshot()
    }

    pub fn pending_checkout(&self) -> Option<&CheckoutTicket> {
        self.pending_checkout.as_ref()
    }

    /// Fetch the catalog and swap it in. Line items already on the cart are
    /// not touched. Returns the number of products loaded.
    pub async fn refresh_catalog(&mut self) -> Result<usize, SessionError> {
        let snapshot = self.backend.fetch_catalog().await?;
        let count = snapshot.len();
        self.catalog.replace(snapshot);
        info!(products = count, "Catalog snapshot replaced");
        Ok(count)
    }

    /// Handle a code from the scan source using the scan gate clock.
    pub async fn handle_scan(&mut self, code: &str) -> Result<ScanOutcome, SessionError> {
        let now_ms = self.gate.now_ms();
        self.handle_scan_at(code, now_ms).await
    }

    /// Handle a scanned code as of `now_ms`.
    ///
    /// The code is tried as a product id, then as a barcode in the snapshot,
    /// then against the backend's barcode lookup. Throttled scans are
    /// rejected before any network call.
    pub async fn handle_scan_at(
        &mut self,
        code: &str,
        now_ms: i64,
    ) -> Result<ScanOutcome, SessionError> {
        let code = code.trim();
        let catalog = self.catalog.current().ok_or(CartError::CatalogNotReady)?;
        self.gate
            .check(now_ms)
            .map_err(|remaining_ms| CartError::ScanThrottled { remaining_ms })?;

        let product_id = match catalog.resolve(code) {
            Some(entry) => entry.product_id.clone(),
            None => {
                let record = self
                    .backend
                    .lookup_barcode(code)
                    .await?
                    .ok_or_else(|| CartError::unknown_product(code))?;
                record
                    .product_id_string()
                    .ok_or_else(|| CartError::unknown_product(code))?
            }
        };

        match self.cart.apply_scanned_product_at(&product_id, now_ms) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(code = %code, kind = e.kind(), error = %e, "Scan rejected");
                Err(e.into())
            }
        }
    }

    /// Validate and submit the cart. On success the cart is closed, its
    /// ticket is kept for payment and a fresh cart takes its place. On
    /// failure the cart stays as it was and may be resubmitted.
    pub async fn checkout(&mut self, customer_name: &str) -> Result<CheckoutTicket, SessionError> {
        let payload = self.cart.build_order_payload(customer_name)?;
        let receipt = match self.backend.submit_order(&payload).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Order submission failed");
                return Err(CartError::SubmissionFailed {
                    message: e.to_string(),
                }
                .into());
            }
        };
        self.cart.mark_submitted(&receipt.order_id)?;

        let ticket = CheckoutTicket::new(&receipt, &payload);
        if let Some(previous) = self.pending_checkout.replace(ticket.clone()) {
            warn!(order_id = %previous.order_id, "Replacing unpaid checkout ticket");
        }
        self.cart = Cart::new(self.catalog.clone(), self.gate.clone());
        info!(
            order_id = %ticket.order_id,
            customer = %ticket.customer_name,
            total = %ticket.grand_total,
            "Checkout ready for payment"
        );
        Ok(ticket)
    }

    /// UPI link for the pending ticket.
    pub fn upi_uri(&self) -> Result<String, SessionError> {
        let ticket = self
            .pending_checkout
            .as_ref()
            .ok_or(CheckoutError::NoPendingCheckout)?;
        Ok(ticket.upi_uri(&self.config)?)
    }

    /// Pay the pending ticket. The ticket is cleared only on success.
    pub async fn pay(&mut self, mode: PaymentMode) -> Result<PaymentReceipt, SessionError> {
        let ticket = self
            .pending_checkout
            .as_ref()
            .ok_or(CheckoutError::NoPendingCheckout)?;
        let request = ticket.payment_request(mode)?;
        let order_id = ticket.order_id.clone();

        match self.backend.process_payment(&request).await {
            Ok(receipt) => {
                info!(
                    order_id = %order_id,
                    mode = %mode,
                    payment_id = ?receipt.payment_id,
                    "Payment confirmed"
                );
                self.pending_checkout = None;
                Ok(receipt)
            }
            Err(e) => {
                warn!(order_id = %order_id, mode = %mode, error = %e, "Payment failed");
                Err(CheckoutError::PaymentFailed {
                    message: e.to_string(),
                }
                .into())
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogEntry, CatalogSnapshot, ProductRecord};
    use crate::checkout::PaymentRequest;
    use crate::money::Money;
    use crate::order::{OrderPayload, OrderReceipt};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBackend {
        fail_submit: Mutex<Option<String>>,
        fail_payment: Mutex<Option<String>>,
        barcodes: Vec<(String, String)>,
        submitted: Mutex<Vec<OrderPayload>>,
        payments: Mutex<Vec<PaymentRequest>>,
        lookups: Mutex<usize>,
    }

    impl CatalogProvider for FakeBackend {
        async fn fetch_catalog(&self) -> Result<CatalogSnapshot, ApiError> {
            Ok(CatalogSnapshot::new(vec![
                CatalogEntry::new("P1", "Rice", Money::from_cents(5000)),
                CatalogEntry::new("P2", "Oil", Money::from_cents(12000)).with_barcode("8901"),
            ]))
        }

        async fn lookup_barcode(&self, barcode: &str) -> Result<Option<ProductRecord>, ApiError> {
            *self.lookups.lock().unwrap() += 1;
            Ok(self
                .barcodes
                .iter()
                .find(|(code, _)| code == barcode)
                .map(|(_, id)| ProductRecord {
                    product_id: serde_json::json!(id),
                    product_name: Some("From backend".into()),
                    price_per_unit: 1.0,
                    barcode: Some(serde_json::json!(barcode)),
                }))
        }
    }

    impl OrderSubmitter for FakeBackend {
        async fn submit_order(&self, order: &OrderPayload) -> Result<OrderReceipt, ApiError> {
            if let Some(message) = self.fail_submit.lock().unwrap().clone() {
                return Err(ApiError::Status {
                    status: 400,
                    message,
                });
            }
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(order.clone());
            Ok(OrderReceipt {
                order_id: submitted.len().to_string(),
                message: Some("Order added successfully".into()),
            })
        }
    }

    impl PaymentProcessor for FakeBackend {
        async fn process_payment(
            &self,
            request: &PaymentRequest,
        ) -> Result<PaymentReceipt, ApiError> {
            if let Some(message) = self.fail_payment.lock().unwrap().clone() {
                return Err(ApiError::Status {
                    status: 400,
                    message,
                });
            }
            self.payments.lock().unwrap().push(request.clone());
            Ok(PaymentReceipt {
                message: "Cash payment confirmed, order completed.".into(),
                payment_id: Some("9".into()),
            })
        }
    }

    fn config() -> PosConfig {
        PosConfig {
            upi_payee_address: "shop@upi".into(),
            upi_payee_name: "Shop".into(),
            ..PosConfig::default()
        }
    }

    async fn loaded(backend: FakeBackend) -> PosSession<FakeBackend> {
        let mut session = PosSession::new(backend, config());
        assert_eq!(session.refresh_catalog().await.unwrap(), 2);
        session
    }

    #[tokio::test]
    async fn test_scan_before_catalog_load() {
        let mut session = PosSession::new(FakeBackend::default(), config());
        let err = session.handle_scan_at("P1", 0).await.unwrap_err();
        assert!(matches!(err, SessionError::Cart(CartError::CatalogNotReady)));
    }

    #[tokio::test]
    async fn test_scan_resolves_id_and_local_barcode() {
        let mut session = loaded(FakeBackend::default()).await;
        session.handle_scan_at("P1", 0).await.unwrap();
        let out = session.handle_scan_at("8901", 6_000).await.unwrap();
        assert!(matches!(out, ScanOutcome::Added { .. }));
        assert_eq!(session.snapshot().grand_total.to_string(), "170.00");
        assert_eq!(*session.backend.lookups.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_throttled_scan_skips_backend() {
        let mut session = loaded(FakeBackend::default()).await;
        session.handle_scan_at("P1", 0).await.unwrap();
        let err = session.handle_scan_at("unknown", 100).await.unwrap_err();
        assert!(matches!(err, SessionError::Cart(CartError::ScanThrottled { .. })));
        assert_eq!(*session.backend.lookups.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_backend_barcode_lookup() {
        let backend = FakeBackend {
            barcodes: vec![
                ("777".into(), "P1".into()),
                ("999".into(), "P-GONE".into()),
            ],
            ..FakeBackend::default()
        };
        let mut session = loaded(backend).await;

        session.handle_scan_at("777", 0).await.unwrap();
        let line = &session.snapshot().line_items[1];
        // Price and name come from the snapshot, not the lookup response.
        assert_eq!(line.product_name.as_deref(), Some("Rice"));
        assert_eq!(line.price_per_unit, Money::from_cents(5000));

        let err = session.handle_scan_at("999", 10_000).await.unwrap_err();
        assert!(matches!(err, SessionError::Cart(CartError::UnknownProduct { .. })));
        let err = session.handle_scan_at("123", 20_000).await.unwrap_err();
        assert!(matches!(err, SessionError::Cart(CartError::UnknownProduct { .. })));
        assert_eq!(*session.backend.lookups.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_checkout_starts_fresh_cart() {
        let mut session = loaded(FakeBackend::default()).await;
        session.handle_scan_at("P1", 0).await.unwrap();
        session.handle_scan_at("P1", 5_001).await.unwrap();
        let line = session.cart().line_id_at(1).unwrap();
        session.cart_mut().select_product(line, "P2").unwrap();
        session.cart_mut().set_quantity(line, 3).unwrap();

        let ticket = session.checkout("Asha").await.unwrap();
        assert_eq!(ticket.order_id, "1");
        assert_eq!(ticket.grand_total.to_string(), "460.00");
        assert_eq!(ticket.lines.len(), 2);

        assert_eq!(session.cart().lines().len(), 1);
        assert_eq!(session.snapshot().grand_total, Money::ZERO);
        let submitted = session.backend.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].grand_total(), ticket.grand_total);
    }

    #[tokio::test]
    async fn test_debounce_spans_orders() {
        let mut session = loaded(FakeBackend::default()).await;
        session.handle_scan_at("P1", 0).await.unwrap();
        session.checkout("Asha").await.unwrap();
        let err = session.handle_scan_at("P2", 1_000).await.unwrap_err();
        assert!(matches!(err, SessionError::Cart(CartError::ScanThrottled { .. })));
    }

    #[tokio::test]
    async fn test_failed_submission_keeps_cart() {
        let backend = FakeBackend::default();
        *backend.fail_submit.lock().unwrap() = Some("Insufficient stock".into());
        let mut session = loaded(backend).await;
        session.handle_scan_at("P1", 0).await.unwrap();
        let before = session.snapshot();

        let err = session.checkout("Asha").await.unwrap_err();
        assert_eq!(err.to_string(), "Insufficient stock");
        assert_eq!(session.snapshot(), before);
        assert!(session.pending_checkout().is_none());

        *session.backend.fail_submit.lock().unwrap() = None;
        assert!(session.checkout("Asha").await.is_ok());
    }

    #[tokio::test]
    async fn test_pay_flow() {
        let mut session = loaded(FakeBackend::default()).await;
        assert!(matches!(
            session.pay(PaymentMode::Cash).await,
            Err(SessionError::Checkout(CheckoutError::NoPendingCheckout))
        ));

        session.handle_scan_at("P2", 0).await.unwrap();
        session.checkout("Asha").await.unwrap();
        let uri = session.upi_uri().unwrap();
        assert!(uri.contains("am=120.00"));

        *session.backend.fail_payment.lock().unwrap() = Some("UPI payment failed, please try again.".into());
        let err = session.pay(PaymentMode::Upi).await.unwrap_err();
        assert_eq!(err.to_string(), "UPI payment failed, please try again.");
        assert!(session.pending_checkout().is_some());

        *session.backend.fail_payment.lock().unwrap() = None;
        let receipt = session.pay(PaymentMode::Cash).await.unwrap();
        assert_eq!(receipt.payment_id.as_deref(), Some("9"));
        assert!(session.pending_checkout().is_none());
        let payments = session.backend.payments.lock().unwrap();
        assert_eq!(payments[0].grand_total, "120.00");
        assert_eq!(payments[0].payment_mode, PaymentMode::Cash);
    }

    #[tokio::test]
    async fn test_refresh_keeps_in_progress_lines() {
        let mut session = loaded(FakeBackend::default()).await;
        session.handle_scan_at("P1", 0).await.unwrap();
        let before = session.snapshot();
        session.refresh_catalog().await.unwrap();
        assert_eq!(session.snapshot(), before);
    }
}
