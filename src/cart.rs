//! Cart model for an in-progress order.
//!
//! Holds the order's line items and keeps them consistent with the catalog:
//!
//! - **One line per product**: selecting or scanning a product that is
//!   already on the order bumps that line's quantity instead of adding a row.
//! - **Derived totals**: line totals and the grand total are computed on read
//!   from quantity × unit price and never stored.
//! - **All-or-nothing**: an operation that returns `Err` leaves the cart
//!   exactly as it was.
//!
//! Lifecycle is `Empty → Building → Submitted`. A submitted cart rejects every
//! mutation; the session starts a fresh cart for the next customer.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::{CatalogEntry, CatalogHandle, CatalogSnapshot};
use crate::error::CartError;
use crate::money::Money;
use crate::order::{OrderLine, OrderPayload};
use crate::scan_gate::ScanGate;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Opaque identifier of a line within a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LineId(Uuid);

impl LineId {
    fn new() -> Self {
        LineId(Uuid::new_v4())
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Product captured on a line when it was selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineProduct {
    pub product_id: String,
    pub product_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    id: LineId,
    product: Option<LineProduct>,
    quantity: u32,
    unit_price: Money,
}

impl LineItem {
    fn blank() -> Self {
        Self {
            id: LineId::new(),
            product: None,
            quantity: 1,
            unit_price: Money::ZERO,
        }
    }

    fn for_entry(entry: &CatalogEntry) -> Self {
        let mut line = Self::blank();
        line.assign(entry);
        line
    }

    fn assign(&mut self, entry: &CatalogEntry) {
        self.product = Some(LineProduct {
            product_id: entry.product_id.clone(),
            product_name: entry.product_name.clone(),
        });
        self.quantity = 1;
        self.unit_price = entry.price_per_unit;
    }

    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn product(&self) -> Option<&LineProduct> {
        self.product.as_ref()
    }

    pub fn product_id(&self) -> Option<&str> {
        self.product.as_ref().map(|p| p.product_id.as_str())
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }

    /// A line counts toward the order once a product is selected.
    pub fn is_valid(&self) -> bool {
        self.product.is_some() && self.quantity >= 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Empty,
    Building,
    Submitted,
}

/// What an accepted scan did to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ScanOutcome {
    Added { line_id: LineId, product_name: String },
    Merged { line_id: LineId, product_name: String, quantity: u32 },
}

/// Read-only view of a line for the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineView {
    pub line_id: LineId,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub quantity: u32,
    pub price_per_unit: Money,
    pub line_total: Money,
}

/// Read-only view of the whole cart after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub line_items: Vec<LineView>,
    pub grand_total: Money,
    pub state: OrderState,
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Cart {
    catalog: CatalogHandle,
    gate: Arc<ScanGate>,
    lines: Vec<LineItem>,
    submitted_order_id: Option<String>,
}

impl Cart {
    /// Start an order against a shared catalog and scan gate.
    ///
    /// The order is seeded with one blank line for manual entry. The catalog
    /// may still be loading; product operations then fail with
    /// `CatalogNotReady`.
    pub fn new(catalog: CatalogHandle, gate: Arc<ScanGate>) -> Self {
        Self {
            catalog,
            gate,
            lines: vec![LineItem::blank()],
            submitted_order_id: None,
        }
    }

    /// Start an order with its own catalog and a default scan gate.
    pub fn initialize(catalog: CatalogSnapshot) -> Self {
        if catalog.is_empty() {
            info!("Cart initialized with an empty catalog");
        }
        Self::new(
            CatalogHandle::with_snapshot(catalog),
            Arc::new(ScanGate::default()),
        )
    }

    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    pub fn scan_gate(&self) -> &Arc<ScanGate> {
        &self.gate
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn line(&self, line_id: LineId) -> Option<&LineItem> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    /// Line id at a 1-based display position.
    pub fn line_id_at(&self, position: usize) -> Option<LineId> {
        position
            .checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(LineItem::id)
    }

    pub fn state(&self) -> OrderState {
        if self.submitted_order_id.is_some() {
            OrderState::Submitted
        } else if self.lines.iter().any(|l| l.product.is_some()) {
            OrderState::Building
        } else {
            OrderState::Empty
        }
    }

    pub fn submitted_order_id(&self) -> Option<&str> {
        self.submitted_order_id.as_deref()
    }

    fn ensure_open(&self) -> Result<(), CartError> {
        match &self.submitted_order_id {
            Some(order_id) => Err(CartError::OrderClosed {
                order_id: order_id.clone(),
            }),
            None => Ok(()),
        }
    }

    fn snapshot_catalog(&self) -> Result<Arc<CatalogSnapshot>, CartError> {
        self.catalog.current().ok_or(CartError::CatalogNotReady)
    }

    fn index_of(&self, line_id: LineId) -> Result<usize, CartError> {
        self.lines
            .iter()
            .position(|l| l.id == line_id)
            .ok_or(CartError::UnknownLine { line_id })
    }

    fn index_of_product(&self, product_id: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| l.product_id() == Some(product_id))
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Append a blank line for manual product selection.
    pub fn add_blank_line(&mut self) -> Result<LineId, CartError> {
        self.ensure_open()?;
        let line = LineItem::blank();
        let id = line.id;
        self.lines.push(line);
        Ok(id)
    }

    /// Set the product on an existing line, resetting quantity to 1 and the
    /// price to the catalog price.
    ///
    /// If another line already holds the product, that line's quantity goes
    /// up by one and `line_id` is removed.
    pub fn select_product(&mut self, line_id: LineId, product_id: &str) -> Result<(), CartError> {
        self.ensure_open()?;
        let catalog = self.snapshot_catalog()?;
        let entry = catalog
            .get(product_id)
            .ok_or_else(|| CartError::unknown_product(product_id))?;
        let idx = self.index_of(line_id)?;

        match self.index_of_product(&entry.product_id) {
            Some(existing) if existing != idx => {
                let line = &mut self.lines[existing];
                line.quantity = line.quantity.saturating_add(1);
                let quantity = line.quantity;
                self.lines.remove(idx);
                debug!(product_id = %entry.product_id, quantity, "Duplicate selection merged");
            }
            _ => {
                self.lines[idx].assign(entry);
                debug!(product_id = %entry.product_id, line = %line_id, "Product selected");
            }
        }
        Ok(())
    }

    /// Apply a scanned product id using the scan gate clock.
    pub fn apply_scanned_product(&mut self, product_id: &str) -> Result<ScanOutcome, CartError> {
        let now_ms = self.gate.now_ms();
        self.apply_scanned_product_at(product_id, now_ms)
    }

    /// Apply a scanned product id as of `now_ms`.
    ///
    /// Scans inside the debounce window fail with `ScanThrottled`. Unknown
    /// products fail with `UnknownProduct` and do not consume the window.
    pub fn apply_scanned_product_at(
        &mut self,
        product_id: &str,
        now_ms: i64,
    ) -> Result<ScanOutcome, CartError> {
        self.ensure_open()?;
        let catalog = self.snapshot_catalog()?;
        let permit = self
            .gate
            .check(now_ms)
            .map_err(|remaining_ms| CartError::ScanThrottled { remaining_ms })?;
        let entry = catalog
            .get(product_id)
            .ok_or_else(|| CartError::unknown_product(product_id))?;
        self.gate
            .commit(permit)
            .map_err(|remaining_ms| CartError::ScanThrottled { remaining_ms })?;

        let outcome = match self.index_of_product(&entry.product_id) {
            Some(idx) => {
                let line = &mut self.lines[idx];
                line.quantity = line.quantity.saturating_add(1);
                ScanOutcome::Merged {
                    line_id: line.id,
                    product_name: entry.product_name.clone(),
                    quantity: line.quantity,
                }
            }
            None => {
                let line = LineItem::for_entry(entry);
                let line_id = line.id;
                self.lines.push(line);
                ScanOutcome::Added {
                    line_id,
                    product_name: entry.product_name.clone(),
                }
            }
        };
        info!(product_id = %entry.product_id, outcome = ?outcome, "Scan applied");
        Ok(outcome)
    }

    /// Set a line's quantity. Must be at least 1.
    pub fn set_quantity(&mut self, line_id: LineId, quantity: i64) -> Result<(), CartError> {
        self.ensure_open()?;
        let idx = self.index_of(line_id)?;
        let qty = u32::try_from(quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or_else(|| CartError::InvalidQuantity {
                input: quantity.to_string(),
            })?;
        self.lines[idx].quantity = qty;
        Ok(())
    }

    /// Set a line's quantity from raw text input.
    pub fn set_quantity_input(&mut self, line_id: LineId, input: &str) -> Result<(), CartError> {
        let quantity = input
            .trim()
            .parse::<i64>()
            .map_err(|_| CartError::InvalidQuantity {
                input: input.to_string(),
            })?;
        self.set_quantity(line_id, quantity)
            .map_err(|e| match e {
                CartError::InvalidQuantity { .. } => CartError::InvalidQuantity {
                    input: input.to_string(),
                },
                other => other,
            })
    }

    /// Remove a line. Removing the last line is allowed.
    pub fn remove_line(&mut self, line_id: LineId) -> Result<(), CartError> {
        self.ensure_open()?;
        let idx = self.index_of(line_id)?;
        self.lines.remove(idx);
        Ok(())
    }

    /// Remove every line.
    pub fn clear(&mut self) -> Result<(), CartError> {
        self.ensure_open()?;
        self.lines.clear();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Sum of quantity × unit price over all lines.
    pub fn grand_total(&self) -> Money {
        self.lines.iter().map(LineItem::line_total).sum()
    }

    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            line_items: self
                .lines
                .iter()
                .map(|l| LineView {
                    line_id: l.id,
                    product_id: l.product.as_ref().map(|p| p.product_id.clone()),
                    product_name: l.product.as_ref().map(|p| p.product_name.clone()),
                    quantity: l.quantity,
                    price_per_unit: l.unit_price,
                    line_total: l.line_total(),
                })
                .collect(),
            grand_total: self.grand_total(),
            state: self.state(),
        }
    }

    /// Validate the order and produce the submission payload.
    ///
    /// Blank lines are left out; the payload total always equals
    /// [`Cart::grand_total`].
    pub fn build_order_payload(&self, customer_name: &str) -> Result<OrderPayload, CartError> {
        self.ensure_open()?;
        let lines: Vec<OrderLine> = self
            .lines
            .iter()
            .filter(|l| l.is_valid())
            .filter_map(|l| {
                l.product.as_ref().map(|p| OrderLine {
                    product_id: p.product_id.clone(),
                    product_name: p.product_name.clone(),
                    quantity: l.quantity,
                    price_per_unit: l.unit_price,
                })
            })
            .collect();
        if lines.is_empty() {
            return Err(CartError::EmptyOrder);
        }
        let customer_name = customer_name.trim();
        if customer_name.is_empty() {
            return Err(CartError::MissingCustomerName);
        }
        Ok(OrderPayload::new(customer_name.to_string(), lines))
    }

    /// Close the order after the backend accepted it.
    pub fn mark_submitted(&mut self, order_id: &str) -> Result<(), CartError> {
        self.ensure_open()?;
        self.submitted_order_id = Some(order_id.to_string());
        info!(order_id = %order_id, total = %self.grand_total(), "Order submitted");
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;

    fn catalog() -> CatalogSnapshot {
        CatalogSnapshot::new(vec![
            CatalogEntry::new("P1", "Rice", Money::from_cents(5000)),
            CatalogEntry::new("P2", "Oil", Money::from_cents(12000)),
            CatalogEntry::new("P3", "Salt", Money::from_cents(1999)),
        ])
    }

    fn cart() -> Cart {
        Cart::initialize(catalog())
    }

    fn first_line(cart: &Cart) -> LineId {
        cart.line_id_at(1).unwrap()
    }

    #[test]
    fn test_initialize_seeds_blank_line() {
        let cart = cart();
        assert_eq!(cart.lines().len(), 1);
        assert!(cart.lines()[0].product().is_none());
        assert_eq!(cart.state(), OrderState::Empty);
        assert_eq!(cart.grand_total(), Money::ZERO);
    }

    #[test]
    fn test_worked_example() {
        let mut cart = cart();
        let t0 = 1_000_000;

        let out = cart.apply_scanned_product_at("P1", t0).unwrap();
        assert!(matches!(out, ScanOutcome::Added { .. }));
        assert_eq!(cart.grand_total().to_string(), "50.00");

        let err = cart.apply_scanned_product_at("P1", t0 + 2_000).unwrap_err();
        assert!(matches!(err, CartError::ScanThrottled { .. }));
        assert_eq!(cart.grand_total().to_string(), "50.00");

        let out = cart.apply_scanned_product_at("P1", t0 + 5_001).unwrap();
        assert!(matches!(out, ScanOutcome::Merged { quantity: 2, .. }));
        assert_eq!(cart.grand_total().to_string(), "100.00");

        let blank = first_line(&cart);
        cart.select_product(blank, "P2").unwrap();
        cart.set_quantity(blank, 3).unwrap();
        assert_eq!(cart.grand_total().to_string(), "460.00");

        let payload = cart.build_order_payload("Asha").unwrap();
        assert_eq!(payload.grand_total(), cart.grand_total());
        assert_eq!(payload.grand_total().to_string(), "460.00");
        assert_eq!(payload.line_items().len(), 2);
        assert_eq!(cart.state(), OrderState::Building);
    }

    #[test]
    fn test_spaced_scans_accumulate_on_one_line() {
        let mut cart = cart();
        for i in 0..4 {
            cart.apply_scanned_product_at("P3", i * 5_001).unwrap();
        }
        let rows: Vec<_> = cart
            .lines()
            .iter()
            .filter(|l| l.product_id() == Some("P3"))
            .collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity(), 4);
    }

    #[test]
    fn test_burst_scans_only_first_accepted() {
        let mut cart = cart();
        cart.apply_scanned_product_at("P1", 10_000).unwrap();
        for dt in [1, 100, 2_500, 4_999, 5_000] {
            let err = cart.apply_scanned_product_at("P1", 10_000 + dt).unwrap_err();
            assert_eq!(err.kind(), "scan_throttled");
        }
        let line = cart.lines().iter().find(|l| l.product_id() == Some("P1")).unwrap();
        assert_eq!(line.quantity(), 1);
    }

    #[test]
    fn test_unknown_scan_leaves_cart_and_window_untouched() {
        let mut cart = cart();
        let before = cart.snapshot();
        let err = cart.apply_scanned_product_at("NOPE", 0).unwrap_err();
        assert_eq!(err, CartError::unknown_product("NOPE"));
        assert_eq!(cart.snapshot(), before);
        assert!(cart.scan_gate().last_accepted_ms().is_none());
        assert!(cart.apply_scanned_product_at("P1", 1).is_ok());
    }

    #[test]
    fn test_scan_before_catalog_loaded() {
        let mut cart = Cart::new(CatalogHandle::new(), Arc::new(ScanGate::default()));
        let err = cart.apply_scanned_product_at("P1", 0).unwrap_err();
        assert_eq!(err, CartError::CatalogNotReady);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_select_unknown_product_is_rejected() {
        let mut cart = cart();
        let line = first_line(&cart);
        cart.select_product(line, "P1").unwrap();
        cart.set_quantity(line, 4).unwrap();
        let before = cart.snapshot();

        let err = cart.select_product(line, "P404").unwrap_err();
        assert_eq!(err, CartError::unknown_product("P404"));
        assert_eq!(cart.snapshot(), before);
    }

    #[test]
    fn test_select_resets_quantity_and_price() {
        let mut cart = cart();
        let line = first_line(&cart);
        cart.select_product(line, "P1").unwrap();
        cart.set_quantity(line, 7).unwrap();
        cart.select_product(line, "P2").unwrap();
        let item = cart.line(line).unwrap();
        assert_eq!(item.quantity(), 1);
        assert_eq!(item.unit_price(), Money::from_cents(12000));
        assert_eq!(item.product().unwrap().product_name, "Oil");
    }

    #[test]
    fn test_duplicate_selection_merges() {
        let mut cart = cart();
        let first = first_line(&cart);
        cart.select_product(first, "P1").unwrap();
        let second = cart.add_blank_line().unwrap();
        cart.select_product(second, "P1").unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(first).unwrap().quantity(), 2);
        assert!(cart.line(second).is_none());
    }

    #[test]
    fn test_scan_merges_into_manually_selected_line() {
        let mut cart = cart();
        let line = first_line(&cart);
        cart.select_product(line, "P2").unwrap();
        let out = cart.apply_scanned_product_at("P2", 0).unwrap();
        assert_eq!(
            out,
            ScanOutcome::Merged {
                line_id: line,
                product_name: "Oil".into(),
                quantity: 2
            }
        );
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_invalid_quantities_rejected() {
        let mut cart = cart();
        let line = first_line(&cart);
        cart.select_product(line, "P1").unwrap();
        for bad in [0, -1, i64::from(u32::MAX) + 1] {
            assert!(matches!(
                cart.set_quantity(line, bad),
                Err(CartError::InvalidQuantity { .. })
            ));
        }
        for bad in ["", "abc", "2.5", "-3"] {
            let err = cart.set_quantity_input(line, bad).unwrap_err();
            assert_eq!(err, CartError::InvalidQuantity { input: bad.into() });
        }
        assert_eq!(cart.line(line).unwrap().quantity(), 1);
        cart.set_quantity_input(line, " 5 ").unwrap();
        assert_eq!(cart.line(line).unwrap().quantity(), 5);
    }

    #[test]
    fn test_unknown_line() {
        let mut cart = cart();
        let stray = LineId::new();
        assert_eq!(
            cart.remove_line(stray),
            Err(CartError::UnknownLine { line_id: stray })
        );
        assert!(matches!(
            cart.set_quantity(stray, 2),
            Err(CartError::UnknownLine { .. })
        ));
    }

    #[test]
    fn test_remove_all_lines_blocks_submission() {
        let mut cart = cart();
        cart.apply_scanned_product_at("P1", 0).unwrap();
        let ids: Vec<LineId> = cart.lines().iter().map(LineItem::id).collect();
        for id in ids {
            cart.remove_line(id).unwrap();
        }
        assert!(cart.lines().is_empty());
        assert_eq!(cart.grand_total(), Money::ZERO);
        assert_eq!(cart.state(), OrderState::Empty);
        assert_eq!(cart.build_order_payload("Asha"), Err(CartError::EmptyOrder));
    }

    #[test]
    fn test_clear_empties_the_order() {
        let mut cart = cart();
        let line = first_line(&cart);
        cart.select_product(line, "P2").unwrap();
        cart.apply_scanned_product_at("P1", 0).unwrap();
        assert_eq!(cart.state(), OrderState::Building);

        cart.clear().unwrap();
        assert!(cart.lines().is_empty());
        assert_eq!(cart.grand_total().to_string(), "0.00");
        assert_eq!(cart.state(), OrderState::Empty);
        assert_eq!(cart.build_order_payload("Asha"), Err(CartError::EmptyOrder));

        // The cart stays usable after clearing.
        cart.add_blank_line().unwrap();
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_clear_rejected_after_submission() {
        let mut cart = cart();
        cart.apply_scanned_product_at("P1", 0).unwrap();
        cart.mark_submitted("7").unwrap();
        assert_eq!(
            cart.clear(),
            Err(CartError::OrderClosed {
                order_id: "7".into()
            })
        );
        assert_eq!(cart.lines().len(), 2);
    }

    #[test]
    fn test_blank_lines_do_not_make_an_order() {
        let mut cart = cart();
        cart.add_blank_line().unwrap();
        assert_eq!(cart.build_order_payload("Asha"), Err(CartError::EmptyOrder));
    }

    #[test]
    fn test_blank_customer_name_rejected() {
        let mut cart = cart();
        cart.apply_scanned_product_at("P1", 0).unwrap();
        assert_eq!(
            cart.build_order_payload("   "),
            Err(CartError::MissingCustomerName)
        );
        let payload = cart.build_order_payload("  Asha ").unwrap();
        assert_eq!(payload.customer_name(), "Asha");
        // Blank seed line is not part of the payload.
        assert_eq!(payload.line_items().len(), 1);
    }

    #[test]
    fn test_grand_total_tracks_mutations() {
        let mut cart = cart();
        let line = first_line(&cart);
        cart.select_product(line, "P3").unwrap();
        cart.set_quantity(line, 3).unwrap();
        cart.apply_scanned_product_at("P2", 0).unwrap();
        let expected: i64 = cart
            .lines()
            .iter()
            .map(|l| l.unit_price().cents() * i64::from(l.quantity()))
            .sum();
        assert_eq!(cart.grand_total().cents(), expected);
        assert_eq!(cart.grand_total(), cart.grand_total());
        assert_eq!(cart.grand_total().to_string(), "179.97");
    }

    #[test]
    fn test_submitted_cart_is_closed() {
        let mut cart = cart();
        cart.apply_scanned_product_at("P1", 0).unwrap();
        cart.mark_submitted("42").unwrap();
        assert_eq!(cart.state(), OrderState::Submitted);
        let closed = CartError::OrderClosed {
            order_id: "42".into(),
        };
        assert_eq!(cart.add_blank_line(), Err(closed.clone()));
        assert_eq!(cart.apply_scanned_product_at("P2", 60_000), Err(closed.clone()));
        assert_eq!(cart.build_order_payload("Asha"), Err(closed.clone()));
        assert_eq!(cart.mark_submitted("43"), Err(closed));
    }

    #[test]
    fn test_catalog_refresh_keeps_existing_lines() {
        let mut cart = cart();
        cart.apply_scanned_product_at("P1", 0).unwrap();
        cart.catalog().replace(CatalogSnapshot::new(vec![CatalogEntry::new(
            "P1",
            "Rice (new)",
            Money::from_cents(9900),
        )]));
        let line = cart.lines().iter().find(|l| l.product_id() == Some("P1")).unwrap();
        assert_eq!(line.unit_price(), Money::from_cents(5000));
        assert_eq!(line.product().unwrap().product_name, "Rice");
        assert!(matches!(
            cart.apply_scanned_product_at("P2", 10_000),
            Err(CartError::UnknownProduct { .. })
        ));
    }

    #[test]
    fn test_empty_catalog_initializes() {
        let mut cart = Cart::initialize(CatalogSnapshot::default());
        assert_eq!(cart.lines().len(), 1);
        let line = first_line(&cart);
        assert!(matches!(
            cart.select_product(line, "P1"),
            Err(CartError::UnknownProduct { .. })
        ));
    }
}
