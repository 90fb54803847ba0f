//! Point-of-sale order entry.
//!
//! A cashier builds an order from a product catalog, by manual selection or
//! by scanning barcodes, and submits it to the shop backend. Scans are
//! debounced, repeated products merge into one line, and totals are always
//! recomputed from the lines in integer cents.

pub mod api;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod money;
pub mod order;
pub mod scan_gate;
pub mod scanner;
pub mod session;

pub use api::BackendClient;
pub use cart::{Cart, CartSnapshot, LineId, OrderState, ScanOutcome};
pub use catalog::{CatalogEntry, CatalogHandle, CatalogSnapshot};
pub use config::PosConfig;
pub use error::CartError;
pub use money::Money;
pub use order::OrderPayload;
pub use scan_gate::ScanGate;
pub use session::{PosSession, SessionError};

/// Build metadata stamped by `build.rs`.
pub fn build_info() -> (&'static str, &'static str, &'static str) {
    (
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_GIT_SHA"),
        env!("BUILD_TIMESTAMP"),
    )
}
