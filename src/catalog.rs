//! Product catalog snapshot.
//!
//! The snapshot is an immutable id → entry table loaded from the backend. A
//! refresh builds a new snapshot and swaps it into the shared [`CatalogHandle`]
//! wholesale; carts holding line items keep the names and prices they captured
//! when the line was created.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::money::Money;

/// One product as sold at the counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub product_id: String,
    pub product_name: String,
    pub price_per_unit: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

impl CatalogEntry {
    pub fn new(product_id: impl Into<String>, product_name: impl Into<String>, price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            price_per_unit: price,
            barcode: None,
        }
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }
}

/// Backend product row (`/getProducts`, `/getProductByBarcode`).
///
/// `product_id` is an integer column on the backend but is treated as an
/// opaque string here.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRecord {
    #[serde(alias = "productId", alias = "id")]
    pub product_id: Value,
    #[serde(default, alias = "productName", alias = "name")]
    pub product_name: Option<String>,
    #[serde(alias = "pricePerUnit", alias = "price")]
    pub price_per_unit: f64,
    #[serde(default)]
    pub barcode: Option<Value>,
}

impl ProductRecord {
    pub fn product_id_string(&self) -> Option<String> {
        value_to_code(&self.product_id)
    }

    /// Validate and quantize into a catalog entry.
    pub fn into_entry(self) -> Result<CatalogEntry, String> {
        let product_id = self
            .product_id_string()
            .ok_or_else(|| format!("Invalid product id: {}", self.product_id))?;
        let price = Money::from_decimal(self.price_per_unit).ok_or_else(|| {
            format!(
                "Invalid price {} for product {product_id}",
                self.price_per_unit
            )
        })?;
        let name = self.product_name.as_deref().map(str::trim).unwrap_or_default();
        let product_name = if name.is_empty() {
            "Unknown Product".to_string()
        } else {
            name.to_string()
        };
        Ok(CatalogEntry {
            product_id,
            product_name,
            price_per_unit: price,
            barcode: self.barcode.as_ref().and_then(value_to_code),
        })
    }
}

/// Integer or string JSON value as a trimmed, non-empty code.
pub(crate) fn value_to_code(value: &Value) -> Option<String> {
    let code = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!code.is_empty()).then_some(code)
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable lookup table of catalog entries, in backend order.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    entries: Vec<CatalogEntry>,
    by_id: HashMap<String, usize>,
    by_barcode: HashMap<String, usize>,
}

impl CatalogSnapshot {
    /// Build a snapshot. Duplicate ids keep the first occurrence.
    pub fn new(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut snapshot = CatalogSnapshot::default();
        for entry in entries {
            if snapshot.by_id.contains_key(&entry.product_id) {
                warn!(product_id = %entry.product_id, "Duplicate catalog id, keeping first");
                continue;
            }
            let idx = snapshot.entries.len();
            snapshot.by_id.insert(entry.product_id.clone(), idx);
            if let Some(barcode) = &entry.barcode {
                snapshot.by_barcode.entry(barcode.clone()).or_insert(idx);
            }
            snapshot.entries.push(entry);
        }
        snapshot
    }

    /// Build from raw backend JSON rows. Rows that do not decode are logged
    /// and skipped; the rest go through [`CatalogSnapshot::from_records`].
    pub fn from_rows(rows: Vec<Value>) -> Self {
        let records = rows
            .into_iter()
            .enumerate()
            .filter_map(|(i, row)| match serde_json::from_value::<ProductRecord>(row) {
                Ok(r) => Some(r),
                Err(e) => {
                    warn!(row = i, error = %e, "Skipping undecodable catalog row");
                    None
                }
            })
            .collect();
        Self::from_records(records)
    }

    /// Build from backend rows, skipping rows that fail validation.
    pub fn from_records(records: Vec<ProductRecord>) -> Self {
        let total = records.len();
        let entries: Vec<CatalogEntry> = records
            .into_iter()
            .filter_map(|r| match r.into_entry() {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!(error = %e, "Skipping catalog row");
                    None
                }
            })
            .collect();
        debug!(rows = total, accepted = entries.len(), "Catalog rows ingested");
        Self::new(entries)
    }

    pub fn get(&self, product_id: &str) -> Option<&CatalogEntry> {
        self.by_id
            .get(product_id.trim())
            .and_then(|&i| self.entries.get(i))
    }

    /// Resolve a scanned code: product id first, then barcode.
    pub fn resolve(&self, code: &str) -> Option<&CatalogEntry> {
        let code = code.trim();
        self.get(code).or_else(|| {
            self.by_barcode
                .get(code)
                .and_then(|&i| self.entries.get(i))
        })
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.get(product_id).is_some()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Shared, swappable reference to the current snapshot.
///
/// `None` until the first successful load; carts treat that as
/// "catalog not ready".
#[derive(Debug, Clone, Default)]
pub struct CatalogHandle {
    inner: Arc<RwLock<Option<Arc<CatalogSnapshot>>>>,
}

impl CatalogHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: CatalogSnapshot) -> Self {
        let handle = Self::new();
        handle.replace(snapshot);
        handle
    }

    /// Current snapshot, if one has been loaded.
    pub fn current(&self) -> Option<Arc<CatalogSnapshot>> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Swap in a new snapshot. Only the lookup table changes.
    pub fn replace(&self, snapshot: CatalogSnapshot) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(Arc::new(snapshot));
    }
}
