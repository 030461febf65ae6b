use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{CompanyId, EanMappingId, LedgerError, ProductId};

/// Barcode → product index row.
///
/// A convenience index over the catalog: `product_sku` and `product_name` are
/// snapshots taken when the mapping was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EanMapping {
    pub id: EanMappingId,
    pub company_id: CompanyId,
    /// Normalized (trimmed, upper-cased) EAN.
    pub ean: String,
    pub product_id: ProductId,
    pub product_sku: String,
    pub product_name: String,
    pub created_at: DateTime<Utc>,
}

/// Partial update of a mapping. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EanMappingUpdate {
    pub ean: Option<String>,
    pub product_id: Option<ProductId>,
}

/// One row of a bulk import: a barcode and the SKU it should resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EanImportRow {
    pub ean: String,
    pub sku: String,
}

impl EanImportRow {
    pub fn new(ean: impl Into<String>, sku: impl Into<String>) -> Self {
        Self {
            ean: ean.into(),
            sku: sku.into(),
        }
    }
}

/// A rejected import row (1-based `row`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub ean: String,
    pub error: LedgerError,
}

/// Outcome of a bulk import: rows are independent, so failures never abort the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkImportReport {
    pub success_count: usize,
    pub errors: Vec<RowError>,
}

impl BulkImportReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
