use serde::{Deserialize, Serialize};

use stockledger_core::{LedgerError, LedgerResult, ProductId};

/// Catalog product.
///
/// Products are immutable once registered: movement records snapshot what they
/// need, and there is no edit operation that could rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    /// Normalized barcode (see [`normalize_ean`]).
    pub ean: Option<String>,
    pub name: String,
    /// Cost in smallest currency unit (e.g. cents).
    pub cost_price: i64,
}

/// Input for registering a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub ean: Option<String>,
    pub name: String,
    pub cost_price: i64,
}

impl NewProduct {
    pub fn new(sku: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            ean: None,
            name: name.into(),
            cost_price: 0,
        }
    }

    pub fn with_ean(mut self, ean: impl Into<String>) -> Self {
        self.ean = Some(ean.into());
        self
    }

    pub fn with_cost_price(mut self, cost_price: i64) -> Self {
        self.cost_price = cost_price;
        self
    }

    pub(crate) fn validate(&self) -> LedgerResult<()> {
        if self.sku.trim().is_empty() {
            return Err(LedgerError::validation("sku cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(LedgerError::validation("name cannot be empty"));
        }
        if self.cost_price < 0 {
            return Err(LedgerError::validation("cost_price cannot be negative"));
        }
        Ok(())
    }
}

/// Normalize a scanned or typed barcode: trimmed, upper-cased.
///
/// Returns `Ok(None)` for blank input and a validation error when the value
/// contains inner whitespace.
pub fn normalize_ean(raw: &str) -> LedgerResult<Option<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(LedgerError::validation(format!(
            "EAN '{trimmed}' must not contain whitespace"
        )));
    }
    Ok(Some(trimmed.to_uppercase()))
}

/// Case-insensitive SKU comparison key.
pub fn sku_key(sku: &str) -> String {
    sku.trim().to_lowercase()
}
