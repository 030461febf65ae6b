//! Stock availability: a pure projection over movement records.
//!
//! Nothing here caches or mutates; recomputing from the same records always
//! yields the same figure, in any record order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stockledger_core::{CompanyId, ProductId, WarehouseId};

use crate::record::MovementRecord;

/// The unit of write serialization: one product in one warehouse of one company.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
}

impl StockKey {
    pub fn new(company_id: CompanyId, product_id: ProductId, warehouse_id: WarehouseId) -> Self {
        Self {
            company_id,
            product_id,
            warehouse_id,
        }
    }
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.company_id, self.product_id, self.warehouse_id
        )
    }
}

/// Σ inward − Σ outward over the records matching product, warehouse and
/// (when given) company.
pub fn available_stock<'a>(
    records: impl IntoIterator<Item = &'a MovementRecord>,
    product_id: ProductId,
    warehouse_id: WarehouseId,
    company_id: Option<CompanyId>,
) -> i64 {
    records
        .into_iter()
        .filter(|r| r.product_id() == product_id && r.warehouse_id() == warehouse_id)
        .filter(|r| company_id.is_none_or(|c| c == r.company_id()))
        .map(MovementRecord::signed_quantity)
        .sum()
}

/// Stock of one product per warehouse.
pub fn stock_by_warehouse<'a>(
    records: impl IntoIterator<Item = &'a MovementRecord>,
    product_id: ProductId,
    company_id: Option<CompanyId>,
) -> BTreeMap<WarehouseId, i64> {
    let mut totals = BTreeMap::new();
    for r in records
        .into_iter()
        .filter(|r| r.product_id() == product_id)
        .filter(|r| company_id.is_none_or(|c| c == r.company_id()))
    {
        *totals.entry(r.warehouse_id()).or_insert(0) += r.signed_quantity();
    }
    totals
}
