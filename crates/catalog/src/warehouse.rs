use serde::{Deserialize, Serialize};

use stockledger_core::WarehouseId;

/// Warehouse (soft-deletable).
///
/// A deleted warehouse keeps its movement history but accepts no new movements
/// and is left out of active balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub code: String,
    pub is_deleted: bool,
}

impl Warehouse {
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}
