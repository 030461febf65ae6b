//! Outward movement commit, as a typestate machine.
//!
//! ```text
//! OutwardDraft ──validate──► ValidatedOutward ──commit──► OutwardRecord
//!      │
//!      └──────────────────► RejectedOutward
//! ```
//!
//! Validation takes the stock figure as an argument: the caller must compute it
//! at commit time, under the write lock for the draft's [`StockKey`], never from
//! a figure cached when the draft was created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{
    CompanyId, LedgerError, LedgerResult, ProductId, RecordId, SourceId, WarehouseId,
};

use crate::batch::AvailableBatch;
use crate::record::{BatchSelection, OutwardRecord, check_common};
use crate::stock::StockKey;

/// Drafted: what the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutwardDraft {
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
    pub destination_id: SourceId,
    pub shipment_ref: Option<String>,
    /// Inward record id of the selected batch, if any.
    pub batch_id: Option<RecordId>,
    pub occurred_at: DateTime<Utc>,
}

impl OutwardDraft {
    pub fn new(
        company_id: CompanyId,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        quantity: i64,
        destination_id: SourceId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            company_id,
            product_id,
            warehouse_id,
            quantity,
            destination_id,
            shipment_ref: None,
            batch_id: None,
            occurred_at,
        }
    }

    pub fn with_batch(mut self, batch_id: RecordId) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    pub fn with_shipment_ref(mut self, shipment_ref: impl Into<String>) -> Self {
        self.shipment_ref = Some(shipment_ref.into());
        self
    }

    pub fn stock_key(&self) -> StockKey {
        StockKey::new(self.company_id, self.product_id, self.warehouse_id)
    }

    /// Shape validation that needs no catalog or log access.
    pub fn check(&self) -> LedgerResult<()> {
        check_common(self.company_id, self.quantity)
    }

    /// Drafted → Validated, or Drafted → Rejected.
    pub fn validate(self, context: CommitContext) -> Result<ValidatedOutward, RejectedOutward> {
        if let Err(error) = self.check() {
            return Err(RejectedOutward { draft: self, error });
        }

        let selection = match (self.batch_id, context.batch.as_ref()) {
            (None, None) => None,
            (Some(id), Some(batch)) if id == batch.record.id => {
                if let Some(remaining) = batch.remaining {
                    if self.quantity > remaining {
                        let error = LedgerError::insufficient_stock(self.quantity, remaining);
                        return Err(RejectedOutward { draft: self, error });
                    }
                }
                Some(batch.selection())
            }
            _ => {
                let error = LedgerError::validation("batch selection does not match the draft");
                return Err(RejectedOutward { draft: self, error });
            }
        };

        if self.quantity > context.available {
            let error = LedgerError::insufficient_stock(self.quantity, context.available);
            return Err(RejectedOutward { draft: self, error });
        }

        Ok(ValidatedOutward {
            draft: self,
            destination: context.destination,
            batch: selection,
        })
    }
}

/// Facts resolved at commit time for validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitContext {
    /// Available stock for the draft's key, computed inside the write lock.
    pub available: i64,
    /// Destination display name to snapshot onto the record.
    pub destination: String,
    /// The selected batch, resolved from the log.
    pub batch: Option<AvailableBatch>,
}

/// Validated: passed the stock check and may be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOutward {
    draft: OutwardDraft,
    destination: String,
    batch: Option<BatchSelection>,
}

impl ValidatedOutward {
    pub fn draft(&self) -> &OutwardDraft {
        &self.draft
    }

    /// Validated → Committed: build the immutable record to append, stamped
    /// with the current time as its creation time.
    pub fn commit(self, id: RecordId) -> OutwardRecord {
        let shipment_ref = self
            .draft
            .shipment_ref
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        OutwardRecord {
            id,
            company_id: self.draft.company_id,
            product_id: self.draft.product_id,
            warehouse_id: self.draft.warehouse_id,
            quantity: self.draft.quantity,
            destination_id: self.draft.destination_id,
            destination: self.destination,
            shipment_ref,
            batch: self.batch,
            occurred_at: self.draft.occurred_at,
            created_at: Utc::now(),
        }
    }
}

/// Rejected (terminal): nothing is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedOutward {
    pub draft: OutwardDraft,
    pub error: LedgerError,
}

impl From<RejectedOutward> for LedgerError {
    fn from(value: RejectedOutward) -> Self {
        value.error
    }
}
