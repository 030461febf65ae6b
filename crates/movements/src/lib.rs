//! Movement domain module.
//!
//! Business rules for stock movements, implemented purely as deterministic
//! functions over records (no IO, no locking, no storage): the record types,
//! the stock calculator, batch allocation, the outward commit state machine
//! and audit-trail reconstruction.

pub mod audit;
pub mod batch;
pub mod outward;
pub mod record;
pub mod stock;

pub use audit::{AuditEntry, AuditTrail, trail};
pub use batch::{AvailableBatch, BatchPolicy, available_batches, batch_remaining, find_batch};
pub use outward::{CommitContext, OutwardDraft, RejectedOutward, ValidatedOutward};
pub use record::{
    BatchSelection, InwardRecord, MovementFilter, MovementKind, MovementRecord, NewInward,
    OutwardRecord,
};
pub use stock::{StockKey, available_stock, stock_by_warehouse};
