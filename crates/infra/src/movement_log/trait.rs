use std::sync::Arc;

use stockledger_core::{LedgerResult, RecordId};
use stockledger_movements::{MovementFilter, MovementRecord};

/// Append-only store of inward and outward records.
///
/// The `MovementLog` is the single source of truth of the ledger. Every stock
/// figure, batch listing and audit trail is a projection over what `query`
/// returns.
///
/// ## Append Semantics
///
/// `append()`:
/// - rejects records with a non-positive quantity or a nil company id
/// - rejects records whose product or warehouse is unknown to the catalog
/// - rejects a record id that was already appended
/// - persists the record atomically (it is either fully appended or not at all)
///
/// There is no update or delete: corrections are new, offsetting records.
///
/// ## Query Semantics
///
/// `query()` returns matching records in creation (append) order. The order is
/// stable across calls.
///
/// ## Concurrency
///
/// Implementations must allow concurrent readers and writers. The log does not
/// serialize read-validate-append sequences itself; callers that validate
/// against the log (outward commits) hold a per-key lock around the sequence.
pub trait MovementLog: Send + Sync {
    fn append(&self, record: MovementRecord) -> LedgerResult<RecordId>;

    fn query(&self, filter: &MovementFilter) -> LedgerResult<Vec<MovementRecord>>;

    /// Total number of records in the log.
    fn len(&self) -> LedgerResult<usize>;

    fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl<S> MovementLog for Arc<S>
where
    S: MovementLog + ?Sized,
{
    fn append(&self, record: MovementRecord) -> LedgerResult<RecordId> {
        (**self).append(record)
    }

    fn query(&self, filter: &MovementFilter) -> LedgerResult<Vec<MovementRecord>> {
        (**self).query(filter)
    }

    fn len(&self) -> LedgerResult<usize> {
        (**self).len()
    }
}
