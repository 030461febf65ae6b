//! Batch allocation: which inward lots an outward movement may select.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockledger_core::{CompanyId, LedgerError, ProductId, RecordId, WarehouseId};

use crate::record::{BatchSelection, InwardRecord, MovementRecord};

/// How batch selection interacts with quantities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchPolicy {
    /// Only aggregate stock is enforced; a batch can be selected any number of times.
    #[default]
    AggregateOnly,
    /// Each batch has `remaining = quantity − Σ outward that selected it`;
    /// exhausted batches are hidden and cannot be over-allocated.
    TrackRemaining,
}

impl FromStr for BatchPolicy {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aggregate" | "aggregate-only" => Ok(BatchPolicy::AggregateOnly),
            "track-remaining" | "remaining" => Ok(BatchPolicy::TrackRemaining),
            other => Err(LedgerError::validation(format!(
                "unknown batch policy '{other}'"
            ))),
        }
    }
}

/// A selectable batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableBatch {
    pub record: InwardRecord,
    /// `None` under [`BatchPolicy::AggregateOnly`].
    pub remaining: Option<i64>,
}

impl AvailableBatch {
    /// The read-only fields auto-filled onto the outward movement.
    pub fn selection(&self) -> BatchSelection {
        BatchSelection {
            inward_record_id: self.record.id,
            batch_no: self.record.batch_no.clone().unwrap_or_default(),
            mfg_date: self.record.mfg_date,
            exp_date: self.record.exp_date,
            cost_price: self.record.cost_price,
        }
    }
}

/// Inward records with a batch number for the product/warehouse, oldest first.
///
/// `records` must be in creation order (as returned by the movement log).
pub fn available_batches(
    records: &[MovementRecord],
    product_id: ProductId,
    warehouse_id: WarehouseId,
    company_id: Option<CompanyId>,
    policy: BatchPolicy,
) -> Vec<AvailableBatch> {
    records
        .iter()
        .filter_map(MovementRecord::as_inward)
        .filter(|r| r.product_id == product_id && r.warehouse_id == warehouse_id)
        .filter(|r| company_id.is_none_or(|c| c == r.company_id))
        .filter(|r| r.has_batch())
        .map(|r| with_remaining(records, r, policy))
        .filter(|b| b.remaining.is_none_or(|left| left > 0))
        .collect()
}

/// Look up one batch by its inward record id, exhausted or not.
///
/// Returns `None` when the record does not exist or carries no batch number.
pub fn find_batch(
    records: &[MovementRecord],
    batch_id: RecordId,
    policy: BatchPolicy,
) -> Option<AvailableBatch> {
    records
        .iter()
        .filter_map(MovementRecord::as_inward)
        .find(|r| r.id == batch_id && r.has_batch())
        .map(|r| with_remaining(records, r, policy))
}

/// Quantity of a batch not yet claimed by outward records that selected it.
pub fn batch_remaining(records: &[MovementRecord], batch: &InwardRecord) -> i64 {
    let allocated: i64 = records
        .iter()
        .filter_map(MovementRecord::as_outward)
        .filter(|o| {
            o.batch
                .as_ref()
                .is_some_and(|b| b.inward_record_id == batch.id)
        })
        .map(|o| o.quantity)
        .sum();
    batch.quantity - allocated
}

fn with_remaining(
    records: &[MovementRecord],
    record: &InwardRecord,
    policy: BatchPolicy,
) -> AvailableBatch {
    let remaining = match policy {
        BatchPolicy::AggregateOnly => None,
        BatchPolicy::TrackRemaining => Some(batch_remaining(records, record)),
    };
    AvailableBatch {
        record: record.clone(),
        remaining,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::record::{NewInward, OutwardRecord};
    use crate::stock::StockKey;
    use stockledger_core::SourceId;

    fn key() -> StockKey {
        StockKey::new(CompanyId::new(), ProductId::new(), WarehouseId::new())
    }

    fn inward(key: StockKey, quantity: i64, batch: Option<&str>, minute: i64) -> MovementRecord {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap() + Duration::minutes(minute);
        let mut new = NewInward::new(
            key.company_id,
            key.product_id,
            key.warehouse_id,
            quantity,
            at,
        )
        .with_cost_price(400);
        if let Some(b) = batch {
            new = new.with_batch(
                b,
                NaiveDate::from_ymd_opt(2024, 12, 1),
                NaiveDate::from_ymd_opt(2026, 12, 1),
            );
        }
        new.into_record(RecordId::new(), None, 0).into()
    }

    fn outward_from(batch: &AvailableBatch, quantity: i64) -> MovementRecord {
        let r = &batch.record;
        OutwardRecord {
            id: RecordId::new(),
            company_id: r.company_id,
            product_id: r.product_id,
            warehouse_id: r.warehouse_id,
            quantity,
            destination_id: SourceId::new(),
            destination: "Retail".into(),
            shipment_ref: None,
            batch: Some(batch.selection()),
            occurred_at: Utc::now(),
            created_at: Utc::now(),
        }
        .into()
    }

    #[test]
    fn lists_only_batched_records_oldest_first() {
        let k = key();
        let records = vec![
            inward(k, 10, Some("B-1"), 0),
            inward(k, 5, None, 1),
            inward(k, 8, Some("B-2"), 2),
            inward(key(), 99, Some("OTHER"), 3),
        ];

        let batches = available_batches(
            &records,
            k.product_id,
            k.warehouse_id,
            Some(k.company_id),
            BatchPolicy::AggregateOnly,
        );
        let numbers: Vec<_> = batches
            .iter()
            .map(|b| b.record.batch_no.clone().unwrap())
            .collect();
        assert_eq!(numbers, vec!["B-1", "B-2"]);
        assert!(batches.iter().all(|b| b.remaining.is_none()));
    }

    #[test]
    fn selection_copies_batch_fields() {
        let k = key();
        let records = vec![inward(k, 10, Some("B-1"), 0)];
        let batch = &available_batches(
            &records,
            k.product_id,
            k.warehouse_id,
            None,
            BatchPolicy::AggregateOnly,
        )[0];

        let sel = batch.selection();
        assert_eq!(sel.inward_record_id, batch.record.id);
        assert_eq!(sel.batch_no, "B-1");
        assert_eq!(sel.mfg_date, NaiveDate::from_ymd_opt(2024, 12, 1));
        assert_eq!(sel.exp_date, NaiveDate::from_ymd_opt(2026, 12, 1));
        assert_eq!(sel.cost_price, 400);
    }

    #[test]
    fn aggregate_policy_keeps_selected_batches_listed() {
        let k = key();
        let mut records = vec![inward(k, 10, Some("B-1"), 0)];
        let batch = find_batch(&records, records[0].id(), BatchPolicy::AggregateOnly).unwrap();
        records.push(outward_from(&batch, 10));

        let batches = available_batches(
            &records,
            k.product_id,
            k.warehouse_id,
            None,
            BatchPolicy::AggregateOnly,
        );
        assert_eq!(batches.len(), 1);
    }

    #[test]
    fn track_remaining_hides_exhausted_batches() {
        let k = key();
        let mut records = vec![inward(k, 10, Some("B-1"), 0), inward(k, 6, Some("B-2"), 1)];
        let first = find_batch(&records, records[0].id(), BatchPolicy::TrackRemaining).unwrap();
        assert_eq!(first.remaining, Some(10));

        records.push(outward_from(&first, 4));
        let listed = available_batches(
            &records,
            k.product_id,
            k.warehouse_id,
            None,
            BatchPolicy::TrackRemaining,
        );
        assert_eq!(listed[0].remaining, Some(6));
        assert_eq!(listed[1].remaining, Some(6));

        records.push(outward_from(&first, 6));
        let listed = available_batches(
            &records,
            k.product_id,
            k.warehouse_id,
            None,
            BatchPolicy::TrackRemaining,
        );
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].record.batch_no.as_deref(), Some("B-2"));

        // Still findable for validation, with nothing left.
        let exhausted = find_batch(&records, first.record.id, BatchPolicy::TrackRemaining).unwrap();
        assert_eq!(exhausted.remaining, Some(0));
    }

    #[test]
    fn find_batch_ignores_unbatched_records() {
        let k = key();
        let records = vec![inward(k, 5, None, 0)];
        assert!(find_batch(&records, records[0].id(), BatchPolicy::AggregateOnly).is_none());
        assert!(find_batch(&records, RecordId::new(), BatchPolicy::AggregateOnly).is_none());
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("aggregate".parse::<BatchPolicy>().unwrap(), BatchPolicy::AggregateOnly);
        assert_eq!(
            " Track-Remaining ".parse::<BatchPolicy>().unwrap(),
            BatchPolicy::TrackRemaining
        );
        assert!("fifo".parse::<BatchPolicy>().is_err());
    }
}
