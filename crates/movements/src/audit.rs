//! Audit trail reconstruction: every movement of a product, with running balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{CompanyId, ProductId, RecordId, WarehouseId};

use crate::record::{MovementKind, MovementRecord};

/// One line of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub record_id: RecordId,
    /// Creation time of the record. The trail is ordered by it.
    pub date: DateTime<Utc>,
    /// Business date supplied with the movement.
    pub occurred_at: DateTime<Utc>,
    pub kind: MovementKind,
    pub quantity: i64,
    /// Balance immediately after this movement.
    pub running_balance: i64,
    pub warehouse_id: WarehouseId,
    pub batch_no: Option<String>,
    /// Inward source or outward destination name, as recorded.
    pub counterparty: Option<String>,
    /// Document number (inward) or shipment reference (outward).
    pub reference: Option<String>,
}

/// Audit trail with derived totals. Entries are newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrail {
    pub entries: Vec<AuditEntry>,
    pub total_inward: i64,
    pub total_outward: i64,
    pub balance: i64,
}

impl AuditTrail {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merge inward and outward records for a product into one trail.
///
/// `records` must be in log order. The balance is walked in that order, the
/// same order commits were validated in, and the result is reversed for
/// presentation. Business dates never reorder the walk.
pub fn trail(
    records: &[MovementRecord],
    product_id: ProductId,
    warehouse_id: Option<WarehouseId>,
    company_id: Option<CompanyId>,
) -> AuditTrail {
    let matching = records
        .iter()
        .filter(|r| r.product_id() == product_id)
        .filter(|r| warehouse_id.is_none_or(|w| w == r.warehouse_id()))
        .filter(|r| company_id.is_none_or(|c| c == r.company_id()));

    let mut trail = AuditTrail::default();
    let mut balance = 0i64;
    for record in matching {
        balance += record.signed_quantity();
        match record.kind() {
            MovementKind::Inward => trail.total_inward += record.quantity(),
            MovementKind::Outward => trail.total_outward += record.quantity(),
        }
        trail.entries.push(entry(record, balance));
    }

    trail.balance = balance;
    trail.entries.reverse();
    trail
}

fn entry(record: &MovementRecord, running_balance: i64) -> AuditEntry {
    let (batch_no, counterparty, reference) = match record {
        MovementRecord::Inward(r) => (r.batch_no.clone(), r.source.clone(), r.document_no.clone()),
        MovementRecord::Outward(r) => (
            r.batch_no().map(str::to_string),
            Some(r.destination.clone()),
            r.shipment_ref.clone(),
        ),
    };

    AuditEntry {
        record_id: record.id(),
        date: record.created_at(),
        occurred_at: record.occurred_at(),
        kind: record.kind(),
        quantity: record.quantity(),
        running_balance,
        warehouse_id: record.warehouse_id(),
        batch_no,
        counterparty,
        reference,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::record::{NewInward, OutwardRecord};
    use crate::stock::StockKey;
    use stockledger_core::SourceId;

    fn t(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn inward(key: StockKey, quantity: i64, at: DateTime<Utc>) -> MovementRecord {
        NewInward::new(key.company_id, key.product_id, key.warehouse_id, quantity, at)
            .with_document_no("GRN-1")
            .into_record(RecordId::new(), Some("Factory".into()), 0)
            .into()
    }

    fn outward(key: StockKey, quantity: i64, at: DateTime<Utc>) -> MovementRecord {
        OutwardRecord {
            id: RecordId::new(),
            company_id: key.company_id,
            product_id: key.product_id,
            warehouse_id: key.warehouse_id,
            quantity,
            destination_id: SourceId::new(),
            destination: "Amazon FBA".into(),
            shipment_ref: Some("SH-9".into()),
            batch: None,
            occurred_at: at,
            created_at: at,
        }
        .into()
    }

    fn key() -> StockKey {
        StockKey::new(CompanyId::new(), ProductId::new(), WarehouseId::new())
    }

    #[test]
    fn newest_first_with_running_balance() {
        let k = key();
        let records = vec![inward(k, 100, t(0)), inward(k, 50, t(1)), outward(k, 120, t(2))];

        let trail = trail(&records, k.product_id, Some(k.warehouse_id), Some(k.company_id));

        let rows: Vec<_> = trail
            .entries
            .iter()
            .map(|e| (e.kind, e.quantity, e.running_balance))
            .collect();
        assert_eq!(
            rows,
            vec![
                (MovementKind::Outward, 120, 30),
                (MovementKind::Inward, 50, 150),
                (MovementKind::Inward, 100, 100),
            ]
        );
        assert_eq!(trail.total_inward, 150);
        assert_eq!(trail.total_outward, 120);
        assert_eq!(trail.balance, 30);
    }

    #[test]
    fn balance_walks_log_order_not_business_date() {
        let k = key();
        // Shipment dated before the receipt it was validated against.
        let mut shipped = outward(k, 8, t(-60));
        if let MovementRecord::Outward(r) = &mut shipped {
            r.created_at = t(6);
        }
        let records = vec![inward(k, 10, t(5)), shipped, inward(k, 4, t(1))];

        let trail = trail(&records, k.product_id, None, None);
        let balances: Vec<_> = trail.entries.iter().map(|e| e.running_balance).collect();
        assert_eq!(balances, vec![6, 2, 10]);
        assert!(trail.entries.iter().all(|e| e.running_balance >= 0));
        assert_eq!(trail.entries[1].occurred_at, t(-60));
        assert_eq!(trail.entries[1].date, t(6));
    }

    #[test]
    fn equal_timestamps_keep_log_order() {
        let k = key();
        let records = vec![inward(k, 10, t(0)), outward(k, 3, t(0))];

        let trail = trail(&records, k.product_id, None, None);
        assert_eq!(trail.entries[0].kind, MovementKind::Outward);
        assert_eq!(trail.entries[0].running_balance, 7);
    }

    #[test]
    fn entries_carry_counterparty_and_reference() {
        let k = key();
        let records = vec![inward(k, 10, t(0)), outward(k, 3, t(1))];

        let trail = trail(&records, k.product_id, None, None);
        assert_eq!(trail.entries[0].counterparty.as_deref(), Some("Amazon FBA"));
        assert_eq!(trail.entries[0].reference.as_deref(), Some("SH-9"));
        assert_eq!(trail.entries[1].counterparty.as_deref(), Some("Factory"));
        assert_eq!(trail.entries[1].reference.as_deref(), Some("GRN-1"));
    }

    #[test]
    fn without_warehouse_filter_all_warehouses_are_merged() {
        let a = key();
        let b = StockKey::new(a.company_id, a.product_id, WarehouseId::new());
        let records = vec![inward(a, 10, t(0)), inward(b, 5, t(1)), inward(key(), 99, t(2))];

        let all = trail(&records, a.product_id, None, Some(a.company_id));
        assert_eq!(all.len(), 2);
        assert_eq!(all.balance, 15);

        let only_b = trail(&records, a.product_id, Some(b.warehouse_id), None);
        assert_eq!(only_b.balance, 5);
    }

    #[test]
    fn unknown_product_yields_empty_trail() {
        let trail = trail(&[], ProductId::new(), None, None);
        assert!(trail.is_empty());
        assert_eq!(trail.balance, 0);
    }
}
