//! CSV export of read-only projections.
//!
//! One row per record, header row first. Dates are ISO-8601.

use serde::Serialize;
use thiserror::Error;

use stockledger_core::LedgerError;
use stockledger_ean::EanMapping;
use stockledger_movements::AuditTrail;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer flush failed: {0}")]
    Flush(String),
    #[error("csv output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<ExportError> for LedgerError {
    fn from(value: ExportError) -> Self {
        LedgerError::storage(value.to_string())
    }
}

#[derive(Serialize)]
struct AuditRow<'a> {
    date: String,
    occurred_at: String,
    kind: &'a str,
    quantity: i64,
    running_balance: i64,
    warehouse_id: String,
    batch_no: &'a str,
    counterparty: &'a str,
    reference: &'a str,
    record_id: String,
}

#[derive(Serialize)]
struct EanRow<'a> {
    ean: &'a str,
    product_sku: &'a str,
    product_name: &'a str,
    product_id: String,
    created_at: String,
}

/// Audit trail entries in trail order (newest first).
pub fn audit_trail_csv(trail: &AuditTrail) -> Result<String, ExportError> {
    let rows = trail.entries.iter().map(|e| AuditRow {
        date: e.date.to_rfc3339(),
        occurred_at: e.occurred_at.to_rfc3339(),
        kind: e.kind.as_str(),
        quantity: e.quantity,
        running_balance: e.running_balance,
        warehouse_id: e.warehouse_id.to_string(),
        batch_no: e.batch_no.as_deref().unwrap_or(""),
        counterparty: e.counterparty.as_deref().unwrap_or(""),
        reference: e.reference.as_deref().unwrap_or(""),
        record_id: e.record_id.to_string(),
    });
    write_rows(
        &[
            "date",
            "occurred_at",
            "kind",
            "quantity",
            "running_balance",
            "warehouse_id",
            "batch_no",
            "counterparty",
            "reference",
            "record_id",
        ],
        rows,
    )
}

pub fn ean_mappings_csv(mappings: &[EanMapping]) -> Result<String, ExportError> {
    let rows = mappings.iter().map(|m| EanRow {
        ean: &m.ean,
        product_sku: &m.product_sku,
        product_name: &m.product_name,
        product_id: m.product_id.to_string(),
        created_at: m.created_at.to_rfc3339(),
    });
    write_rows(
        &["ean", "product_sku", "product_name", "product_id", "created_at"],
        rows,
    )
}

// Header is written explicitly so an empty export still has one.
fn write_rows<T: Serialize>(
    header: &[&str],
    rows: impl Iterator<Item = T>,
) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}
