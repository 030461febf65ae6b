use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{
    CompanyId, LedgerError, LedgerResult, ProductId, RecordId, SourceId, WarehouseId,
};

use crate::stock::StockKey;

/// Direction of a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Inward,
    Outward,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Inward => "inward",
            MovementKind::Outward => "outward",
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for an inward movement (goods received into a warehouse).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInward {
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
    pub batch_no: Option<String>,
    pub mfg_date: Option<NaiveDate>,
    pub exp_date: Option<NaiveDate>,
    /// Defaults to the product's catalog cost when absent.
    pub cost_price: Option<i64>,
    pub source_id: Option<SourceId>,
    pub document_no: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl NewInward {
    pub fn new(
        company_id: CompanyId,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        quantity: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            company_id,
            product_id,
            warehouse_id,
            quantity,
            batch_no: None,
            mfg_date: None,
            exp_date: None,
            cost_price: None,
            source_id: None,
            document_no: None,
            occurred_at,
        }
    }

    pub fn with_batch(
        mut self,
        batch_no: impl Into<String>,
        mfg_date: Option<NaiveDate>,
        exp_date: Option<NaiveDate>,
    ) -> Self {
        self.batch_no = Some(batch_no.into());
        self.mfg_date = mfg_date;
        self.exp_date = exp_date;
        self
    }

    pub fn with_source(mut self, source_id: SourceId) -> Self {
        self.source_id = Some(source_id);
        self
    }

    pub fn with_cost_price(mut self, cost_price: i64) -> Self {
        self.cost_price = Some(cost_price);
        self
    }

    pub fn with_document_no(mut self, document_no: impl Into<String>) -> Self {
        self.document_no = Some(document_no.into());
        self
    }

    pub fn stock_key(&self) -> StockKey {
        StockKey::new(self.company_id, self.product_id, self.warehouse_id)
    }

    /// Shape validation that needs no catalog or log access.
    pub fn check(&self) -> LedgerResult<()> {
        check_common(self.company_id, self.quantity)?;
        if let Some(cost) = self.cost_price {
            if cost < 0 {
                return Err(LedgerError::validation("cost_price cannot be negative"));
            }
        }
        if let (Some(mfg), Some(exp)) = (self.mfg_date, self.exp_date) {
            if exp < mfg {
                return Err(LedgerError::validation(format!(
                    "exp_date {exp} is before mfg_date {mfg}"
                )));
            }
        }
        Ok(())
    }

    /// Materialize the immutable record, stamped with the current time as its
    /// creation time. Call it where the record is about to be appended.
    pub fn into_record(
        self,
        id: RecordId,
        source: Option<String>,
        default_cost_price: i64,
    ) -> InwardRecord {
        InwardRecord {
            id,
            company_id: self.company_id,
            product_id: self.product_id,
            warehouse_id: self.warehouse_id,
            quantity: self.quantity,
            batch_no: non_blank(self.batch_no),
            mfg_date: self.mfg_date,
            exp_date: self.exp_date,
            cost_price: self.cost_price.unwrap_or(default_cost_price),
            source_id: self.source_id,
            source,
            document_no: non_blank(self.document_no),
            occurred_at: self.occurred_at,
            created_at: Utc::now(),
        }
    }
}

/// Goods received. Once created it is never altered; batch-carrying records are
/// what outward movements select against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InwardRecord {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
    pub batch_no: Option<String>,
    pub mfg_date: Option<NaiveDate>,
    pub exp_date: Option<NaiveDate>,
    pub cost_price: i64,
    pub source_id: Option<SourceId>,
    /// Source display name at the time of receipt.
    pub source: Option<String>,
    pub document_no: Option<String>,
    /// Business date supplied by the caller. Display only.
    pub occurred_at: DateTime<Utc>,
    /// When the record was created. Log order follows it.
    pub created_at: DateTime<Utc>,
}

impl InwardRecord {
    pub fn has_batch(&self) -> bool {
        self.batch_no.is_some()
    }
}

/// Batch fields copied onto an outward movement from the selected inward record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSelection {
    pub inward_record_id: RecordId,
    pub batch_no: String,
    pub mfg_date: Option<NaiveDate>,
    pub exp_date: Option<NaiveDate>,
    pub cost_price: i64,
}

/// Goods shipped out. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutwardRecord {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
    pub destination_id: SourceId,
    /// Destination display name at commit time (survives later renames).
    pub destination: String,
    pub shipment_ref: Option<String>,
    pub batch: Option<BatchSelection>,
    /// Business date supplied by the caller. Display only.
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OutwardRecord {
    pub fn batch_no(&self) -> Option<&str> {
        self.batch.as_ref().map(|b| b.batch_no.as_str())
    }
}

/// One entry of the append-only movement log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MovementRecord {
    Inward(InwardRecord),
    Outward(OutwardRecord),
}

impl MovementRecord {
    pub fn id(&self) -> RecordId {
        match self {
            MovementRecord::Inward(r) => r.id,
            MovementRecord::Outward(r) => r.id,
        }
    }

    pub fn kind(&self) -> MovementKind {
        match self {
            MovementRecord::Inward(_) => MovementKind::Inward,
            MovementRecord::Outward(_) => MovementKind::Outward,
        }
    }

    pub fn company_id(&self) -> CompanyId {
        match self {
            MovementRecord::Inward(r) => r.company_id,
            MovementRecord::Outward(r) => r.company_id,
        }
    }

    pub fn product_id(&self) -> ProductId {
        match self {
            MovementRecord::Inward(r) => r.product_id,
            MovementRecord::Outward(r) => r.product_id,
        }
    }

    pub fn warehouse_id(&self) -> WarehouseId {
        match self {
            MovementRecord::Inward(r) => r.warehouse_id,
            MovementRecord::Outward(r) => r.warehouse_id,
        }
    }

    pub fn quantity(&self) -> i64 {
        match self {
            MovementRecord::Inward(r) => r.quantity,
            MovementRecord::Outward(r) => r.quantity,
        }
    }

    /// Effect on stock: positive for inward, negative for outward.
    pub fn signed_quantity(&self) -> i64 {
        match self {
            MovementRecord::Inward(r) => r.quantity,
            MovementRecord::Outward(r) => -r.quantity,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            MovementRecord::Inward(r) => r.created_at,
            MovementRecord::Outward(r) => r.created_at,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MovementRecord::Inward(r) => r.occurred_at,
            MovementRecord::Outward(r) => r.occurred_at,
        }
    }

    /// The channel this record references (inward source or outward destination).
    pub fn source_id(&self) -> Option<SourceId> {
        match self {
            MovementRecord::Inward(r) => r.source_id,
            MovementRecord::Outward(r) => Some(r.destination_id),
        }
    }

    pub fn stock_key(&self) -> StockKey {
        StockKey::new(self.company_id(), self.product_id(), self.warehouse_id())
    }

    pub fn as_inward(&self) -> Option<&InwardRecord> {
        match self {
            MovementRecord::Inward(r) => Some(r),
            MovementRecord::Outward(_) => None,
        }
    }

    pub fn as_outward(&self) -> Option<&OutwardRecord> {
        match self {
            MovementRecord::Outward(r) => Some(r),
            MovementRecord::Inward(_) => None,
        }
    }

    /// Shape validation applied by every log on append.
    pub fn check(&self) -> LedgerResult<()> {
        check_common(self.company_id(), self.quantity())
    }
}

impl From<InwardRecord> for MovementRecord {
    fn from(value: InwardRecord) -> Self {
        MovementRecord::Inward(value)
    }
}

impl From<OutwardRecord> for MovementRecord {
    fn from(value: OutwardRecord) -> Self {
        MovementRecord::Outward(value)
    }
}

/// Log query filter. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<ProductId>,
    pub warehouse_id: Option<WarehouseId>,
    pub company_id: Option<CompanyId>,
    pub kind: Option<MovementKind>,
}

impl MovementFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter matching exactly one stock key.
    pub fn for_key(key: StockKey) -> Self {
        Self {
            product_id: Some(key.product_id),
            warehouse_id: Some(key.warehouse_id),
            company_id: Some(key.company_id),
            kind: None,
        }
    }

    pub fn product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn warehouse(mut self, warehouse_id: WarehouseId) -> Self {
        self.warehouse_id = Some(warehouse_id);
        self
    }

    pub fn company(mut self, company_id: CompanyId) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn kind(mut self, kind: MovementKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn matches(&self, record: &MovementRecord) -> bool {
        self.product_id.is_none_or(|p| p == record.product_id())
            && self.warehouse_id.is_none_or(|w| w == record.warehouse_id())
            && self.company_id.is_none_or(|c| c == record.company_id())
            && self.kind.is_none_or(|k| k == record.kind())
    }
}

pub(crate) fn check_common(company_id: CompanyId, quantity: i64) -> LedgerResult<()> {
    if company_id.is_nil() {
        return Err(LedgerError::validation("company_id is required"));
    }
    if quantity <= 0 {
        return Err(LedgerError::validation(format!(
            "quantity must be positive (got {quantity})"
        )));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
