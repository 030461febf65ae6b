use std::sync::RwLock;

use stockledger_catalog::Catalog;
use stockledger_core::{LedgerError, LedgerResult, RecordId};
use stockledger_movements::{MovementFilter, MovementRecord};

use super::r#trait::MovementLog;

/// In-memory append-only movement log.
///
/// Intended for tests/dev. Not optimized for performance: queries scan the
/// whole log.
#[derive(Debug)]
pub struct InMemoryMovementLog<C>
where
    C: Catalog,
{
    catalog: C,
    records: RwLock<Vec<MovementRecord>>,
}

impl<C> InMemoryMovementLog<C>
where
    C: Catalog,
{
    pub fn new(catalog: C) -> Self {
        Self {
            catalog,
            records: RwLock::new(Vec::new()),
        }
    }

    fn validate(&self, record: &MovementRecord) -> LedgerResult<()> {
        record.check()?;
        if self.catalog.product(record.product_id()).is_none() {
            return Err(LedgerError::validation(format!(
                "unknown product {}",
                record.product_id()
            )));
        }
        if self.catalog.warehouse(record.warehouse_id()).is_none() {
            return Err(LedgerError::validation(format!(
                "unknown warehouse {}",
                record.warehouse_id()
            )));
        }
        Ok(())
    }
}

impl<C> MovementLog for InMemoryMovementLog<C>
where
    C: Catalog,
{
    fn append(&self, record: MovementRecord) -> LedgerResult<RecordId> {
        self.validate(&record)?;

        let mut records = self
            .records
            .write()
            .map_err(|_| LedgerError::storage("movement log lock poisoned"))?;

        let id = record.id();
        if records.iter().any(|r| r.id() == id) {
            return Err(LedgerError::validation(format!(
                "record {id} already exists"
            )));
        }

        records.push(record);
        Ok(id)
    }

    fn query(&self, filter: &MovementFilter) -> LedgerResult<Vec<MovementRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| LedgerError::storage("movement log lock poisoned"))?;

        Ok(records.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    fn len(&self) -> LedgerResult<usize> {
        let records = self
            .records
            .read()
            .map_err(|_| LedgerError::storage("movement log lock poisoned"))?;
        Ok(records.len())
    }
}
