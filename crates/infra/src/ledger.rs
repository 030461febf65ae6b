//! Stock ledger service facade.
//!
//! `StockLedger` is the only entry point collaborators (receiving, shipping,
//! reporting, administration) use. It composes the catalog, the source
//! registry, the EAN resolver and a `MovementLog`, and owns the per-key write
//! locks.
//!
//! ## Outward Commit Flow
//!
//! ```text
//! OutwardDraft
//!   ↓
//! 1. Shape check (quantity, company)
//!   ↓
//! 2. Resolve product and active warehouse
//!   ↓
//! 3. Share the source gate, resolve the outward destination
//!   ↓
//! 4. Acquire the (company, product, warehouse) write lock
//!   ↓
//! 5. Query the key's records, compute available stock, resolve the batch
//!   ↓
//! 6. Validate (Drafted → Validated | Rejected)
//!   ↓
//! 7. Commit, stamp the creation time and append (Validated → Committed),
//!    release the lock and the gate
//! ```
//!
//! A rejected draft appends nothing. Inward appends take the same lock and
//! gate so a commit never validates against a half-observed key, and log
//! order is the order of creation times. The caller's business date is kept
//! as `occurred_at` and never orders anything.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use stockledger_catalog::{Catalog, Product, Warehouse};
use stockledger_core::{
    CompanyId, EanMappingId, LedgerError, LedgerResult, ProductId, RecordId, SourceId,
    WarehouseId,
};
use stockledger_ean::{BulkImportReport, EanImportRow, EanMapping, EanMappingUpdate, EanResolver};
use stockledger_movements::{
    AuditTrail, AvailableBatch, CommitContext, InwardRecord, MovementFilter, MovementKind,
    MovementRecord, NewInward, OutwardDraft, OutwardRecord, StockKey, available_stock, find_batch,
};
use stockledger_sources::{Source, SourceRegistry, SourceType, SourceUsage};

use crate::config::LedgerConfig;
use crate::locks::{KeyedLocks, SourceGate};
use crate::movement_log::{InMemoryMovementLog, MovementLog};

pub struct StockLedger<L, C>
where
    L: MovementLog,
    C: Catalog + Clone,
{
    log: L,
    catalog: C,
    sources: SourceRegistry,
    eans: EanResolver<C>,
    locks: KeyedLocks,
    source_gate: SourceGate,
    config: LedgerConfig,
}

impl<C> StockLedger<InMemoryMovementLog<C>, C>
where
    C: Catalog + Clone,
{
    /// Ledger backed by an in-memory log.
    pub fn in_memory(catalog: C, config: LedgerConfig) -> Self {
        let log = InMemoryMovementLog::new(catalog.clone());
        Self::new(log, catalog, config)
    }
}

impl<L, C> StockLedger<L, C>
where
    L: MovementLog,
    C: Catalog + Clone,
{
    pub fn new(log: L, catalog: C, config: LedgerConfig) -> Self {
        Self {
            log,
            eans: EanResolver::new(catalog.clone()),
            catalog,
            sources: SourceRegistry::new(),
            locks: KeyedLocks::new(),
            source_gate: SourceGate::new(),
            config,
        }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ---- catalog ----

    pub fn products(&self) -> Vec<Product> {
        self.catalog.products()
    }

    /// Warehouses that have not been deleted.
    pub fn warehouses(&self) -> Vec<Warehouse> {
        let mut warehouses = self.catalog.warehouses();
        warehouses.retain(Warehouse::is_active);
        warehouses
    }

    fn require_product(&self, product_id: ProductId) -> LedgerResult<Product> {
        self.catalog
            .product(product_id)
            .ok_or_else(|| LedgerError::not_found("product", product_id))
    }

    fn require_active_warehouse(&self, warehouse_id: WarehouseId) -> LedgerResult<Warehouse> {
        let warehouse = self
            .catalog
            .warehouse(warehouse_id)
            .ok_or_else(|| LedgerError::not_found("warehouse", warehouse_id))?;
        if !warehouse.is_active() {
            return Err(LedgerError::validation(format!(
                "warehouse '{}' is deleted",
                warehouse.code
            )));
        }
        Ok(warehouse)
    }

    // ---- sources ----

    /// Seed the configured default sources for a company. Idempotent.
    pub fn seed_company(&self, company_id: CompanyId) -> LedgerResult<Vec<Source>> {
        self.sources
            .seed_defaults(company_id, &self.config.default_sources())
    }

    /// Sources of a company usable in `source_type` movements, inactive included.
    pub fn sources(&self, company_id: CompanyId, source_type: SourceType) -> LedgerResult<Vec<Source>> {
        self.sources.list(company_id, source_type)
    }

    pub fn active_sources(
        &self,
        company_id: CompanyId,
        source_type: SourceType,
    ) -> LedgerResult<Vec<Source>> {
        self.sources.list_active(company_id, source_type)
    }

    pub fn create_source(
        &self,
        company_id: CompanyId,
        name: &str,
        source_type: SourceType,
    ) -> LedgerResult<Source> {
        let source = self.sources.create(company_id, name, source_type)?;
        info!(company_id = %company_id, source_id = %source.id, name = %source.name, source_type = %source.source_type, "source created");
        Ok(source)
    }

    pub fn rename_source(&self, source_id: SourceId, name: &str) -> LedgerResult<Source> {
        self.sources.rename(source_id, name)
    }

    pub fn set_source_active(&self, source_id: SourceId, active: bool) -> LedgerResult<Source> {
        let source = self.sources.set_active(source_id, active)?;
        info!(source_id = %source_id, active, "source activation changed");
        Ok(source)
    }

    /// Delete a non-default source that no movement references. Waits for
    /// commits that already resolved a source to append first.
    pub fn delete_source(&self, source_id: SourceId) -> LedgerResult<Source> {
        let _gate = self.source_gate.exclusive()?;
        self.sources.delete(source_id, &LogUsage(&self.log))
    }

    // ---- movements ----

    /// Record goods received.
    pub fn add_inward(&self, input: NewInward) -> LedgerResult<InwardRecord> {
        input.check()?;
        let product = self.require_product(input.product_id)?;
        self.require_active_warehouse(input.warehouse_id)?;
        let _gate = self.source_gate.shared()?;
        let source_name = match input.source_id {
            Some(id) => Some(
                self.sources
                    .resolve_for(input.company_id, id, SourceType::Inward)?
                    .name,
            ),
            None => None,
        };

        let key = input.stock_key();
        let record = self.locks.with_key(key, move || {
            let record = input.into_record(RecordId::new(), source_name, product.cost_price);
            self.log.append(record.clone().into())?;
            Ok(record)
        })?;

        info!(
            record_id = %record.id,
            key = %key,
            quantity = record.quantity,
            batch_no = record.batch_no.as_deref().unwrap_or(""),
            "inward movement recorded"
        );
        Ok(record)
    }

    /// Record goods shipped. Stock is re-checked under the key's write lock;
    /// a rejected draft leaves the log untouched.
    pub fn add_outward(&self, draft: OutwardDraft) -> LedgerResult<OutwardRecord> {
        draft.check()?;
        self.require_product(draft.product_id)?;
        self.require_active_warehouse(draft.warehouse_id)?;
        let _gate = self.source_gate.shared()?;
        let destination =
            self.sources
                .resolve_for(draft.company_id, draft.destination_id, SourceType::Outward)?;

        let key = draft.stock_key();
        let policy = self.config.batch_policy;
        let record = self.locks.with_key(key, move || {
            let records = self.log.query(&MovementFilter::for_key(key))?;
            let available = available_stock(
                &records,
                key.product_id,
                key.warehouse_id,
                Some(key.company_id),
            );
            let batch = match draft.batch_id {
                Some(id) => Some(
                    find_batch(&records, id, policy)
                        .ok_or_else(|| LedgerError::not_found("batch", id))?,
                ),
                None => None,
            };

            let context = CommitContext {
                available,
                destination: destination.name,
                batch,
            };
            let validated = draft.validate(context).map_err(|rejected| {
                warn!(
                    key = %key,
                    requested = rejected.draft.quantity,
                    error = %rejected.error,
                    "outward movement rejected"
                );
                LedgerError::from(rejected)
            })?;

            let record = validated.commit(RecordId::new());
            self.log.append(record.clone().into())?;
            Ok(record)
        })?;

        info!(
            record_id = %record.id,
            key = %key,
            quantity = record.quantity,
            destination = %record.destination,
            "outward movement recorded"
        );
        Ok(record)
    }

    // ---- projections ----

    pub fn product_stock(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        company_id: CompanyId,
    ) -> LedgerResult<i64> {
        let key = StockKey::new(company_id, product_id, warehouse_id);
        let records = self.log.query(&MovementFilter::for_key(key))?;
        Ok(available_stock(&records, product_id, warehouse_id, Some(company_id)))
    }

    /// Stock per active warehouse. Deleted warehouses are left out.
    pub fn stock_by_warehouse(
        &self,
        product_id: ProductId,
        company_id: CompanyId,
    ) -> LedgerResult<BTreeMap<WarehouseId, i64>> {
        let filter = MovementFilter::all().product(product_id).company(company_id);
        let records = self.log.query(&filter)?;
        let mut totals =
            stockledger_movements::stock_by_warehouse(&records, product_id, Some(company_id));
        totals.retain(|id, _| {
            self.catalog
                .warehouse(*id)
                .is_some_and(|w| w.is_active())
        });
        Ok(totals)
    }

    /// Inward records matching `filter`, in creation order.
    pub fn inward_records(&self, filter: MovementFilter) -> LedgerResult<Vec<InwardRecord>> {
        let records = self.log.query(&filter.kind(MovementKind::Inward))?;
        Ok(records
            .into_iter()
            .filter_map(|r| match r {
                MovementRecord::Inward(inward) => Some(inward),
                MovementRecord::Outward(_) => None,
            })
            .collect())
    }

    /// Outward records matching `filter`, in creation order.
    pub fn outward_records(&self, filter: MovementFilter) -> LedgerResult<Vec<OutwardRecord>> {
        let records = self.log.query(&filter.kind(MovementKind::Outward))?;
        Ok(records
            .into_iter()
            .filter_map(|r| match r {
                MovementRecord::Outward(outward) => Some(outward),
                MovementRecord::Inward(_) => None,
            })
            .collect())
    }

    /// Batches selectable for an outward movement, oldest first.
    pub fn available_batches(
        &self,
        company_id: CompanyId,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> LedgerResult<Vec<AvailableBatch>> {
        let key = StockKey::new(company_id, product_id, warehouse_id);
        let records = self.log.query(&MovementFilter::for_key(key))?;
        Ok(stockledger_movements::available_batches(
            &records,
            product_id,
            warehouse_id,
            Some(company_id),
            self.config.batch_policy,
        ))
    }

    pub fn audit_trail(
        &self,
        product_id: ProductId,
        warehouse_id: Option<WarehouseId>,
        company_id: Option<CompanyId>,
    ) -> LedgerResult<AuditTrail> {
        let mut filter = MovementFilter::all().product(product_id);
        if let Some(warehouse_id) = warehouse_id {
            filter = filter.warehouse(warehouse_id);
        }
        if let Some(company_id) = company_id {
            filter = filter.company(company_id);
        }
        let records = self.log.query(&filter)?;
        Ok(stockledger_movements::trail(
            &records,
            product_id,
            warehouse_id,
            company_id,
        ))
    }

    // ---- EAN mappings ----

    pub fn resolve_ean(&self, company_id: CompanyId, ean: &str) -> LedgerResult<Product> {
        self.eans.resolve(company_id, ean)
    }

    pub fn create_ean_mapping(
        &self,
        company_id: CompanyId,
        ean: &str,
        product_id: ProductId,
    ) -> LedgerResult<EanMapping> {
        self.eans.create(company_id, ean, product_id)
    }

    pub fn update_ean_mapping(
        &self,
        id: EanMappingId,
        update: EanMappingUpdate,
    ) -> LedgerResult<EanMapping> {
        self.eans.update(id, update)
    }

    pub fn delete_ean_mapping(&self, id: EanMappingId) -> LedgerResult<EanMapping> {
        self.eans.delete(id)
    }

    pub fn ean_mapping(&self, id: EanMappingId) -> LedgerResult<EanMapping> {
        self.eans.get(id)
    }

    pub fn ean_mappings(&self, company_id: CompanyId) -> LedgerResult<Vec<EanMapping>> {
        self.eans.list(company_id)
    }

    pub fn search_ean_mappings(
        &self,
        company_id: CompanyId,
        query: &str,
    ) -> LedgerResult<Vec<EanMapping>> {
        self.eans.search(company_id, query)
    }

    /// Import `(ean, sku)` rows against the catalog's products. Rows succeed or
    /// fail independently.
    pub fn bulk_import_ean_mappings(
        &self,
        company_id: CompanyId,
        rows: &[EanImportRow],
    ) -> BulkImportReport {
        self.eans
            .bulk_import(company_id, rows, &self.catalog.products())
    }
}

/// Counts source references by scanning the movement log.
struct LogUsage<'a, L: ?Sized>(&'a L);

impl<L> SourceUsage for LogUsage<'_, L>
where
    L: MovementLog + ?Sized,
{
    fn references(&self, source_id: SourceId) -> LedgerResult<usize> {
        let count = self
            .0
            .query(&MovementFilter::all())?
            .iter()
            .filter(|r| r.source_id() == Some(source_id))
            .count();
        debug!(source_id = %source_id, references = count, "source usage counted");
        Ok(count)
    }
}
