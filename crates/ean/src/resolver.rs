use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use stockledger_catalog::{Catalog, Product, normalize_ean, sku_key};
use stockledger_core::{CompanyId, EanMappingId, LedgerError, LedgerResult, ProductId};

use crate::mapping::{BulkImportReport, EanImportRow, EanMapping, EanMappingUpdate, RowError};

/// Resolves scanned barcodes to catalog products and maintains the per-company
/// EAN index.
///
/// Lookups are exact (after trimming and case folding) and synchronous. Any
/// debounce of keystroke-driven lookups belongs to the caller.
#[derive(Debug)]
pub struct EanResolver<C>
where
    C: Catalog,
{
    catalog: C,
    mappings: RwLock<Vec<EanMapping>>,
}

impl<C> EanResolver<C>
where
    C: Catalog,
{
    pub fn new(catalog: C) -> Self {
        Self {
            catalog,
            mappings: RwLock::new(Vec::new()),
        }
    }

    /// Resolve a barcode for a company.
    ///
    /// Company mappings win; otherwise a catalog product carrying the same EAN
    /// is returned.
    pub fn resolve(&self, company_id: CompanyId, ean: &str) -> LedgerResult<Product> {
        let key = require_ean(ean)?;

        let mapped = {
            let mappings = self.read()?;
            mappings
                .iter()
                .find(|m| m.company_id == company_id && m.ean == key)
                .map(|m| m.product_id)
        };

        let product = match mapped {
            Some(product_id) => self.catalog.product(product_id),
            None => self
                .catalog
                .products()
                .into_iter()
                .find(|p| p.ean.as_deref() == Some(key.as_str())),
        };

        product.ok_or_else(|| LedgerError::not_found("ean", key))
    }

    pub fn create(
        &self,
        company_id: CompanyId,
        ean: &str,
        product_id: ProductId,
    ) -> LedgerResult<EanMapping> {
        if company_id.is_nil() {
            return Err(LedgerError::validation("company_id is required"));
        }
        let key = require_ean(ean)?;
        let product = self
            .catalog
            .product(product_id)
            .ok_or_else(|| LedgerError::not_found("product", product_id))?;
        self.reject_catalog_owner(&key, product.id)?;

        let mut mappings = self.write()?;
        if mappings
            .iter()
            .any(|m| m.company_id == company_id && m.ean == key)
        {
            return Err(LedgerError::duplicate_ean(key));
        }

        let mapping = EanMapping {
            id: EanMappingId::new(),
            company_id,
            ean: key,
            product_id: product.id,
            product_sku: product.sku,
            product_name: product.name,
            created_at: Utc::now(),
        };
        mappings.push(mapping.clone());
        tracing::info!(
            company_id = %company_id,
            ean = %mapping.ean,
            product_id = %mapping.product_id,
            "EAN mapping created"
        );
        Ok(mapping)
    }

    pub fn update(&self, id: EanMappingId, update: EanMappingUpdate) -> LedgerResult<EanMapping> {
        let new_ean = update.ean.as_deref().map(require_ean).transpose()?;
        let new_product = match update.product_id {
            Some(product_id) => Some(
                self.catalog
                    .product(product_id)
                    .ok_or_else(|| LedgerError::not_found("product", product_id))?,
            ),
            None => None,
        };

        let mut mappings = self.write()?;
        let idx = mappings
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| LedgerError::not_found("ean mapping", id))?;

        if let Some(ean) = &new_ean {
            let company_id = mappings[idx].company_id;
            if mappings
                .iter()
                .any(|m| m.id != id && m.company_id == company_id && &m.ean == ean)
            {
                return Err(LedgerError::duplicate_ean(ean.clone()));
            }
        }
        if new_ean.is_some() || new_product.is_some() {
            let ean = new_ean.as_deref().unwrap_or(mappings[idx].ean.as_str());
            let product_id = new_product
                .as_ref()
                .map_or(mappings[idx].product_id, |p| p.id);
            self.reject_catalog_owner(ean, product_id)?;
        }

        let mapping = &mut mappings[idx];
        if let Some(ean) = new_ean {
            mapping.ean = ean;
        }
        if let Some(product) = new_product {
            mapping.product_id = product.id;
            mapping.product_sku = product.sku;
            mapping.product_name = product.name;
        }
        tracing::info!(mapping_id = %id, ean = %mapping.ean, "EAN mapping updated");
        Ok(mapping.clone())
    }

    pub fn delete(&self, id: EanMappingId) -> LedgerResult<EanMapping> {
        let mut mappings = self.write()?;
        let idx = mappings
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| LedgerError::not_found("ean mapping", id))?;
        let removed = mappings.remove(idx);
        tracing::info!(mapping_id = %id, ean = %removed.ean, "EAN mapping deleted");
        Ok(removed)
    }

    pub fn get(&self, id: EanMappingId) -> LedgerResult<EanMapping> {
        let mappings = self.read()?;
        mappings
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("ean mapping", id))
    }

    /// All mappings of a company, in creation order.
    pub fn list(&self, company_id: CompanyId) -> LedgerResult<Vec<EanMapping>> {
        let mappings = self.read()?;
        Ok(mappings
            .iter()
            .filter(|m| m.company_id == company_id)
            .cloned()
            .collect())
    }

    /// Listing filter: case-insensitive substring over EAN, SKU and product name.
    ///
    /// This is a search over the mapping list, not a barcode lookup; use
    /// [`EanResolver::resolve`] for scans.
    pub fn search(&self, company_id: CompanyId, query: &str) -> LedgerResult<Vec<EanMapping>> {
        let needle = query.trim().to_lowercase();
        let mut found = self.list(company_id)?;
        if needle.is_empty() {
            return Ok(found);
        }
        found.retain(|m| {
            m.ean.to_lowercase().contains(&needle)
                || m.product_sku.to_lowercase().contains(&needle)
                || m.product_name.to_lowercase().contains(&needle)
        });
        Ok(found)
    }

    /// Import many `(ean, sku)` rows. Each row is validated and written on its
    /// own; a failing row is reported and the rest continue.
    pub fn bulk_import(
        &self,
        company_id: CompanyId,
        rows: &[EanImportRow],
        products: &[Product],
    ) -> BulkImportReport {
        let mut report = BulkImportReport::default();

        for (idx, row) in rows.iter().enumerate() {
            let outcome = self.import_row(company_id, row, products);
            match outcome {
                Ok(_) => report.success_count += 1,
                Err(error) => {
                    tracing::debug!(row = idx + 1, ean = %row.ean, error = %error, "EAN import row rejected");
                    report.errors.push(RowError {
                        row: idx + 1,
                        ean: row.ean.clone(),
                        error,
                    });
                }
            }
        }

        tracing::info!(
            company_id = %company_id,
            imported = report.success_count,
            rejected = report.errors.len(),
            "EAN bulk import finished"
        );
        report
    }

    fn import_row(
        &self,
        company_id: CompanyId,
        row: &EanImportRow,
        products: &[Product],
    ) -> LedgerResult<EanMapping> {
        if row.sku.trim().is_empty() {
            return Err(LedgerError::validation("sku cannot be empty"));
        }
        let key = sku_key(&row.sku);
        let product = products
            .iter()
            .find(|p| sku_key(&p.sku) == key)
            .ok_or_else(|| LedgerError::not_found("product", row.sku.trim()))?;
        self.create(company_id, &row.ean, product.id)
    }

    /// A barcode printed on one catalog product cannot be mapped to another.
    fn reject_catalog_owner(&self, ean: &str, product_id: ProductId) -> LedgerResult<()> {
        let owner = self
            .catalog
            .products()
            .into_iter()
            .find(|p| p.id != product_id && p.ean.as_deref() == Some(ean));
        match owner {
            Some(owner) => {
                tracing::debug!(ean, owner = %owner.sku, "EAN already carried by a catalog product");
                Err(LedgerError::duplicate_ean(ean))
            }
            None => Ok(()),
        }
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, Vec<EanMapping>>> {
        self.mappings
            .read()
            .map_err(|_| LedgerError::storage("ean index lock poisoned"))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, Vec<EanMapping>>> {
        self.mappings
            .write()
            .map_err(|_| LedgerError::storage("ean index lock poisoned"))
    }
}

fn require_ean(raw: &str) -> LedgerResult<String> {
    normalize_ean(raw)?.ok_or_else(|| LedgerError::validation("ean cannot be empty"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use stockledger_catalog::{InMemoryCatalog, NewProduct};
    use stockledger_core::ErrorKind;

    fn setup() -> (Arc<InMemoryCatalog>, EanResolver<Arc<InMemoryCatalog>>, Product, Product) {
        let catalog = Arc::new(InMemoryCatalog::new());
        let widget = catalog
            .add_product(NewProduct::new("SKU-1", "Widget").with_cost_price(250))
            .unwrap();
        let gadget = catalog
            .add_product(NewProduct::new("SKU-2", "Gadget").with_ean("5901234123457"))
            .unwrap();
        let resolver = EanResolver::new(catalog.clone());
        (catalog, resolver, widget, gadget)
    }

    #[test]
    fn resolve_is_trimmed_and_case_insensitive() {
        let (_, resolver, widget, _) = setup();
        let company = CompanyId::new();
        resolver.create(company, "abc-0001", widget.id).unwrap();

        let found = resolver.resolve(company, "  ABC-0001 ").unwrap();
        assert_eq!(found.id, widget.id);
    }

    #[test]
    fn resolve_does_not_match_partially() {
        let (_, resolver, widget, _) = setup();
        let company = CompanyId::new();
        resolver.create(company, "4006381333931", widget.id).unwrap();

        let err = resolver.resolve(company, "400638").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn resolve_falls_back_to_product_ean() {
        let (_, resolver, _, gadget) = setup();
        let found = resolver.resolve(CompanyId::new(), "5901234123457").unwrap();
        assert_eq!(found.id, gadget.id);
    }

    #[test]
    fn duplicate_ean_is_rejected_within_company_only() {
        let (_, resolver, widget, gadget) = setup();
        let company = CompanyId::new();
        resolver.create(company, "4006381333931", widget.id).unwrap();

        let err = resolver
            .create(company, " 4006381333931", gadget.id)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateEan);

        // Another company may use the same barcode.
        resolver
            .create(CompanyId::new(), "4006381333931", gadget.id)
            .unwrap();
    }

    #[test]
    fn ean_printed_on_another_catalog_product_cannot_be_mapped() {
        let (_, resolver, widget, gadget) = setup();
        let company = CompanyId::new();

        let err = resolver
            .create(company, " 5901234123457 ", widget.id)
            .unwrap_err();
        assert_eq!(err, LedgerError::duplicate_ean("5901234123457"));
        assert!(resolver.list(company).unwrap().is_empty());
        assert_eq!(resolver.resolve(company, "5901234123457").unwrap().id, gadget.id);

        // Mapping a product's own barcode is allowed.
        resolver.create(company, "5901234123457", gadget.id).unwrap();
    }

    #[test]
    fn update_cannot_take_over_a_catalog_barcode() {
        let (_, resolver, widget, gadget) = setup();
        let company = CompanyId::new();
        let m = resolver.create(company, "111", widget.id).unwrap();

        let err = resolver
            .update(
                m.id,
                EanMappingUpdate {
                    ean: Some("5901234123457".into()),
                    product_id: None,
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateEan);

        // Moving the barcode together with the product that carries it is fine.
        let moved = resolver
            .update(
                m.id,
                EanMappingUpdate {
                    ean: Some("5901234123457".into()),
                    product_id: Some(gadget.id),
                },
            )
            .unwrap();
        assert_eq!(moved.product_id, gadget.id);

        // Pointing it back at another product is not.
        let err = resolver
            .update(
                m.id,
                EanMappingUpdate {
                    ean: None,
                    product_id: Some(widget.id),
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateEan);
        assert_eq!(resolver.get(m.id).unwrap().product_id, gadget.id);
    }

    #[test]
    fn create_requires_known_product_and_non_empty_ean() {
        let (_, resolver, widget, _) = setup();
        let company = CompanyId::new();
        assert_eq!(
            resolver.create(company, "123", ProductId::new()).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            resolver.create(company, "   ", widget.id).unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn update_moves_mapping_and_refreshes_snapshot() {
        let (_, resolver, widget, gadget) = setup();
        let company = CompanyId::new();
        let m = resolver.create(company, "111", widget.id).unwrap();
        resolver.create(company, "222", widget.id).unwrap();

        let err = resolver
            .update(
                m.id,
                EanMappingUpdate {
                    ean: Some("222".into()),
                    product_id: None,
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateEan);

        let updated = resolver
            .update(
                m.id,
                EanMappingUpdate {
                    ean: Some("333".into()),
                    product_id: Some(gadget.id),
                },
            )
            .unwrap();
        assert_eq!(updated.ean, "333");
        assert_eq!(updated.product_sku, "SKU-2");
        assert_eq!(resolver.resolve(company, "333").unwrap().id, gadget.id);
    }

    #[test]
    fn delete_removes_mapping() {
        let (_, resolver, widget, _) = setup();
        let company = CompanyId::new();
        let m = resolver.create(company, "111", widget.id).unwrap();
        resolver.delete(m.id).unwrap();

        assert_eq!(resolver.get(m.id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(resolver.delete(m.id).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn search_matches_ean_sku_and_name() {
        let (_, resolver, widget, gadget) = setup();
        let company = CompanyId::new();
        resolver.create(company, "111", widget.id).unwrap();
        resolver.create(company, "999", gadget.id).unwrap();

        assert_eq!(resolver.search(company, "gadg").unwrap().len(), 1);
        assert_eq!(resolver.search(company, "sku-").unwrap().len(), 2);
        assert_eq!(resolver.search(company, "11").unwrap()[0].ean, "111");
        assert_eq!(resolver.search(company, "").unwrap().len(), 2);
        assert!(resolver.search(CompanyId::new(), "").unwrap().is_empty());
    }

    #[test]
    fn bulk_import_reports_per_row_failures() {
        let (catalog, resolver, _, _) = setup();
        let company = CompanyId::new();
        let rows = vec![
            EanImportRow::new("111", "SKU-1"),
            EanImportRow::new("222", "SKU-404"),
            EanImportRow::new("111", "SKU-2"),
            EanImportRow::new("", "SKU-2"),
            EanImportRow::new("333", "sku-2"),
        ];

        let report = resolver.bulk_import(company, &rows, &catalog.products());

        assert_eq!(report.success_count, 2);
        let failed: Vec<_> = report
            .errors
            .iter()
            .map(|e| (e.row, e.error.kind()))
            .collect();
        assert_eq!(
            failed,
            vec![
                (2, ErrorKind::NotFound),
                (3, ErrorKind::DuplicateEan),
                (4, ErrorKind::Validation),
            ]
        );
        assert_eq!(resolver.list(company).unwrap().len(), 2);
    }
}
