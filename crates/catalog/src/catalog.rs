use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use stockledger_core::{LedgerError, LedgerResult, ProductId, WarehouseId};

use crate::product::{NewProduct, Product, normalize_ean, sku_key};
use crate::warehouse::Warehouse;

/// Read-only catalog access.
///
/// Everything downstream (movement log, EAN resolver, ledger facade) depends on
/// this trait only, never on a concrete registry.
pub trait Catalog: Send + Sync {
    fn product(&self, id: ProductId) -> Option<Product>;
    fn warehouse(&self, id: WarehouseId) -> Option<Warehouse>;
    /// All products, in registration order.
    fn products(&self) -> Vec<Product>;
    /// All warehouses (deleted ones included), in registration order.
    fn warehouses(&self) -> Vec<Warehouse>;
}

impl<S> Catalog for Arc<S>
where
    S: Catalog + ?Sized,
{
    fn product(&self, id: ProductId) -> Option<Product> {
        (**self).product(id)
    }

    fn warehouse(&self, id: WarehouseId) -> Option<Warehouse> {
        (**self).warehouse(id)
    }

    fn products(&self) -> Vec<Product> {
        (**self).products()
    }

    fn warehouses(&self) -> Vec<Warehouse> {
        (**self).warehouses()
    }
}

/// In-memory catalog for tests/dev, with the administrative operations that
/// populate it.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<Vec<Product>>,
    warehouses: RwLock<Vec<Warehouse>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a product. SKU is unique (case-insensitive); EAN is unique when present.
    pub fn add_product(&self, input: NewProduct) -> LedgerResult<Product> {
        input.validate()?;
        let ean = match input.ean.as_deref() {
            Some(raw) => normalize_ean(raw)?,
            None => None,
        };

        let mut products = self
            .products
            .write()
            .map_err(|_| LedgerError::storage("catalog lock poisoned"))?;

        let key = sku_key(&input.sku);
        if products.iter().any(|p| sku_key(&p.sku) == key) {
            return Err(LedgerError::validation(format!(
                "sku '{}' already exists",
                input.sku.trim()
            )));
        }
        if let Some(ean) = &ean {
            if products.iter().any(|p| p.ean.as_ref() == Some(ean)) {
                return Err(LedgerError::duplicate_ean(ean.clone()));
            }
        }

        let product = Product {
            id: ProductId::new(),
            sku: input.sku.trim().to_string(),
            ean,
            name: input.name.trim().to_string(),
            cost_price: input.cost_price,
        };
        products.push(product.clone());
        tracing::debug!(product_id = %product.id, sku = %product.sku, "product registered");
        Ok(product)
    }

    /// Register a warehouse. Codes are unique (case-insensitive) among all warehouses.
    pub fn add_warehouse(
        &self,
        name: impl Into<String>,
        code: impl Into<String>,
    ) -> LedgerResult<Warehouse> {
        let name = name.into();
        let code = code.into();
        if name.trim().is_empty() {
            return Err(LedgerError::validation("warehouse name cannot be empty"));
        }
        if code.trim().is_empty() {
            return Err(LedgerError::validation("warehouse code cannot be empty"));
        }

        let mut warehouses = self
            .warehouses
            .write()
            .map_err(|_| LedgerError::storage("catalog lock poisoned"))?;

        if warehouses
            .iter()
            .any(|w| w.code.eq_ignore_ascii_case(code.trim()))
        {
            return Err(LedgerError::validation(format!(
                "warehouse code '{}' already exists",
                code.trim()
            )));
        }

        let warehouse = Warehouse {
            id: WarehouseId::new(),
            name: name.trim().to_string(),
            code: code.trim().to_string(),
            is_deleted: false,
        };
        warehouses.push(warehouse.clone());
        tracing::debug!(warehouse_id = %warehouse.id, code = %warehouse.code, "warehouse registered");
        Ok(warehouse)
    }

    /// Soft-delete a warehouse. Idempotent.
    pub fn delete_warehouse(&self, id: WarehouseId) -> LedgerResult<Warehouse> {
        let mut warehouses = self
            .warehouses
            .write()
            .map_err(|_| LedgerError::storage("catalog lock poisoned"))?;

        let warehouse = warehouses
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| LedgerError::not_found("warehouse", id))?;
        warehouse.is_deleted = true;
        tracing::info!(warehouse_id = %id, "warehouse soft-deleted");
        Ok(warehouse.clone())
    }

    /// Look up a product by SKU (case-insensitive).
    pub fn product_by_sku(&self, sku: &str) -> Option<Product> {
        let key = sku_key(sku);
        self.products()
            .into_iter()
            .find(|p| sku_key(&p.sku) == key)
    }
}

impl Catalog for InMemoryCatalog {
    fn product(&self, id: ProductId) -> Option<Product> {
        let products = read_recovering(&self.products, "products");
        products.iter().find(|p| p.id == id).cloned()
    }

    fn warehouse(&self, id: WarehouseId) -> Option<Warehouse> {
        let warehouses = read_recovering(&self.warehouses, "warehouses");
        warehouses.iter().find(|w| w.id == id).cloned()
    }

    fn products(&self) -> Vec<Product> {
        read_recovering(&self.products, "products").clone()
    }

    fn warehouses(&self) -> Vec<Warehouse> {
        read_recovering(&self.warehouses, "warehouses").clone()
    }
}

// Writers validate before they push or flip a flag, so a table poisoned by a
// panicking writer is still consistent. Reads keep serving it; writes fail.
fn read_recovering<'a, T>(lock: &'a RwLock<T>, table: &str) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned: PoisonError<_>| {
        tracing::warn!(table, "catalog lock poisoned, serving last committed state");
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_core::ErrorKind;

    #[test]
    fn add_product_normalizes_and_stores() {
        let catalog = InMemoryCatalog::new();
        let p = catalog
            .add_product(NewProduct::new(" SKU-1 ", "Widget").with_ean(" 4006381333931 "))
            .unwrap();

        assert_eq!(p.sku, "SKU-1");
        assert_eq!(p.ean.as_deref(), Some("4006381333931"));
        assert_eq!(catalog.product(p.id), Some(p.clone()));
        assert_eq!(catalog.products(), vec![p]);
    }

    #[test]
    fn sku_is_unique_case_insensitively() {
        let catalog = InMemoryCatalog::new();
        catalog.add_product(NewProduct::new("SKU-1", "Widget")).unwrap();
        let err = catalog
            .add_product(NewProduct::new("sku-1", "Other"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn product_ean_is_unique_when_present() {
        let catalog = InMemoryCatalog::new();
        catalog
            .add_product(NewProduct::new("SKU-1", "A").with_ean("ABC"))
            .unwrap();
        // Products without EAN never collide.
        catalog.add_product(NewProduct::new("SKU-2", "B")).unwrap();
        catalog.add_product(NewProduct::new("SKU-3", "C")).unwrap();

        let err = catalog
            .add_product(NewProduct::new("SKU-4", "D").with_ean("abc"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateEan);
    }

    #[test]
    fn product_by_sku_ignores_case() {
        let catalog = InMemoryCatalog::new();
        let p = catalog.add_product(NewProduct::new("SKU-9", "Widget")).unwrap();
        assert_eq!(catalog.product_by_sku("sku-9").map(|x| x.id), Some(p.id));
        assert!(catalog.product_by_sku("SKU-10").is_none());
    }

    #[test]
    fn delete_warehouse_is_soft() {
        let catalog = InMemoryCatalog::new();
        let w = catalog.add_warehouse("Main", "MAIN").unwrap();
        catalog.delete_warehouse(w.id).unwrap();

        let stored = catalog.warehouse(w.id).unwrap();
        assert!(stored.is_deleted);
        assert!(!stored.is_active());
        assert_eq!(catalog.warehouses().len(), 1);
    }

    #[test]
    fn delete_unknown_warehouse_is_not_found() {
        let catalog = InMemoryCatalog::new();
        let err = catalog.delete_warehouse(WarehouseId::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn warehouse_code_is_unique() {
        let catalog = InMemoryCatalog::new();
        catalog.add_warehouse("Main", "MAIN").unwrap();
        assert!(catalog.add_warehouse("Other", "main").is_err());
    }

    #[test]
    fn reads_survive_a_poisoned_lock() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let p = catalog.add_product(NewProduct::new("SKU-1", "Widget")).unwrap();
        let w = catalog.add_warehouse("Main", "MAIN").unwrap();

        let writer = catalog.clone();
        let outcome = std::thread::spawn(move || {
            let _products = writer.products.write().unwrap();
            let _warehouses = writer.warehouses.write().unwrap();
            panic!("writer died mid-update");
        })
        .join();
        assert!(outcome.is_err());
        assert!(catalog.products.is_poisoned());

        assert_eq!(catalog.product(p.id), Some(p.clone()));
        assert_eq!(catalog.products(), vec![p]);
        assert_eq!(catalog.warehouse(w.id).map(|x| x.code), Some("MAIN".to_string()));
        assert_eq!(catalog.warehouses().len(), 1);

        let err = catalog
            .add_product(NewProduct::new("SKU-2", "Gadget"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
