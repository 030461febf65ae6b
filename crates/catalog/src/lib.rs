//! Catalog: read-only registry of products and warehouses.
//!
//! Leaf dependency of the ledger. The `Catalog` trait is what the rest of the
//! system consumes; `InMemoryCatalog` adds the administrative writes.

pub mod catalog;
pub mod product;
pub mod warehouse;

pub use catalog::{Catalog, InMemoryCatalog};
pub use product::{NewProduct, Product, normalize_ean, sku_key};
pub use warehouse::Warehouse;
