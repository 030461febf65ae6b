//! EAN (barcode) → product resolution and the per-company mapping index.

pub mod mapping;
pub mod resolver;

pub use mapping::{BulkImportReport, EanImportRow, EanMapping, EanMappingUpdate, RowError};
pub use resolver::EanResolver;
