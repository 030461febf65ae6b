//! `stockledger-core`: shared building blocks for the stock ledger.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers and the ledger error taxonomy.

pub mod error;
pub mod id;

pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use id::{CompanyId, EanMappingId, ProductId, RecordId, SourceId, WarehouseId};
