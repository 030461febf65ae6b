//! Infrastructure layer: movement log storage, write serialization,
//! configuration, CSV export and the `StockLedger` service facade.

pub mod config;
pub mod export;
pub mod ledger;
pub mod locks;
pub mod movement_log;

pub use config::LedgerConfig;
pub use ledger::StockLedger;
pub use movement_log::{InMemoryMovementLog, MovementLog};
