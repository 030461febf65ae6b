//! Append-only movement log boundary.
//!
//! Ledger logic depends only on the `MovementLog` trait, so the persistence
//! behind it can be swapped without touching any invariant.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryMovementLog;
pub use r#trait::MovementLog;
