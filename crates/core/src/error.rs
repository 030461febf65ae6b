//! Ledger error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Stable, machine-distinguishable error classification.
///
/// Callers (UI, importers) branch on this rather than on message text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InsufficientStock,
    DuplicateEan,
    DuplicateSource,
    ProtectedSource,
    SourceInUse,
    NotFound,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::DuplicateEan => "duplicate_ean",
            ErrorKind::DuplicateSource => "duplicate_source",
            ErrorKind::ProtectedSource => "protected_source",
            ErrorKind::SourceInUse => "source_in_use",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger-level error.
///
/// Every failure is returned synchronously from the operation that detects it.
/// `Storage` is the only infrastructure variant; everything else is a
/// deterministic business failure.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerError {
    /// Malformed or missing required fields.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// An outward movement exceeds the stock available at commit time.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// The EAN is already mapped for this company.
    #[error("EAN '{ean}' is already mapped for this company")]
    DuplicateEan { ean: String },

    /// A source with this name already exists for the company and type.
    #[error("source '{name}' already exists")]
    DuplicateSource { name: String },

    /// System-seeded sources cannot be renamed or deleted.
    #[error("source '{name}' is a default source and cannot be modified")]
    ProtectedSource { name: String },

    /// The source is referenced by movement records.
    #[error("source '{name}' is referenced by {references} movement record(s)")]
    SourceInUse { name: String, references: usize },

    /// Unknown product/warehouse/source/batch/mapping reference.
    #[error("{entity} not found: {reference}")]
    NotFound { entity: String, reference: String },

    /// The backing store failed (e.g. poisoned lock).
    #[error("storage failure: {message}")]
    Storage { message: String },
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn insufficient_stock(requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            requested,
            available,
        }
    }

    pub fn duplicate_ean(ean: impl Into<String>) -> Self {
        Self::DuplicateEan { ean: ean.into() }
    }

    pub fn duplicate_source(name: impl Into<String>) -> Self {
        Self::DuplicateSource { name: name.into() }
    }

    pub fn protected_source(name: impl Into<String>) -> Self {
        Self::ProtectedSource { name: name.into() }
    }

    pub fn source_in_use(name: impl Into<String>, references: usize) -> Self {
        Self::SourceInUse {
            name: name.into(),
            references,
        }
    }

    pub fn not_found(entity: impl Into<String>, reference: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            reference: reference.to_string(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage {
            message: msg.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation { .. } => ErrorKind::Validation,
            LedgerError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            LedgerError::DuplicateEan { .. } => ErrorKind::DuplicateEan,
            LedgerError::DuplicateSource { .. } => ErrorKind::DuplicateSource,
            LedgerError::ProtectedSource { .. } => ErrorKind::ProtectedSource,
            LedgerError::SourceInUse { .. } => ErrorKind::SourceInUse,
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::Storage { .. } => ErrorKind::Storage,
        }
    }
}
