//! Source registry: named inward/outward channels per company.

pub mod registry;
pub mod source;

pub use registry::{SourceRegistry, SourceUsage};
pub use source::{Source, SourceType};
