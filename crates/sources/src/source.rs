use serde::{Deserialize, Serialize};

use stockledger_core::{CompanyId, SourceId};

/// Direction(s) a channel can be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Inward,
    Outward,
    Both,
}

impl SourceType {
    /// Whether a source of this type can be used for a movement in `direction`.
    pub fn accepts(self, direction: SourceType) -> bool {
        self == SourceType::Both || self == direction
    }

    /// Two types overlap when some direction is served by both (name uniqueness scope).
    pub fn overlaps(self, other: SourceType) -> bool {
        self == other || self == SourceType::Both || other == SourceType::Both
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Inward => "inward",
            SourceType::Outward => "outward",
            SourceType::Both => "both",
        }
    }
}

impl core::fmt::Display for SourceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named inward origin or outward destination (e.g. "Factory", "Amazon FBA").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub company_id: CompanyId,
    pub name: String,
    pub source_type: SourceType,
    pub is_active: bool,
    /// System-seeded: cannot be renamed or deleted.
    pub is_default: bool,
}

/// Case-insensitive, trimmed comparison key for source names.
pub(crate) fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_accepts_every_direction() {
        assert!(SourceType::Both.accepts(SourceType::Inward));
        assert!(SourceType::Both.accepts(SourceType::Outward));
        assert!(SourceType::Inward.accepts(SourceType::Inward));
        assert!(!SourceType::Inward.accepts(SourceType::Outward));
    }

    #[test]
    fn inward_and_outward_do_not_overlap() {
        assert!(!SourceType::Inward.overlaps(SourceType::Outward));
        assert!(SourceType::Inward.overlaps(SourceType::Both));
        assert!(SourceType::Outward.overlaps(SourceType::Outward));
    }
}
