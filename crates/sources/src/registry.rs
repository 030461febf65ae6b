use std::sync::{Arc, RwLock};

use stockledger_core::{CompanyId, LedgerError, LedgerResult, SourceId};

use crate::source::{Source, SourceType, name_key};

/// Answers whether movement records reference a source.
///
/// Implemented by the movement log; the registry never looks at records itself.
pub trait SourceUsage {
    /// Number of movement records referencing `source_id`.
    fn references(&self, source_id: SourceId) -> LedgerResult<usize>;
}

impl<S> SourceUsage for Arc<S>
where
    S: SourceUsage + ?Sized,
{
    fn references(&self, source_id: SourceId) -> LedgerResult<usize> {
        (**self).references(source_id)
    }
}

/// Registry of named inward/outward channels, scoped per company.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: RwLock<Vec<Source>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a non-default source.
    pub fn create(
        &self,
        company_id: CompanyId,
        name: &str,
        source_type: SourceType,
    ) -> LedgerResult<Source> {
        self.insert(company_id, name, source_type, false)
    }

    /// Seed system defaults for a company. Idempotent: names that already exist
    /// for an overlapping type are skipped.
    pub fn seed_defaults(
        &self,
        company_id: CompanyId,
        defaults: &[(String, SourceType)],
    ) -> LedgerResult<Vec<Source>> {
        let mut seeded = Vec::new();
        for (name, source_type) in defaults {
            match self.insert(company_id, name, *source_type, true) {
                Ok(source) => seeded.push(source),
                Err(LedgerError::DuplicateSource { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        if !seeded.is_empty() {
            tracing::info!(company_id = %company_id, count = seeded.len(), "default sources seeded");
        }
        Ok(seeded)
    }

    pub fn get(&self, source_id: SourceId) -> LedgerResult<Source> {
        let sources = self.read()?;
        sources
            .iter()
            .find(|s| s.id == source_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("source", source_id))
    }

    /// Sources of a company usable for `source_type`.
    ///
    /// `Both` sources appear in the inward and the outward listing; asking for
    /// `Both` lists every source of the company.
    pub fn list(&self, company_id: CompanyId, source_type: SourceType) -> LedgerResult<Vec<Source>> {
        let sources = self.read()?;
        Ok(sources
            .iter()
            .filter(|s| s.company_id == company_id)
            .filter(|s| source_type == SourceType::Both || s.source_type.accepts(source_type))
            .cloned()
            .collect())
    }

    /// Like [`SourceRegistry::list`], restricted to active sources.
    pub fn list_active(
        &self,
        company_id: CompanyId,
        source_type: SourceType,
    ) -> LedgerResult<Vec<Source>> {
        let mut sources = self.list(company_id, source_type)?;
        sources.retain(|s| s.is_active);
        Ok(sources)
    }

    /// Resolve a source for use in a movement of `direction` by `company_id`.
    ///
    /// Sources of another company are reported as not found.
    pub fn resolve_for(
        &self,
        company_id: CompanyId,
        source_id: SourceId,
        direction: SourceType,
    ) -> LedgerResult<Source> {
        let source = self.get(source_id)?;
        if source.company_id != company_id {
            return Err(LedgerError::not_found("source", source_id));
        }
        if !source.is_active {
            return Err(LedgerError::validation(format!(
                "source '{}' is inactive",
                source.name
            )));
        }
        if !source.source_type.accepts(direction) {
            return Err(LedgerError::validation(format!(
                "source '{}' is {} only and cannot be used for {direction} movements",
                source.name, source.source_type
            )));
        }
        Ok(source)
    }

    pub fn rename(&self, source_id: SourceId, new_name: &str) -> LedgerResult<Source> {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::validation("source name cannot be empty"));
        }

        let mut sources = self.write()?;
        let idx = sources
            .iter()
            .position(|s| s.id == source_id)
            .ok_or_else(|| LedgerError::not_found("source", source_id))?;

        let current = &sources[idx];
        if current.is_default {
            return Err(LedgerError::protected_source(current.name.clone()));
        }
        if Self::collides(&sources, current.company_id, trimmed, current.source_type, Some(source_id)) {
            return Err(LedgerError::duplicate_source(trimmed));
        }

        let source = &mut sources[idx];
        tracing::info!(source_id = %source_id, from = %source.name, to = %trimmed, "source renamed");
        source.name = trimmed.to_string();
        Ok(source.clone())
    }

    pub fn set_active(&self, source_id: SourceId, active: bool) -> LedgerResult<Source> {
        let mut sources = self.write()?;
        let source = sources
            .iter_mut()
            .find(|s| s.id == source_id)
            .ok_or_else(|| LedgerError::not_found("source", source_id))?;
        source.is_active = active;
        Ok(source.clone())
    }

    /// Delete a source that is neither default nor referenced by any record.
    pub fn delete(&self, source_id: SourceId, usage: &dyn SourceUsage) -> LedgerResult<Source> {
        let mut sources = self.write()?;
        let idx = sources
            .iter()
            .position(|s| s.id == source_id)
            .ok_or_else(|| LedgerError::not_found("source", source_id))?;

        if sources[idx].is_default {
            return Err(LedgerError::protected_source(sources[idx].name.clone()));
        }

        let references = usage.references(source_id)?;
        if references > 0 {
            return Err(LedgerError::source_in_use(sources[idx].name.clone(), references));
        }

        let removed = sources.remove(idx);
        tracing::info!(source_id = %source_id, name = %removed.name, "source deleted");
        Ok(removed)
    }

    fn insert(
        &self,
        company_id: CompanyId,
        name: &str,
        source_type: SourceType,
        is_default: bool,
    ) -> LedgerResult<Source> {
        if company_id.is_nil() {
            return Err(LedgerError::validation("company_id is required"));
        }
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::validation("source name cannot be empty"));
        }

        let mut sources = self.write()?;
        if Self::collides(&sources, company_id, trimmed, source_type, None) {
            return Err(LedgerError::duplicate_source(trimmed));
        }

        let source = Source {
            id: SourceId::new(),
            company_id,
            name: trimmed.to_string(),
            source_type,
            is_active: true,
            is_default,
        };
        sources.push(source.clone());
        tracing::debug!(source_id = %source.id, name = %source.name, source_type = %source_type, "source created");
        Ok(source)
    }

    fn collides(
        sources: &[Source],
        company_id: CompanyId,
        name: &str,
        source_type: SourceType,
        exclude: Option<SourceId>,
    ) -> bool {
        let key = name_key(name);
        sources.iter().any(|s| {
            Some(s.id) != exclude
                && s.company_id == company_id
                && s.source_type.overlaps(source_type)
                && name_key(&s.name) == key
        })
    }

    fn read(&self) -> LedgerResult<std::sync::RwLockReadGuard<'_, Vec<Source>>> {
        self.sources
            .read()
            .map_err(|_| LedgerError::storage("source registry lock poisoned"))
    }

    fn write(&self) -> LedgerResult<std::sync::RwLockWriteGuard<'_, Vec<Source>>> {
        self.sources
            .write()
            .map_err(|_| LedgerError::storage("source registry lock poisoned"))
    }
}
