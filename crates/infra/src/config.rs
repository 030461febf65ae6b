//! Ledger configuration, read from the environment.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `STOCKLEDGER_BATCH_POLICY` | `aggregate` or `track-remaining` | `aggregate` |
//! | `STOCKLEDGER_DEFAULT_INWARD_SOURCES` | comma-separated default inward sources | `Factory,Supplier` |
//! | `STOCKLEDGER_DEFAULT_OUTWARD_SOURCES` | comma-separated default outward sources | `Amazon FBA,Retail Store` |
//! | `STOCKLEDGER_LOG_FILTER` | tracing filter when `RUST_LOG` is unset | `info` |

use stockledger_movements::BatchPolicy;
use stockledger_sources::SourceType;

pub const BATCH_POLICY_VAR: &str = "STOCKLEDGER_BATCH_POLICY";
pub const DEFAULT_INWARD_SOURCES_VAR: &str = "STOCKLEDGER_DEFAULT_INWARD_SOURCES";
pub const DEFAULT_OUTWARD_SOURCES_VAR: &str = "STOCKLEDGER_DEFAULT_OUTWARD_SOURCES";
pub const LOG_FILTER_VAR: &str = "STOCKLEDGER_LOG_FILTER";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub batch_policy: BatchPolicy,
    pub default_inward_sources: Vec<String>,
    pub default_outward_sources: Vec<String>,
    pub log_filter: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            batch_policy: BatchPolicy::AggregateOnly,
            default_inward_sources: vec!["Factory".to_string(), "Supplier".to_string()],
            default_outward_sources: vec!["Amazon FBA".to_string(), "Retail Store".to_string()],
            log_filter: "info".to_string(),
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Invalid values fall back to the
    /// default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(BATCH_POLICY_VAR) {
            match raw.parse::<BatchPolicy>() {
                Ok(policy) => config.batch_policy = policy,
                Err(e) => {
                    tracing::warn!(var = BATCH_POLICY_VAR, value = %raw, error = %e, "ignoring invalid batch policy");
                }
            }
        }

        if let Some(raw) = lookup(DEFAULT_INWARD_SOURCES_VAR) {
            config.default_inward_sources = split_names(&raw);
        }
        if let Some(raw) = lookup(DEFAULT_OUTWARD_SOURCES_VAR) {
            config.default_outward_sources = split_names(&raw);
        }

        if let Some(raw) = lookup(LOG_FILTER_VAR) {
            if raw.trim().is_empty() {
                tracing::warn!(var = LOG_FILTER_VAR, "ignoring empty log filter");
            } else {
                config.log_filter = raw.trim().to_string();
            }
        }

        config
    }

    /// Default sources to seed for a new company.
    pub fn default_sources(&self) -> Vec<(String, SourceType)> {
        self.default_inward_sources
            .iter()
            .map(|n| (n.clone(), SourceType::Inward))
            .chain(
                self.default_outward_sources
                    .iter()
                    .map(|n| (n.clone(), SourceType::Outward)),
            )
            .collect()
    }
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        assert_eq!(LedgerConfig::from_lookup(lookup(&[])), LedgerConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = LedgerConfig::from_lookup(lookup(&[
            (BATCH_POLICY_VAR, "track-remaining"),
            (DEFAULT_INWARD_SOURCES_VAR, " Factory , ,Returns"),
            (DEFAULT_OUTWARD_SOURCES_VAR, "Shopify"),
            (LOG_FILTER_VAR, "stockledger=debug"),
        ]));

        assert_eq!(config.batch_policy, BatchPolicy::TrackRemaining);
        assert_eq!(config.default_inward_sources, vec!["Factory", "Returns"]);
        assert_eq!(config.default_outward_sources, vec!["Shopify"]);
        assert_eq!(config.log_filter, "stockledger=debug");
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = LedgerConfig::from_lookup(lookup(&[
            (BATCH_POLICY_VAR, "lifo"),
            (LOG_FILTER_VAR, "  "),
        ]));
        assert_eq!(config.batch_policy, BatchPolicy::AggregateOnly);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn default_sources_are_typed() {
        let sources = LedgerConfig::default().default_sources();
        assert_eq!(sources.len(), 4);
        assert_eq!(sources[0], ("Factory".to_string(), SourceType::Inward));
        assert_eq!(sources[3], ("Retail Store".to_string(), SourceType::Outward));
    }
}
