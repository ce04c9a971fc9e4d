//! Engine configuration.
//!
//! [`EngineConfig`] can be deserialized from any serde source or read from
//! `RDFSYNC_*` environment variables:
//!
//! - `RDFSYNC_ENDPOINT`: SPARQL query endpoint URL
//! - `RDFSYNC_UPDATE_ENDPOINT`: SPARQL update endpoint (default: the query endpoint)
//! - `RDFSYNC_DB_PATH`: SQLite database path, used when no endpoint is set
//! - `RDFSYNC_MAX_CONNECTIONS`: pool size (default: 8)
//! - `RDFSYNC_ACQUIRE_TIMEOUT_MS`: pool acquire bound (default: 5000)
//! - `RDFSYNC_REQUEST_TIMEOUT_MS`: per-request bound (default: 30000)
//! - `RDFSYNC_APPLY_STRATEGY`: `atomic-combined` or `two-phase` (default)
//! - `RDFSYNC_MAX_DEPTH`: traversal depth bound (default: unbounded)

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rdfsync_storage::PoolConfig;

use crate::error::ConfigError;
use crate::materialize::TraversalPolicy;

/// How a diff is sent to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyStrategy {
    /// One combined delete/insert request; the store's own atomicity applies.
    AtomicCombined,
    /// Retraction, then assertion, with a compensating re-assertion if the
    /// second request fails.
    #[default]
    TwoPhase,
}

impl FromStr for ApplyStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atomic-combined" | "atomic" => Ok(ApplyStrategy::AtomicCombined),
            "two-phase" | "twophase" => Ok(ApplyStrategy::TwoPhase),
            _ => Err(ConfigError::InvalidValue {
                name: "apply_strategy",
                value: s.to_string(),
                reason: "expected 'atomic-combined' or 'two-phase'".to_string(),
            }),
        }
    }
}

impl fmt::Display for ApplyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyStrategy::AtomicCombined => f.write_str("atomic-combined"),
            ApplyStrategy::TwoPhase => f.write_str("two-phase"),
        }
    }
}

/// Store location, pool bounds, apply strategy and traversal bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SPARQL query endpoint.
    pub endpoint: Option<String>,
    /// SPARQL update endpoint, when different from `endpoint`.
    pub update_endpoint: Option<String>,
    /// SQLite database path.
    pub db_path: Option<String>,
    pub max_connections: usize,
    pub acquire_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub apply_strategy: ApplyStrategy,
    /// Traversal depth bound for deep loads; `None` is unbounded.
    pub max_depth: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            endpoint: None,
            update_endpoint: None,
            db_path: None,
            max_connections: 8,
            acquire_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
            apply_strategy: ApplyStrategy::default(),
            max_depth: None,
        }
    }
}

impl EngineConfig {
    /// Reads the configuration from `RDFSYNC_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults
    /// for unset variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = EngineConfig::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        config.endpoint = non_empty("RDFSYNC_ENDPOINT");
        config.update_endpoint = non_empty("RDFSYNC_UPDATE_ENDPOINT");
        config.db_path = non_empty("RDFSYNC_DB_PATH");
        if let Some(v) = non_empty("RDFSYNC_MAX_CONNECTIONS") {
            config.max_connections = parse_number("max_connections", &v)?;
            if config.max_connections == 0 {
                return Err(ConfigError::InvalidValue {
                    name: "max_connections",
                    value: v,
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        if let Some(v) = non_empty("RDFSYNC_ACQUIRE_TIMEOUT_MS") {
            config.acquire_timeout_ms = parse_number("acquire_timeout_ms", &v)?;
        }
        if let Some(v) = non_empty("RDFSYNC_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = parse_number("request_timeout_ms", &v)?;
        }
        if let Some(v) = non_empty("RDFSYNC_APPLY_STRATEGY") {
            config.apply_strategy = v.parse()?;
        }
        if let Some(v) = non_empty("RDFSYNC_MAX_DEPTH") {
            config.max_depth = Some(parse_number("max_depth", &v)?);
        }
        Ok(config)
    }

    /// Pool bounds derived from this configuration.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    /// Traversal policy for deep loads.
    pub fn traversal_policy(&self) -> TraversalPolicy {
        TraversalPolicy {
            max_depth: self.max_depth,
            ..TraversalPolicy::default()
        }
    }
}

fn parse_number<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.apply_strategy, ApplyStrategy::TwoPhase);
        let pool = config.pool_config();
        assert_eq!(pool.max_connections, 8);
        assert_eq!(pool.acquire_timeout, Duration::from_secs(5));
        assert_eq!(pool.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("RDFSYNC_ENDPOINT", "http://localhost:3030/ds/query"),
            ("RDFSYNC_MAX_CONNECTIONS", "2"),
            ("RDFSYNC_ACQUIRE_TIMEOUT_MS", "250"),
            ("RDFSYNC_APPLY_STRATEGY", "atomic-combined"),
            ("RDFSYNC_MAX_DEPTH", "3"),
            ("RDFSYNC_DB_PATH", "  "),
        ]))
        .unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:3030/ds/query"));
        assert_eq!(config.db_path, None);
        assert_eq!(config.apply_strategy, ApplyStrategy::AtomicCombined);
        assert_eq!(config.pool_config().acquire_timeout, Duration::from_millis(250));
        assert_eq!(config.traversal_policy().max_depth, Some(3));
    }

    #[test]
    fn test_invalid_values() {
        let err = EngineConfig::from_lookup(lookup(&[("RDFSYNC_MAX_CONNECTIONS", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "max_connections", .. }));

        let err =
            EngineConfig::from_lookup(lookup(&[("RDFSYNC_MAX_CONNECTIONS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = EngineConfig::from_lookup(lookup(&[("RDFSYNC_APPLY_STRATEGY", "eventually")]))
            .unwrap_err();
        assert!(err.to_string().contains("apply_strategy"));
    }

    #[test]
    fn test_deserialize_partial() {
        let json = r#"{ "db_path": "store.db", "apply_strategy": "atomic-combined" }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.db_path.as_deref(), Some("store.db"));
        assert_eq!(config.apply_strategy, ApplyStrategy::AtomicCombined);
        assert_eq!(config.max_connections, 8);
    }
}
