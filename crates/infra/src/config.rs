//! Configuration loading and representation.

use anyhow::{Context, ensure};
use serde::{Deserialize, Serialize};

/// Audit pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Capacity of the queue between recorders and the writer task.
    /// A full queue drops new entries instead of blocking the caller.
    pub queue_capacity: usize,
    /// Upper bound for the limit of a single audit query.
    pub max_query_limit: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            max_query_limit: 1000,
        }
    }
}

/// Process-wide configuration of the authorization core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub audit: AuditConfig,
}

impl CoreConfig {
    /// Load from environment variables, falling back to defaults for unset ones.
    ///
    /// - `CAMPUS_AUDIT_QUEUE_CAPACITY`
    /// - `CAMPUS_AUDIT_MAX_QUERY_LIMIT`
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(capacity) = env_usize("CAMPUS_AUDIT_QUEUE_CAPACITY")? {
            config.audit.queue_capacity = capacity;
        }
        if let Some(limit) = env_usize("CAMPUS_AUDIT_MAX_QUERY_LIMIT")? {
            config.audit.max_query_limit = limit;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.audit.queue_capacity > 0, "audit queue capacity must be positive");
        ensure!(self.audit.max_query_limit > 0, "audit max query limit must be positive");
        Ok(())
    }
}

fn env_usize(key: &str) -> anyhow::Result<Option<usize>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .with_context(|| format!("{key} must be a non-negative integer, got '{raw}'")),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("{key} is not valid unicode")),
    }
}
