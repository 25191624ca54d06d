//! # Core Type Definitions
//!
//! This module contains the shared types for the regtrace reduction engine:
//! - Identifiers (`ModuleId`, `GroupId`)
//! - Module sets and the "no module" sentinel
//! - Error types (`TraceError`)
//!
//! ## Determinism Guarantees
//!
//! - Module sets use `BTreeSet` so serialized output is always sorted
//! - Identifiers implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a program module (the `mp` module pointer in a flow frame).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ModuleId(pub u32);

impl ModuleId {
    /// Index into per-module vectors.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Parse a module id cell, mapping the "none" sentinel (`-1`) to `None`.
    pub fn parse_optional(
        raw: &str,
        field: &str,
        step: usize,
    ) -> Result<Option<Self>, TraceError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        let malformed = || TraceError::MalformedValue {
            field: field.to_string(),
            step,
            value: raw.to_string(),
        };
        let value: i64 = trimmed.parse().map_err(|_| malformed())?;
        if value < 0 {
            return Ok(None);
        }
        u32::try_from(value).map(|v| Some(Self(v))).map_err(|_| malformed())
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an environment cycle or test case.
///
/// Traces are grouped by this value: the environment cycle for
/// changing-environment experiments, the test case for program-synthesis ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sorted set of module ids.
pub type ModuleSet = BTreeSet<ModuleId>;

/// Sentinel written for "no module" in module id columns.
pub const NO_MODULE: i64 = -1;

/// Render an optional module id, using [`NO_MODULE`] for `None`.
#[must_use]
pub fn module_or_sentinel(module: Option<ModuleId>) -> String {
    module.map_or_else(|| NO_MODULE.to_string(), |m| m.to_string())
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while reducing or aggregating traces.
///
/// - No silent failures
/// - Every variant is fatal for the run that produced it; batch callers abort
#[derive(Debug, Error)]
pub enum TraceError {
    /// A required column is absent from a table header.
    #[error("Missing column '{column}' in {table}")]
    MissingColumn { table: String, column: String },

    /// An expected file or directory does not exist.
    #[error("Missing file: {0}")]
    MissingFile(String),

    /// A bracketed list literal could not be parsed.
    #[error("Malformed list literal in '{field}' at step {step}: {reason}")]
    MalformedList {
        field: String,
        step: usize,
        reason: String,
    },

    /// A scalar cell could not be parsed.
    #[error("Malformed value '{value}' in '{field}' at step {step}")]
    MalformedValue {
        field: String,
        step: usize,
        value: String,
    },

    /// A thread-state description could not be decoded.
    #[error("Malformed thread state at step {step}: {reason}")]
    MalformedThreadState { step: usize, reason: String },

    /// A regulation vector does not have one entry per module.
    #[error("Regulation vector at step {step} has {found} entries, expected {expected}")]
    RegulationLengthMismatch {
        step: usize,
        expected: usize,
        found: usize,
    },

    /// A module id is not below the run's module count.
    #[error("Module {module} at step {step} is out of range ({module_count} modules)")]
    ModuleOutOfRange {
        step: usize,
        module: ModuleId,
        module_count: usize,
    },

    /// A group id is not below the configured cycle count.
    #[error("Cycle {group} at step {step} is out of range ({cycle_count} cycles)")]
    CycleOutOfRange {
        step: usize,
        group: GroupId,
        cycle_count: usize,
    },

    /// An executed instruction matches no configured category.
    #[error("Instruction '{instruction}' at step {step} has no category")]
    UnknownInstruction { step: usize, instruction: String },

    /// Tables aggregated together do not share one header.
    #[error("Header mismatch: {0}")]
    HeaderMismatch(String),

    /// An internal consistency check failed.
    #[error("Consistency check failed: {0}")]
    ConsistencyCheck(String),

    /// A profile or config value is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A CSV reader or writer failed.
    #[error("CSV error: {0}")]
    CsvError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<csv::Error> for TraceError {
    fn from(err: csv::Error) -> Self {
        Self::CsvError(err.to_string())
    }
}

impl From<std::io::Error> for TraceError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_optional_maps_sentinel_to_none() {
        assert_eq!(ModuleId::parse_optional("-1", "m", 0).expect("parse"), None);
        assert_eq!(ModuleId::parse_optional(" none ", "m", 0).expect("parse"), None);
        assert_eq!(ModuleId::parse_optional("", "m", 0).expect("parse"), None);
    }

    #[test]
    fn parse_optional_reads_ids() {
        assert_eq!(
            ModuleId::parse_optional("7", "m", 0).expect("parse"),
            Some(ModuleId(7))
        );
        assert!(matches!(
            ModuleId::parse_optional("seven", "m", 3),
            Err(TraceError::MalformedValue { step: 3, .. })
        ));
        assert!(ModuleId::parse_optional("1.5", "m", 0).is_err());
    }

    #[test]
    fn module_set_deterministic_ordering() {
        let mut set = ModuleSet::new();
        set.insert(ModuleId(3));
        set.insert(ModuleId(1));
        set.insert(ModuleId(2));

        let ids: Vec<_> = set.iter().copied().collect();
        assert_eq!(ids, vec![ModuleId(1), ModuleId(2), ModuleId(3)]);
    }

    #[test]
    fn sentinel_rendering() {
        assert_eq!(module_or_sentinel(None), "-1");
        assert_eq!(module_or_sentinel(Some(ModuleId(4))), "4");
    }
}
