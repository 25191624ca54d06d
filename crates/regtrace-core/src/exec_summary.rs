//! # Execution Summary
//!
//! Counts the instructions of an execution trace by category.
//!
//! Instruction names are compared in lowercase. A name is looked up in
//! `instructions` first; otherwise the first `partial_instructions` key (in
//! key order) contained in it decides. Empty names and `none` are not
//! instructions and are skipped.
//!
//! ```toml
//! [exec_summary]
//! categories = ["math", "flow", "regulation"]
//!
//! [exec_summary.instructions]
//! inc = "math"
//! if = "flow"
//!
//! [exec_summary.partial_instructions]
//! reg = "regulation"
//! ```

use crate::TraceError;
use crate::formats::{Table, parse_str_list};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Column of an execution trace holding each step's instructions.
pub const ACTIVE_INSTRUCTIONS_FIELD: &str = "active_instructions";

/// Names that stand for "no instruction".
const SKIPPED_NAMES: [&str; 2] = ["", "none"];

/// Instruction-to-category map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionCategories {
    /// Categories in output column order.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Lowercase instruction name to category.
    #[serde(default)]
    pub instructions: BTreeMap<String, String>,
    /// Lowercase name fragment to category.
    #[serde(default)]
    pub partial_instructions: BTreeMap<String, String>,
}

impl InstructionCategories {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Categories must be unique and every mapping must name one. Keys must
    /// be lowercase.
    pub fn validate(&self) -> Result<(), TraceError> {
        let mut known = BTreeSet::new();
        for category in &self.categories {
            if !known.insert(category.as_str()) {
                return Err(TraceError::ConfigError(format!(
                    "instruction category '{}' is listed twice",
                    category
                )));
            }
        }
        for (key, category) in self.instructions.iter().chain(&self.partial_instructions) {
            if !known.contains(category.as_str()) {
                return Err(TraceError::ConfigError(format!(
                    "instruction '{}' maps to unlisted category '{}'",
                    key, category
                )));
            }
            if key.is_empty() || *key != key.to_lowercase() {
                return Err(TraceError::ConfigError(format!(
                    "instruction key '{}' must be non-empty lowercase",
                    key
                )));
            }
        }
        Ok(())
    }

    /// Category index of one instruction name, `None` when nothing matches.
    #[must_use]
    pub fn categorize(&self, instruction: &str) -> Option<usize> {
        let name = instruction.to_lowercase();
        let category = self.instructions.get(&name).or_else(|| {
            self.partial_instructions
                .iter()
                .find(|(fragment, _)| name.contains(fragment.as_str()))
                .map(|(_, category)| category)
        })?;
        self.categories.iter().position(|c| c == category)
    }

    /// Summary columns: counts, proportions, then the two totals.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        let counts = self.categories.iter().map(|c| format!("{}_inst_cnt", c));
        let props = self.categories.iter().map(|c| format!("{}_inst_prop", c));
        counts
            .chain(props)
            .chain(["total_instructions_executed".to_string(), "total_execution_time".to_string()])
            .collect()
    }
}

/// Instruction counts of one execution trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecSummary {
    /// One count per category, in category order.
    pub counts: Vec<usize>,
    /// Categorized instructions over all steps.
    pub total_instructions: usize,
    /// Number of steps.
    pub total_steps: usize,
}

impl ExecSummary {
    /// Summarize per-step instruction lists.
    ///
    /// An instruction that matches no category is an error.
    pub fn from_steps<'a, I, S>(categories: &InstructionCategories, steps: I) -> Result<Self, TraceError>
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = &'a str>,
    {
        let mut summary = Self {
            counts: vec![0; categories.categories.len()],
            total_instructions: 0,
            total_steps: 0,
        };
        for (step, instructions) in steps.into_iter().enumerate() {
            summary.total_steps += 1;
            for instruction in instructions {
                let instruction = instruction.trim();
                if SKIPPED_NAMES.iter().any(|s| instruction.eq_ignore_ascii_case(s)) {
                    continue;
                }
                let index = categories.categorize(instruction).ok_or_else(|| {
                    TraceError::UnknownInstruction {
                        step,
                        instruction: instruction.to_string(),
                    }
                })?;
                summary.counts[index] += 1;
                summary.total_instructions += 1;
            }
        }
        Ok(summary)
    }

    /// Summarize an execution trace table.
    pub fn from_table(categories: &InstructionCategories, table: &Table) -> Result<Self, TraceError> {
        let column = table.column(ACTIVE_INSTRUCTIONS_FIELD)?;
        let steps = table
            .rows()
            .iter()
            .enumerate()
            .map(|(step, row)| {
                parse_str_list(row.get(column).unwrap_or_default(), ACTIVE_INSTRUCTIONS_FIELD, step)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_steps(categories, steps)
    }

    /// Share of category `index` among all categorized instructions, 0 when
    /// nothing was executed.
    #[must_use]
    pub fn proportion(&self, index: usize) -> f64 {
        if self.total_instructions == 0 {
            return 0.0;
        }
        self.counts[index] as f64 / self.total_instructions as f64
    }

    /// Values for [`InstructionCategories::fields`].
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        let counts = self.counts.iter().map(ToString::to_string);
        let props = (0..self.counts.len()).map(|i| format!("{:?}", self.proportion(i)));
        counts
            .chain(props)
            .chain([self.total_instructions.to_string(), self.total_steps.to_string()])
            .collect()
    }
}
