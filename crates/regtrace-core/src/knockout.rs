//! # Knockout Analysis
//!
//! Organisms are re-evaluated with one mechanism disabled at a time. A run
//! *relies on* a mechanism when knocking it out lowers the score.
//!
//! For each knockout `x` with score `ko` against the base score `base`:
//! - `relies_on_x = ko < base` (written as 0/1)
//! - `ko_x_delta = base - ko`
//!
//! Conjunctions (e.g. `relies_on_both`) are true when every member is.

use crate::TraceError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One knockout re-evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnockoutSpec {
    pub name: String,
    /// Analysis column holding the knocked-out score.
    pub score_field: String,
}

/// A flag that holds when every listed knockout is relied on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conjunction {
    pub name: String,
    pub of: Vec<String>,
}

/// Knockouts evaluated for every organism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnockoutProfile {
    pub base_score_field: String,
    #[serde(default)]
    pub knockouts: Vec<KnockoutSpec>,
    #[serde(default)]
    pub conjunctions: Vec<Conjunction>,
}

impl Default for KnockoutProfile {
    fn default() -> Self {
        let knockouts = ["regulation", "global_memory", "up_reg", "down_reg", "all"]
            .iter()
            .map(|name| KnockoutSpec {
                name: (*name).to_string(),
                score_field: format!("ko_{}_aggregate_score", name),
            })
            .collect();
        Self {
            base_score_field: "aggregate_score".to_string(),
            knockouts,
            conjunctions: vec![Conjunction {
                name: "both".to_string(),
                of: vec!["regulation".to_string(), "global_memory".to_string()],
            }],
        }
    }
}

impl KnockoutProfile {
    /// Conjunction members must name knockouts; names must be unique.
    pub fn validate(&self) -> Result<(), TraceError> {
        let mut names = BTreeSet::new();
        for name in self
            .knockouts
            .iter()
            .map(|k| &k.name)
            .chain(self.conjunctions.iter().map(|c| &c.name))
        {
            if !names.insert(name.as_str()) {
                return Err(TraceError::ConfigError(format!(
                    "knockout name '{}' is used twice",
                    name
                )));
            }
        }
        for conjunction in &self.conjunctions {
            if let Some(unknown) = conjunction
                .of
                .iter()
                .find(|member| !self.knockouts.iter().any(|k| &k.name == *member))
            {
                return Err(TraceError::ConfigError(format!(
                    "conjunction '{}' names unknown knockout '{}'",
                    conjunction.name, unknown
                )));
            }
        }
        Ok(())
    }

    /// Derived column names: reliance flags, conjunctions, then deltas.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        let relies = self.knockouts.iter().map(|k| format!("relies_on_{}", k.name));
        let conjunctions = self.conjunctions.iter().map(|c| format!("relies_on_{}", c.name));
        let deltas = self.knockouts.iter().map(|k| format!("ko_{}_delta", k.name));
        relies.chain(conjunctions).chain(deltas).collect()
    }

    /// Values for [`Self::fields`] from one analysis row.
    pub fn evaluate(
        &self,
        row: &BTreeMap<String, String>,
        step: usize,
    ) -> Result<Vec<String>, TraceError> {
        let score = |field: &str| -> Result<f64, TraceError> {
            let raw = row.get(field).ok_or_else(|| TraceError::MissingColumn {
                table: "organism analysis".to_string(),
                column: field.to_string(),
            })?;
            raw.trim().parse().map_err(|_| TraceError::MalformedValue {
                field: field.to_string(),
                step,
                value: raw.clone(),
            })
        };

        let base = score(&self.base_score_field)?;
        let mut relied = BTreeMap::new();
        let mut deltas = Vec::with_capacity(self.knockouts.len());
        for knockout in &self.knockouts {
            let ko = score(&knockout.score_field)?;
            relied.insert(knockout.name.as_str(), ko < base);
            deltas.push(base - ko);
        }

        let flag = |b: bool| (if b { "1" } else { "0" }).to_string();
        let mut values: Vec<String> = self
            .knockouts
            .iter()
            .map(|k| flag(relied.get(k.name.as_str()).copied().unwrap_or(false)))
            .collect();
        for conjunction in &self.conjunctions {
            let all = conjunction
                .of
                .iter()
                .all(|member| relied.get(member.as_str()).copied().unwrap_or(false));
            values.push(flag(all));
        }
        values.extend(deltas.iter().map(|d| format!("{:?}", d)));
        Ok(values)
    }
}
