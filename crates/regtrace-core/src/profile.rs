//! # Reducer Profiles
//!
//! A profile captures everything that differs between experiment variants:
//! which trace columns hold the group id, module count, regulation vector
//! and thread state; which module ids are injected into the active set; the
//! sign convention; whether regulation changes split intervals; and the
//! event table and per-step table layouts.
//!
//! Two presets are built in:
//!
//! | Preset | Group | Vector | Promoted when | Splits on change |
//! |--------|-------|--------|---------------|------------------|
//! | `regulation` | `cur_test_id` | `module_regulator_states` | value decreases | yes |
//! | `match-score` | `env_cycle` | `env_signal_match_scores` | value increases | no |
//!
//! Custom profiles deserialize from TOML with the same field names.

use crate::TraceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Name of the regulation preset.
pub const PRESET_REGULATION: &str = "regulation";

/// Name of the match-score preset.
pub const PRESET_MATCH_SCORE: &str = "match-score";

// =============================================================================
// SIGN CONVENTION
// =============================================================================

/// Direction of a per-module value change between two emitted intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegulationChange {
    Promoted,
    Repressed,
}

/// Which direction of change counts as promotion.
///
/// Regulator values act as a tag-match penalty, so a *lower* value makes a
/// module easier to call. Match scores are the opposite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignConvention {
    #[default]
    LowerIsPromoted,
    HigherIsPromoted,
}

impl SignConvention {
    /// Classify the change from `previous` to `current`. Equal values (and
    /// NaN) are no change.
    #[must_use]
    pub fn classify(self, previous: f64, current: f64) -> Option<RegulationChange> {
        let (promoted, repressed) = match self {
            Self::LowerIsPromoted => (current < previous, current > previous),
            Self::HigherIsPromoted => (current > previous, current < previous),
        };
        if promoted {
            Some(RegulationChange::Promoted)
        } else if repressed {
            Some(RegulationChange::Repressed)
        } else {
            None
        }
    }
}

// =============================================================================
// INJECTION RULES & COLUMNS
// =============================================================================

/// Module ids read from dedicated columns and added to a step's activity.
///
/// A module that just responded has already left its thread, so without
/// injection it would never show up as active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectionRules {
    pub responding: bool,
    pub triggering: bool,
}

/// Columns the event table can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventColumn {
    StateId,
    /// Group id, written under the profile's `group_label`.
    Group,
    TimeStep,
    ModuleTriggered,
    ModuleResponded,
    ActiveModules,
    Promoted,
    Repressed,
    /// Regulation vector at the close, under `values_label`.
    Values,
    /// Delta vector, under `deltas_label`.
    Deltas,
}

impl EventColumn {
    /// Columns holding a `[..]` literal.
    #[must_use]
    pub const fn is_list(self) -> bool {
        matches!(
            self,
            Self::ActiveModules | Self::Promoted | Self::Repressed | Self::Values | Self::Deltas
        )
    }
}

/// A per-module value column of the module trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceValue {
    /// Output column name.
    pub label: String,
    /// Trace column holding a `[..]` vector with one entry per module.
    pub field: String,
}

impl TraceValue {
    fn new(label: &str, field: &str) -> Self {
        Self {
            label: label.to_string(),
            field: field.to_string(),
        }
    }
}

// =============================================================================
// PROFILE
// =============================================================================

fn default_thread_state_field() -> String {
    "thread_state_info".to_string()
}

fn default_module_count_field() -> String {
    "num_modules".to_string()
}

fn default_split() -> bool {
    true
}

/// Everything the reducer needs to know about one experiment variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducerProfile {
    pub name: String,

    /// Trace column holding the group (test case / environment cycle) id.
    pub group_field: String,
    /// Event table column name for the group id.
    pub group_label: String,

    #[serde(default = "default_thread_state_field")]
    pub thread_state_field: String,
    /// Trace column holding the per-module vector that is segmented.
    pub regulation_field: String,
    #[serde(default = "default_module_count_field")]
    pub module_count_field: String,

    #[serde(default)]
    pub responding_field: Option<String>,
    #[serde(default)]
    pub triggering_field: Option<String>,
    #[serde(default)]
    pub inject: InjectionRules,

    #[serde(default)]
    pub sign: SignConvention,
    #[serde(default = "default_split")]
    pub split_on_regulation_change: bool,

    pub values_label: String,
    pub deltas_label: String,
    pub columns: Vec<EventColumn>,

    /// Trace columns copied verbatim into the module and execution traces.
    #[serde(default)]
    pub carry_fields: Vec<String>,
    /// Per-module vectors expanded into the module trace.
    #[serde(default)]
    pub trace_values: Vec<TraceValue>,
}

impl ReducerProfile {
    /// Program-synthesis traces: regulator values, one group per test case.
    #[must_use]
    pub fn regulation() -> Self {
        Self {
            name: PRESET_REGULATION.to_string(),
            group_field: "cur_test_id".to_string(),
            group_label: "testcase_id".to_string(),
            thread_state_field: default_thread_state_field(),
            regulation_field: "module_regulator_states".to_string(),
            module_count_field: default_module_count_field(),
            responding_field: Some("cur_responding_function".to_string()),
            triggering_field: None,
            inject: InjectionRules {
                responding: true,
                triggering: false,
            },
            sign: SignConvention::LowerIsPromoted,
            split_on_regulation_change: true,
            values_label: "reg_state".to_string(),
            deltas_label: "reg_deltas".to_string(),
            columns: vec![
                EventColumn::StateId,
                EventColumn::Group,
                EventColumn::TimeStep,
                EventColumn::ActiveModules,
                EventColumn::Promoted,
                EventColumn::Repressed,
                EventColumn::Deltas,
            ],
            carry_fields: [
                "cur_test_id",
                "cpu_step",
                "has_correct_response",
                "num_modules",
                "num_active_threads",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            trace_values: vec![TraceValue::new(
                "regulator_state",
                "module_regulator_states",
            )],
        }
    }

    /// Changing-environment traces: signal match scores, one group per
    /// environment cycle.
    #[must_use]
    pub fn match_score() -> Self {
        Self {
            name: PRESET_MATCH_SCORE.to_string(),
            group_field: "env_cycle".to_string(),
            group_label: "env_cycle".to_string(),
            thread_state_field: default_thread_state_field(),
            regulation_field: "env_signal_match_scores".to_string(),
            module_count_field: default_module_count_field(),
            responding_field: None,
            triggering_field: Some("env_signal_closest_match".to_string()),
            inject: InjectionRules::default(),
            sign: SignConvention::HigherIsPromoted,
            split_on_regulation_change: false,
            values_label: "match_scores".to_string(),
            deltas_label: "match_deltas".to_string(),
            columns: vec![
                EventColumn::StateId,
                EventColumn::Group,
                EventColumn::TimeStep,
                EventColumn::ModuleTriggered,
                EventColumn::ActiveModules,
                EventColumn::Promoted,
                EventColumn::Repressed,
                EventColumn::Values,
                EventColumn::Deltas,
            ],
            carry_fields: [
                "env_cycle",
                "cpu_step",
                "num_env_states",
                "cur_env_state",
                "cur_response",
                "has_correct_response",
                "num_modules",
                "env_signal_closest_match",
                "num_active_threads",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            trace_values: vec![
                TraceValue::new("match_score", "env_signal_match_scores"),
                TraceValue::new("regulator_state", "module_regulator_states"),
            ],
        }
    }

    /// Look up a built-in preset by name.
    pub fn preset(name: &str) -> Result<Self, TraceError> {
        match name {
            PRESET_REGULATION => Ok(Self::regulation()),
            PRESET_MATCH_SCORE => Ok(Self::match_score()),
            other => Err(TraceError::ConfigError(format!(
                "unknown profile preset '{}' (expected one of: {})",
                other,
                Self::presets().join(", ")
            ))),
        }
    }

    /// Names of the built-in presets.
    #[must_use]
    pub fn presets() -> Vec<&'static str> {
        vec![PRESET_REGULATION, PRESET_MATCH_SCORE]
    }

    /// Reject profiles whose columns reference fields they do not define.
    pub fn validate(&self) -> Result<(), TraceError> {
        let fail = |msg: String| Err(TraceError::ConfigError(format!("{}: {}", self.name, msg)));

        if self.columns.is_empty() {
            return fail("no event columns selected".to_string());
        }
        let mut seen = BTreeSet::new();
        for column in &self.columns {
            if !seen.insert(*column) {
                return fail(format!("column {:?} selected twice", column));
            }
        }
        if self.inject.responding && self.responding_field.is_none() {
            return fail("responding injection needs `responding_field`".to_string());
        }
        if self.inject.triggering && self.triggering_field.is_none() {
            return fail("triggering injection needs `triggering_field`".to_string());
        }
        if self.columns.contains(&EventColumn::ModuleTriggered) && self.triggering_field.is_none()
        {
            return fail("`module_triggered` column needs `triggering_field`".to_string());
        }
        if self.columns.contains(&EventColumn::ModuleResponded) && self.responding_field.is_none()
        {
            return fail("`module_responded` column needs `responding_field`".to_string());
        }

        let header = self.header();
        if header.iter().any(String::is_empty) {
            return fail("empty column label".to_string());
        }
        let distinct: BTreeSet<&String> = header.iter().collect();
        if distinct.len() != header.len() {
            return fail("duplicate column labels".to_string());
        }
        Ok(())
    }

    /// Output name of an event column under this profile.
    #[must_use]
    pub fn column_name(&self, column: EventColumn) -> &str {
        match column {
            EventColumn::StateId => "state_id",
            EventColumn::Group => &self.group_label,
            EventColumn::TimeStep => "time_step",
            EventColumn::ModuleTriggered => "module_triggered",
            EventColumn::ModuleResponded => "module_responded",
            EventColumn::ActiveModules => "active_modules",
            EventColumn::Promoted => "promoted",
            EventColumn::Repressed => "repressed",
            EventColumn::Values => &self.values_label,
            EventColumn::Deltas => &self.deltas_label,
        }
    }

    /// Delta column of the regulation graph's edge table: the singular of
    /// the deltas label (`reg_deltas` gives `reg_delta`).
    #[must_use]
    pub fn edge_delta_label(&self) -> &str {
        self.deltas_label
            .strip_suffix('s')
            .unwrap_or(&self.deltas_label)
    }

    /// Event table header in column order.
    #[must_use]
    pub fn header(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| self.column_name(*c).to_string())
            .collect()
    }
}

impl Default for ReducerProfile {
    fn default() -> Self {
        Self::regulation()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn lower_is_promoted() {
        let sign = SignConvention::LowerIsPromoted;
        assert_eq!(sign.classify(0.0, -1.0), Some(RegulationChange::Promoted));
        assert_eq!(sign.classify(0.0, 1.0), Some(RegulationChange::Repressed));
        assert_eq!(sign.classify(0.5, 0.5), None);
        assert_eq!(sign.classify(f64::NAN, 0.5), None);
    }

    #[test]
    fn higher_is_promoted() {
        let sign = SignConvention::HigherIsPromoted;
        assert_eq!(sign.classify(0.2, 0.9), Some(RegulationChange::Promoted));
        assert_eq!(sign.classify(0.9, 0.2), Some(RegulationChange::Repressed));
    }

    #[test]
    fn presets_are_valid() {
        for name in ReducerProfile::presets() {
            let profile = ReducerProfile::preset(name).expect("preset");
            profile.validate().expect("valid");
            assert_eq!(profile.name, name);
        }
        assert!(matches!(
            ReducerProfile::preset("nope"),
            Err(TraceError::ConfigError(_))
        ));
    }

    #[test]
    fn headers_follow_labels() {
        assert_eq!(
            ReducerProfile::regulation().header(),
            [
                "state_id",
                "testcase_id",
                "time_step",
                "active_modules",
                "promoted",
                "repressed",
                "reg_deltas"
            ]
        );
        assert_eq!(
            ReducerProfile::match_score().header(),
            [
                "state_id",
                "env_cycle",
                "time_step",
                "module_triggered",
                "active_modules",
                "promoted",
                "repressed",
                "match_scores",
                "match_deltas"
            ]
        );
    }

    #[test]
    fn edge_delta_label_is_singular() {
        assert_eq!(ReducerProfile::regulation().edge_delta_label(), "reg_delta");
        assert_eq!(ReducerProfile::match_score().edge_delta_label(), "match_delta");
        let custom = ReducerProfile {
            deltas_label: "shift".to_string(),
            ..ReducerProfile::regulation()
        };
        assert_eq!(custom.edge_delta_label(), "shift");
    }

    #[test]
    fn validation_catches_missing_fields() {
        let mut profile = ReducerProfile::regulation();
        profile.columns.push(EventColumn::ModuleTriggered);
        assert!(profile.validate().is_err());

        let mut profile = ReducerProfile::regulation();
        profile.responding_field = None;
        assert!(profile.validate().is_err());

        let mut profile = ReducerProfile::regulation();
        profile.columns.push(EventColumn::StateId);
        assert!(profile.validate().is_err());

        let mut profile = ReducerProfile::regulation();
        profile.deltas_label = "promoted".to_string();
        assert!(profile.validate().is_err());
    }

    #[test]
    fn sign_convention_serde_names() {
        let json = serde_json::to_string(&SignConvention::HigherIsPromoted).expect("ser");
        assert_eq!(json, "\"higher-is-promoted\"");
        let column: EventColumn = serde_json::from_str("\"module_responded\"").expect("de");
        assert_eq!(column, EventColumn::ModuleResponded);
    }
}
