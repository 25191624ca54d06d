//! # Application Config
//!
//! `regtrace.toml` selects the reducer profile, the knockouts evaluated for
//! the organism summary and how runs are discovered. Every section is
//! optional.
//!
//! ```toml
//! profile = "match-score"            # preset name, or an inline [profile] table
//!
//! [runs]
//! identifier = "RUN_"
//! cycle_count_param = "NUM_ENV_CYCLES"
//! task_param = "TRAINING_SET_FILE"
//!
//! [knockouts]
//! base_score_field = "aggregate_score"
//!
//! [exec_summary]
//! categories = ["math", "flow"]
//! instructions = { inc = "math", if = "flow" }
//! ```

use regtrace_core::primitives::DEFAULT_RUN_DIR_IDENTIFIER;
use regtrace_core::profile::PRESET_REGULATION;
use regtrace_core::{InstructionCategories, KnockoutProfile, ReducerProfile, TraceError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config parameters that vary per machine or per run and are left out of
/// the organism summary.
const DEFAULT_CONFIG_EXCLUDE: [&str; 9] = [
    "STOP_ON_SOLUTION",
    "TESTING_SET_FILE",
    "TRAINING_SET_FILE",
    "OUTPUT_DIR",
    "SUMMARY_RESOLUTION",
    "SNAPSHOT_RESOLUTION",
    "OUTPUT_PROGRAMS",
    "input_signals",
    "input_signal_tags",
];

/// Bulky analysis fields left out of the organism summary.
const DEFAULT_FIELD_EXCLUDE: [&str; 5] = [
    "scores_by_test",
    "test_ids",
    "test_pass_distribution",
    "test_eval_distribution",
    "program",
];

// =============================================================================
// PROFILE SETTING
// =============================================================================

/// A preset name or a full inline profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileSetting {
    Preset(String),
    Inline(Box<ReducerProfile>),
}

impl Default for ProfileSetting {
    fn default() -> Self {
        Self::Preset(PRESET_REGULATION.to_string())
    }
}

impl ProfileSetting {
    pub fn resolve(&self) -> Result<ReducerProfile, TraceError> {
        let profile = match self {
            Self::Preset(name) => load_profile(name)?,
            Self::Inline(profile) => profile.as_ref().clone(),
        };
        profile.validate()?;
        Ok(profile)
    }
}

// =============================================================================
// RUN DISCOVERY SETTINGS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunsConfig {
    /// Substring every run directory name contains.
    #[serde(default = "RunsConfig::default_identifier")]
    pub identifier: String,
    #[serde(default = "RunsConfig::default_config_exclude")]
    pub config_exclude: Vec<String>,
    #[serde(default = "RunsConfig::default_field_exclude")]
    pub field_exclude: Vec<String>,
    /// Run config parameter bounding group ids, if any.
    #[serde(default)]
    pub cycle_count_param: Option<String>,
    /// Run config parameter naming the run in output file names.
    #[serde(default = "RunsConfig::default_seed_param")]
    pub seed_param: String,
    /// Run config parameter whose file stem gives the `task` column.
    #[serde(default)]
    pub task_param: Option<String>,
}

impl RunsConfig {
    fn default_identifier() -> String {
        DEFAULT_RUN_DIR_IDENTIFIER.to_string()
    }
    fn default_config_exclude() -> Vec<String> {
        DEFAULT_CONFIG_EXCLUDE.iter().map(|s| s.to_string()).collect()
    }
    fn default_field_exclude() -> Vec<String> {
        DEFAULT_FIELD_EXCLUDE.iter().map(|s| s.to_string()).collect()
    }
    fn default_seed_param() -> String {
        "SEED".to_string()
    }
}

impl Default for RunsConfig {
    fn default() -> Self {
        Self {
            identifier: Self::default_identifier(),
            config_exclude: Self::default_config_exclude(),
            field_exclude: Self::default_field_exclude(),
            cycle_count_param: None,
            seed_param: Self::default_seed_param(),
            task_param: None,
        }
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub profile: ProfileSetting,
    #[serde(default)]
    pub knockouts: KnockoutProfile,
    #[serde(default)]
    pub runs: RunsConfig,
    /// Instruction categories for `exec-summary`.
    #[serde(default)]
    pub exec_summary: InstructionCategories,
}

impl AppConfig {
    /// Load from `path`, or fall back to defaults when no path is given.
    /// A given path that cannot be read or parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, TraceError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|e| {
            TraceError::ConfigError(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
            .map_err(|e| TraceError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(text: &str) -> Result<Self, TraceError> {
        let config: Self =
            toml::from_str(text).map_err(|e| TraceError::ConfigError(e.to_string()))?;
        config.knockouts.validate()?;
        config.exec_summary.validate()?;
        if config.runs.identifier.is_empty() {
            return Err(TraceError::ConfigError(
                "runs.identifier must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// The profile to reduce with. `override_spec` (from the command line)
    /// wins over the config file.
    pub fn resolve_profile(&self, override_spec: Option<&str>) -> Result<ReducerProfile, TraceError> {
        match override_spec {
            Some(spec) => ProfileSetting::Preset(spec.to_string()).resolve(),
            None => self.profile.resolve(),
        }
    }
}

/// A preset name, or a path to a `.toml` profile file.
pub fn load_profile(spec: &str) -> Result<ReducerProfile, TraceError> {
    let path = Path::new(spec);
    let is_file = path.extension().is_some_and(|ext| ext == "toml") || path.is_file();
    if !is_file {
        return ReducerProfile::preset(spec);
    }
    let text = std::fs::read_to_string(path).map_err(|e| {
        TraceError::ConfigError(format!("cannot read profile {}: {}", path.display(), e))
    })?;
    let profile: ReducerProfile = toml::from_str(&text)
        .map_err(|e| TraceError::ConfigError(format!("{}: {}", path.display(), e)))?;
    profile.validate()?;
    Ok(profile)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use regtrace_core::{EventColumn, SignConvention};

    #[test]
    fn empty_config_uses_defaults() {
        let config = AppConfig::from_toml_str("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.resolve_profile(None).expect("profile").name, "regulation");
        assert!(config.runs.field_exclude.contains(&"program".to_string()));
    }

    #[test]
    fn preset_by_name() {
        let config = AppConfig::from_toml_str(
            "profile = \"match-score\"\n[runs]\ncycle_count_param = \"NUM_ENV_CYCLES\"\n",
        )
        .expect("parse");
        let profile = config.resolve_profile(None).expect("profile");
        assert_eq!(profile.sign, SignConvention::HigherIsPromoted);
        assert_eq!(config.runs.cycle_count_param.as_deref(), Some("NUM_ENV_CYCLES"));
        assert_eq!(config.runs.seed_param, "SEED");
    }

    #[test]
    fn inline_profile_table() {
        let text = r#"
[profile]
name = "custom"
group_field = "trial"
group_label = "trial"
regulation_field = "weights"
values_label = "weights"
deltas_label = "weight_deltas"
sign = "higher-is-promoted"
split_on_regulation_change = false
columns = ["state_id", "group", "active_modules", "promoted", "repressed", "deltas"]
"#;
        let config = AppConfig::from_toml_str(text).expect("parse");
        let profile = config.resolve_profile(None).expect("profile");
        assert_eq!(profile.name, "custom");
        assert_eq!(profile.thread_state_field, "thread_state_info");
        assert_eq!(profile.columns[1], EventColumn::Group);
        assert!(!profile.split_on_regulation_change);
    }

    #[test]
    fn command_line_profile_wins() {
        let config = AppConfig::default();
        let profile = config.resolve_profile(Some("match-score")).expect("profile");
        assert_eq!(profile.name, "match-score");
        assert!(config.resolve_profile(Some("nope")).is_err());
    }

    #[test]
    fn instruction_categories_section() {
        let text = r#"
[exec_summary]
categories = ["math", "regulation"]
instructions = { inc = "math" }
partial_instructions = { reg = "regulation" }
"#;
        let config = AppConfig::from_toml_str(text).expect("parse");
        assert_eq!(config.exec_summary.categorize("SetRegulator"), Some(1));
        assert!(AppConfig::default().exec_summary.is_empty());

        let unlisted = "[exec_summary]\ncategories = [\"math\"]\ninstructions = { nop = \"misc\" }\n";
        assert!(matches!(
            AppConfig::from_toml_str(unlisted),
            Err(TraceError::ConfigError(_))
        ));
    }

    #[test]
    fn bad_knockouts_are_rejected() {
        let text = r#"
[knockouts]
base_score_field = "score"
knockouts = [{ name = "a", score_field = "ko_a" }]
conjunctions = [{ name = "both", of = ["a", "b"] }]
"#;
        assert!(matches!(
            AppConfig::from_toml_str(text),
            Err(TraceError::ConfigError(_))
        ));
    }
}
