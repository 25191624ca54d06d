//! Run configuration table (`parameter,value` rows).

use crate::TraceError;
use crate::formats::Table;
use crate::primitives::{CONFIG_PARAMETER_COLUMN, CONFIG_VALUE_COLUMN};
use std::collections::BTreeMap;
use std::io::Read;

/// Parameters of one run, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    entries: BTreeMap<String, String>,
}

impl RunConfig {
    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self, TraceError> {
        let table = Table::from_reader(name, reader)?;
        let parameter = table.column(CONFIG_PARAMETER_COLUMN)?;
        let value = table.column(CONFIG_VALUE_COLUMN)?;
        let entries = table
            .rows()
            .iter()
            .map(|row| {
                (
                    row.get(parameter).unwrap_or_default().to_string(),
                    row.get(value).unwrap_or_default().to_string(),
                )
            })
            .collect();
        Ok(Self { entries })
    }

    #[must_use]
    pub fn get(&self, parameter: &str) -> Option<&str> {
        self.entries.get(parameter).map(String::as_str)
    }

    /// A parameter that must be present.
    pub fn require(&self, parameter: &str) -> Result<&str, TraceError> {
        self.get(parameter).ok_or_else(|| {
            TraceError::ConfigError(format!("run config has no parameter '{}'", parameter))
        })
    }

    /// A required parameter parsed as a count.
    pub fn require_usize(&self, parameter: &str) -> Result<usize, TraceError> {
        let raw = self.require(parameter)?;
        raw.parse().map_err(|_| {
            TraceError::ConfigError(format!(
                "run config parameter '{}' is not a count: '{}'",
                parameter, raw
            ))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = "parameter,value,source\nSEED,23001,cli\nNUM_ENV_CYCLES,8,cfg\n\
                          TRAINING_SET_FILE,\"training_set_nand.csv\",cfg\n";

    #[test]
    fn reads_parameters() {
        let config = RunConfig::from_reader("run_config", CONFIG.as_bytes()).expect("read");
        assert_eq!(config.len(), 3);
        assert_eq!(config.get("SEED"), Some("23001"));
        assert_eq!(config.require_usize("NUM_ENV_CYCLES").expect("count"), 8);
        let names: Vec<&str> = config.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["NUM_ENV_CYCLES", "SEED", "TRAINING_SET_FILE"]);
    }

    #[test]
    fn missing_parameter_is_config_error() {
        let config = RunConfig::from_reader("run_config", CONFIG.as_bytes()).expect("read");
        assert!(matches!(config.require("NOPE"), Err(TraceError::ConfigError(_))));
        assert!(matches!(
            config.require_usize("TRAINING_SET_FILE"),
            Err(TraceError::ConfigError(_))
        ));
    }

    #[test]
    fn needs_parameter_and_value_columns() {
        let result = RunConfig::from_reader("run_config", "name,value\nSEED,1\n".as_bytes());
        assert!(matches!(result, Err(TraceError::MissingColumn { .. })));
    }
}
