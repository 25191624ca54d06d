//! # Module Trace
//!
//! Expands a trace into one row per (step, module) for plotting module
//! activity over time.
//!
//! | Column | Value |
//! |--------|-------|
//! | carried fields | copied from the trace row |
//! | `module_id`, `time_step` | module and step index |
//! | `is_in_call_stack` | module is present in some thread |
//! | `is_running` | module is active in some thread |
//! | `is_match` | module is the step's triggering (or responding) module |
//! | `is_ever_active` | module is active at any step of the trace |
//! | trace values | the module's entry in each per-module vector |
//!
//! Activity here is the step's activity after injection, so a responding or
//! triggering module the profile injects counts as running at that step and
//! as ever active, even when no thread executed it.

use crate::decoder::ModuleActivity;
use crate::formats::parse_f64_list;
use crate::profile::ReducerProfile;
use crate::trace::Trace;
use crate::{ModuleId, ModuleSet, TraceError};
use csv::Writer;
use std::io::Write;

/// Derived columns between the carried fields and the trace values.
///
/// `is_ever_active` is the union of the injected active sets, not of thread
/// activity alone.
pub const MODULE_TRACE_FIELDS: [&str; 6] = [
    "module_id",
    "time_step",
    "is_in_call_stack",
    "is_running",
    "is_match",
    "is_ever_active",
];

/// Writes module traces in a profile's layout.
#[derive(Debug, Clone, Copy)]
pub struct ModuleTraceWriter<'p> {
    profile: &'p ReducerProfile,
}

impl<'p> ModuleTraceWriter<'p> {
    #[must_use]
    pub fn new(profile: &'p ReducerProfile) -> Self {
        Self { profile }
    }

    #[must_use]
    pub fn header(&self) -> Vec<String> {
        self.profile
            .carry_fields
            .iter()
            .cloned()
            .chain(MODULE_TRACE_FIELDS.iter().map(|f| (*f).to_string()))
            .chain(self.profile.trace_values.iter().map(|v| v.label.clone()))
            .collect()
    }

    /// Write `module_count` rows per step. `activities` holds one entry per
    /// step, as produced by the reducer.
    pub fn write<W: Write>(
        &self,
        writer: W,
        trace: &Trace,
        activities: &[ModuleActivity],
        module_count: usize,
    ) -> Result<usize, TraceError> {
        if activities.len() != trace.len() {
            return Err(TraceError::ConsistencyCheck(format!(
                "{} activity entries for {} trace steps",
                activities.len(),
                trace.len()
            )));
        }

        let table = trace.table();
        let carry_cols = self
            .profile
            .carry_fields
            .iter()
            .map(|f| table.column(f))
            .collect::<Result<Vec<_>, _>>()?;
        let value_cols = self
            .profile
            .trace_values
            .iter()
            .map(|v| table.column(&v.field).map(|col| (col, v.field.as_str())))
            .collect::<Result<Vec<_>, _>>()?;

        let ever_active: ModuleSet = activities
            .iter()
            .flat_map(|a| a.active.iter().copied())
            .collect();

        let mut csv_writer = Writer::from_writer(writer);
        csv_writer.write_record(self.header())?;
        let mut count = 0;
        for (step, activity) in trace.steps().iter().zip(activities) {
            let record = &table.rows()[step.index];
            let carried: Vec<&str> = carry_cols
                .iter()
                .map(|&col| record.get(col).unwrap_or_default())
                .collect();

            let mut vectors = Vec::with_capacity(value_cols.len());
            for &(col, field) in &value_cols {
                let values = parse_f64_list(record.get(col).unwrap_or_default(), field, step.index)?;
                if values.len() != module_count {
                    return Err(TraceError::RegulationLengthMismatch {
                        step: step.index,
                        expected: module_count,
                        found: values.len(),
                    });
                }
                vectors.push(values);
            }

            let matched = step.triggering.or(step.responding);
            let flag = |b: bool| (if b { "1" } else { "0" }).to_string();
            for index in 0..module_count {
                let module = ModuleId(index as u32);
                let mut row: Vec<String> = carried.iter().map(|s| (*s).to_string()).collect();
                row.push(module.to_string());
                row.push(step.index.to_string());
                row.push(flag(activity.present.contains(&module)));
                row.push(flag(activity.active.contains(&module)));
                row.push(flag(matched == Some(module)));
                row.push(flag(ever_active.contains(&module)));
                row.extend(vectors.iter().map(|v| format!("{:?}", v[index])));
                csv_writer.write_record(&row)?;
                count += 1;
            }
        }
        csv_writer.flush()?;

        let expected = module_count * trace.len();
        if count != expected {
            return Err(TraceError::ConsistencyCheck(format!(
                "module trace has {} rows, expected {}",
                count, expected
            )));
        }
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::reducer::TraceReducer;
    use crate::segmenter::SegmenterConfig;

    const TRACE: &str = "\
env_cycle,cpu_step,num_modules,env_signal_closest_match,env_signal_match_scores,module_regulator_states,thread_state_info
0,0,2,1,\"[0.5,0.9]\",\"[0,0]\",\"[{state:running,call_stack:[{flow_stack:[{mp:0},{mp:1}]}]}]\"
0,1,2,1,\"[0.5,0.9]\",\"[0,0]\",\"[]\"
";

    fn profile() -> ReducerProfile {
        let mut profile = ReducerProfile::match_score();
        profile.carry_fields = vec!["env_cycle".to_string(), "cpu_step".to_string()];
        profile
    }

    fn render(profile: &ReducerProfile, text: &str, module_count: usize) -> Result<String, TraceError> {
        let trace = Trace::from_reader("trace", text.as_bytes(), profile)?;
        let reducer = TraceReducer::new(profile, SegmenterConfig::from_profile(profile, module_count));
        let activities = reducer.activities(&trace)?;
        let mut out = Vec::new();
        ModuleTraceWriter::new(profile).write(&mut out, &trace, &activities, module_count)?;
        Ok(String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn one_row_per_step_and_module() {
        let text = render(&profile(), TRACE, 2).expect("render");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "env_cycle,cpu_step,module_id,time_step,is_in_call_stack,is_running,is_match,\
             is_ever_active,match_score,regulator_state"
        );
        assert_eq!(lines.len(), 1 + 4);
        assert_eq!(lines[1], "0,0,0,0,1,0,0,0,0.5,0.0");
        assert_eq!(lines[2], "0,0,1,0,1,1,1,1,0.9,0.0");
        assert_eq!(lines[3], "0,1,0,1,0,0,0,0,0.5,0.0");
        assert_eq!(lines[4], "0,1,1,1,0,0,1,1,0.9,0.0");
    }

    #[test]
    fn injected_module_counts_as_ever_active() {
        let text = "\
env_cycle,cpu_step,num_modules,env_signal_closest_match,env_signal_match_scores,module_regulator_states,thread_state_info
0,0,2,1,\"[0.5,0.9]\",\"[0,0]\",\"[]\"
0,1,2,-1,\"[0.5,0.9]\",\"[0,0]\",\"[]\"
";
        let plain = render(&profile(), text, 2).expect("render");
        assert_eq!(plain.lines().nth(4), Some("0,1,1,1,0,0,0,0,0.9,0.0"));

        let mut injecting = profile();
        injecting.inject.triggering = true;
        let injected = render(&injecting, text, 2).expect("render");
        let lines: Vec<&str> = injected.lines().collect();
        assert_eq!(lines[2], "0,0,1,0,1,1,1,1,0.9,0.0");
        assert_eq!(lines[4], "0,1,1,1,0,0,0,1,0.9,0.0");
    }

    #[test]
    fn short_vector_is_rejected() {
        let text = TRACE.replacen("\"[0.5,0.9]\"", "\"[0.5]\"", 1);
        assert!(matches!(
            render(&profile(), &text, 2),
            Err(TraceError::RegulationLengthMismatch { step: 0, expected: 2, found: 1 })
        ));
    }

    #[test]
    fn missing_carried_column() {
        let mut profile = profile();
        profile.carry_fields.push("num_env_states".to_string());
        assert!(matches!(
            render(&profile, TRACE, 2),
            Err(TraceError::MissingColumn { .. })
        ));
    }

    #[test]
    fn activity_count_must_match_steps() {
        let profile = profile();
        let trace = Trace::from_reader("trace", TRACE.as_bytes(), &profile).expect("load");
        let mut out = Vec::new();
        assert!(matches!(
            ModuleTraceWriter::new(&profile).write(&mut out, &trace, &[], 2),
            Err(TraceError::ConsistencyCheck(_))
        ));
    }
}
