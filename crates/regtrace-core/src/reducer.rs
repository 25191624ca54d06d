//! # Trace Reducer
//!
//! Ties a decoded [`Trace`] to the segmenter under a [`ReducerProfile`].
//!
//! The reducer:
//! - derives each step's module activity (with injected ids),
//! - checks every module id against the module count,
//! - segments the steps into intervals,
//! - builds the per-cycle ledger the emitter needs.

use crate::decoder::ModuleActivity;
use crate::emitter::CycleLedger;
use crate::profile::ReducerProfile;
use crate::segmenter::{Interval, SegmentInput, Segmenter, SegmenterConfig};
use crate::trace::Trace;
use crate::TraceError;

/// Result of reducing one trace.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub intervals: Vec<Interval>,
    pub ledger: CycleLedger,
    /// Activity of every step, in step order.
    pub activities: Vec<ModuleActivity>,
}

impl Reduction {
    /// Total size of all promoted sets.
    #[must_use]
    pub fn promotion_count(&self) -> usize {
        self.intervals.iter().map(|i| i.promoted.len()).sum()
    }

    /// Total size of all repressed sets.
    #[must_use]
    pub fn repression_count(&self) -> usize {
        self.intervals.iter().map(|i| i.repressed.len()).sum()
    }
}

/// Reduces traces under one profile and segmenter configuration.
#[derive(Debug, Clone)]
pub struct TraceReducer<'p> {
    profile: &'p ReducerProfile,
    config: SegmenterConfig,
}

impl<'p> TraceReducer<'p> {
    #[must_use]
    pub fn new(profile: &'p ReducerProfile, config: SegmenterConfig) -> Self {
        Self { profile, config }
    }

    #[must_use]
    pub fn profile(&self) -> &ReducerProfile {
        self.profile
    }

    #[must_use]
    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Activity of every step, range-checked.
    pub fn activities(&self, trace: &Trace) -> Result<Vec<ModuleActivity>, TraceError> {
        trace
            .steps()
            .iter()
            .map(|step| {
                let activity = step.activity(&self.profile.inject);
                activity.check_range(self.config.module_count, step.index)?;
                Ok(activity)
            })
            .collect()
    }

    /// Reduce a whole trace.
    pub fn reduce(&self, trace: &Trace) -> Result<Reduction, TraceError> {
        let activities = self.activities(trace)?;
        let inputs = trace
            .steps()
            .iter()
            .zip(&activities)
            .map(|(step, activity)| SegmentInput {
                index: step.index,
                group: step.group,
                active: &activity.active,
                regulation: &step.regulation,
            });
        let intervals = Segmenter::run(self.config, inputs)?;
        let ledger = CycleLedger::from_trace(trace);
        Ok(Reduction {
            intervals,
            ledger,
            activities,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::{ModuleId, ModuleSet};

    const TRACE: &str = "\
cur_test_id,num_modules,cur_responding_function,module_regulator_states,thread_state_info
0,2,-1,\"[0,0]\",\"[]\"
0,2,-1,\"[0,0]\",\"[{call_stack:[{flow_stack:[{mp:0}]}]}]\"
0,2,1,\"[0,1]\",\"[{call_stack:[{flow_stack:[{mp:0}]}]}]\"
1,2,-1,\"[-2,1]\",\"[{call_stack:[{flow_stack:[{mp:1}]}]}]\"
";

    fn set(ids: &[u32]) -> ModuleSet {
        ids.iter().copied().map(ModuleId).collect()
    }

    #[test]
    fn reduces_with_injection() {
        let profile = ReducerProfile::regulation();
        let trace = Trace::from_reader("t", TRACE.as_bytes(), &profile).expect("load");
        let reducer = TraceReducer::new(&profile, SegmenterConfig::from_profile(&profile, 2));
        let reduction = reducer.reduce(&trace).expect("reduce");

        assert_eq!(reduction.activities[2].active, set(&[0, 1]));
        assert_eq!(reduction.intervals.len(), 2);

        let first = &reduction.intervals[0];
        assert_eq!(first.closing_step, 2);
        assert_eq!(first.active, set(&[0]));
        assert_eq!(first.repressed, set(&[1]));

        let second = &reduction.intervals[1];
        assert_eq!(second.closing_step, 3);
        assert_eq!(second.active, set(&[0, 1]));
        assert_eq!(second.promoted, set(&[0]));
        assert_eq!(second.deltas, vec![-2.0, 0.0]);

        assert_eq!(reduction.promotion_count(), 1);
        assert_eq!(reduction.repression_count(), 1);
    }

    #[test]
    fn module_beyond_count_fails_run() {
        let profile = ReducerProfile::regulation();
        let trace = Trace::from_reader("t", TRACE.as_bytes(), &profile).expect("load");
        let reducer = TraceReducer::new(&profile, SegmenterConfig::from_profile(&profile, 1));
        assert!(matches!(
            reducer.reduce(&trace),
            Err(TraceError::ModuleOutOfRange { step: 2, .. })
        ));
    }
}
