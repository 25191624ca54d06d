//! # Interval Segmenter
//!
//! Folds an ordered sequence of steps into state intervals.
//!
//! An interval closes at a step when any of the following holds:
//! - the active-module set differs from the set held during the interval
//!   and is non-empty;
//! - the step is the last one of the trace;
//! - some module's value moved against the last *emitted* vector (only when
//!   `split_on_regulation_change` is set).
//!
//! Steps before the first non-empty active set fold into the first interval.
//! Deltas are always measured against the vector at the previous close,
//! not step over step.

use crate::profile::{RegulationChange, ReducerProfile, SignConvention};
use crate::{GroupId, ModuleId, ModuleSet, TraceError};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Explicit segmenter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmenterConfig {
    pub module_count: usize,
    /// Group ids must be below this when set.
    pub cycle_count: Option<usize>,
    pub sign: SignConvention,
    pub split_on_regulation_change: bool,
}

impl SegmenterConfig {
    #[must_use]
    pub fn new(module_count: usize) -> Self {
        Self {
            module_count,
            cycle_count: None,
            sign: SignConvention::default(),
            split_on_regulation_change: true,
        }
    }

    /// Settings for `profile` with the run's module count.
    #[must_use]
    pub fn from_profile(profile: &ReducerProfile, module_count: usize) -> Self {
        Self {
            module_count,
            cycle_count: None,
            sign: profile.sign,
            split_on_regulation_change: profile.split_on_regulation_change,
        }
    }

    #[must_use]
    pub fn with_cycle_count(mut self, cycle_count: Option<usize>) -> Self {
        self.cycle_count = cycle_count;
        self
    }

    #[must_use]
    pub fn with_sign(mut self, sign: SignConvention) -> Self {
        self.sign = sign;
        self
    }

    #[must_use]
    pub fn with_split(mut self, split_on_regulation_change: bool) -> Self {
        self.split_on_regulation_change = split_on_regulation_change;
        self
    }
}

// =============================================================================
// INPUT / OUTPUT
// =============================================================================

/// What the segmenter needs from one step.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentInput<'a> {
    pub index: usize,
    pub group: GroupId,
    pub active: &'a ModuleSet,
    pub regulation: &'a [f64],
}

/// One closed state interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    /// Monotonic from 0.
    pub id: usize,
    /// Step at which the interval closed.
    pub closing_step: usize,
    /// Group id of the closing step.
    pub group: GroupId,
    /// Active set held during the interval.
    pub active: ModuleSet,
    pub promoted: ModuleSet,
    pub repressed: ModuleSet,
    /// Current minus previously emitted values.
    pub deltas: Vec<f64>,
    /// Values at the close.
    pub values: Vec<f64>,
}

// =============================================================================
// SEGMENTER
// =============================================================================

#[derive(Debug, Clone)]
struct Held {
    active: ModuleSet,
    regulation: Vec<f64>,
}

/// Streaming interval segmenter.
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
    held: Option<Held>,
    found_activity: bool,
    next_id: usize,
}

impl Segmenter {
    #[must_use]
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            held: None,
            found_activity: false,
            next_id: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Number of intervals emitted so far.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.next_id
    }

    /// Feed one step. Returns the interval it closes, if any.
    pub fn observe(
        &mut self,
        input: &SegmentInput<'_>,
        is_last: bool,
    ) -> Result<Option<Interval>, TraceError> {
        self.check(input)?;

        let held = self.held.get_or_insert_with(|| Held {
            active: input.active.clone(),
            regulation: input.regulation.to_vec(),
        });
        if !self.found_activity {
            held.active = input.active.clone();
            self.found_activity = !input.active.is_empty();
        }

        let mut promoted = ModuleSet::new();
        let mut repressed = ModuleSet::new();
        let mut deltas = Vec::with_capacity(self.config.module_count);
        for (i, (&current, &previous)) in input.regulation.iter().zip(&held.regulation).enumerate()
        {
            deltas.push(current - previous);
            let module = ModuleId(i as u32);
            match self.config.sign.classify(previous, current) {
                Some(RegulationChange::Promoted) => {
                    promoted.insert(module);
                }
                Some(RegulationChange::Repressed) => {
                    repressed.insert(module);
                }
                None => {}
            }
        }

        let active_changed = input.active != &held.active && !input.active.is_empty();
        let regulation_changed =
            self.config.split_on_regulation_change && !(promoted.is_empty() && repressed.is_empty());

        if !(active_changed || is_last || regulation_changed) {
            return Ok(None);
        }

        let interval = Interval {
            id: self.next_id,
            closing_step: input.index,
            group: input.group,
            active: std::mem::replace(&mut held.active, input.active.clone()),
            promoted,
            repressed,
            deltas,
            values: input.regulation.to_vec(),
        };
        held.regulation = input.regulation.to_vec();
        self.next_id += 1;
        Ok(Some(interval))
    }

    /// Segment a whole ordered sequence.
    pub fn run<'a, I>(config: SegmenterConfig, inputs: I) -> Result<Vec<Interval>, TraceError>
    where
        I: IntoIterator<Item = SegmentInput<'a>>,
    {
        let mut segmenter = Self::new(config);
        let mut intervals = Vec::new();
        let mut inputs = inputs.into_iter().peekable();
        while let Some(input) = inputs.next() {
            let is_last = inputs.peek().is_none();
            if let Some(interval) = segmenter.observe(&input, is_last)? {
                intervals.push(interval);
            }
        }
        Ok(intervals)
    }

    fn check(&self, input: &SegmentInput<'_>) -> Result<(), TraceError> {
        if input.regulation.len() != self.config.module_count {
            return Err(TraceError::RegulationLengthMismatch {
                step: input.index,
                expected: self.config.module_count,
                found: input.regulation.len(),
            });
        }
        match self.config.cycle_count {
            Some(cycle_count) if input.group.0 >= cycle_count as u64 => {
                Err(TraceError::CycleOutOfRange {
                    step: input.index,
                    group: input.group,
                    cycle_count,
                })
            }
            _ => Ok(()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
