//! # Trace Loading
//!
//! Reads an organism trace table and decodes every step once, up front.
//! The raw table is kept alongside the decoded steps so that carried
//! columns can be copied verbatim into derived tables.

use crate::decoder::{ModuleActivity, ThreadState, decode_threads};
use crate::formats::{Table, parse_f64_list};
use crate::profile::{InjectionRules, ReducerProfile};
use crate::{GroupId, ModuleId, TraceError};
use std::io::Read;

/// One decoded row of a trace.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceStep {
    /// Row position, starting at 0.
    pub index: usize,
    pub group: GroupId,
    pub threads: Vec<ThreadState>,
    pub regulation: Vec<f64>,
    pub responding: Option<ModuleId>,
    pub triggering: Option<ModuleId>,
    /// Module count declared in the row, when the column exists.
    pub declared_modules: Option<usize>,
}

impl TraceStep {
    /// Present and active modules of this step, with injected ids added.
    #[must_use]
    pub fn activity(&self, rules: &InjectionRules) -> ModuleActivity {
        let mut activity = ModuleActivity::observe(&self.threads);
        if let (true, Some(module)) = (rules.responding, self.responding) {
            activity.inject(module);
        }
        if let (true, Some(module)) = (rules.triggering, self.triggering) {
            activity.inject(module);
        }
        activity
    }
}

/// A fully decoded trace.
#[derive(Debug, Clone)]
pub struct Trace {
    table: Table,
    steps: Vec<TraceStep>,
}

impl Trace {
    /// Read and decode a trace table under `profile`.
    ///
    /// Any undecodable row fails the whole trace.
    pub fn from_reader<R: Read>(
        name: &str,
        reader: R,
        profile: &ReducerProfile,
    ) -> Result<Self, TraceError> {
        let table = Table::from_reader(name, reader)?;

        let group_col = table.column(&profile.group_field)?;
        let thread_col = table.column(&profile.thread_state_field)?;
        let regulation_col = table.column(&profile.regulation_field)?;
        let responding_col = profile
            .responding_field
            .as_deref()
            .map(|f| table.column(f))
            .transpose()?;
        let triggering_col = profile
            .triggering_field
            .as_deref()
            .map(|f| table.column(f))
            .transpose()?;
        let module_count_col = table.column(&profile.module_count_field).ok();

        let mut steps: Vec<TraceStep> = Vec::with_capacity(table.len());
        for (index, record) in table.rows().iter().enumerate() {
            let cell = |col: usize| record.get(col).unwrap_or_default();

            let raw_group = cell(group_col);
            let group = raw_group
                .parse::<u64>()
                .map(GroupId)
                .map_err(|_| TraceError::MalformedValue {
                    field: profile.group_field.clone(),
                    step: index,
                    value: raw_group.to_string(),
                })?;

            let threads = decode_threads(cell(thread_col), index)?;
            let regulation = parse_f64_list(cell(regulation_col), &profile.regulation_field, index)?;

            let responding = match (responding_col, profile.responding_field.as_deref()) {
                (Some(col), Some(field)) => ModuleId::parse_optional(cell(col), field, index)?,
                _ => None,
            };
            let triggering = match (triggering_col, profile.triggering_field.as_deref()) {
                (Some(col), Some(field)) => ModuleId::parse_optional(cell(col), field, index)?,
                _ => None,
            };

            let declared_modules = module_count_col
                .map(|col| {
                    let raw = cell(col);
                    raw.parse::<usize>().map_err(|_| TraceError::MalformedValue {
                        field: profile.module_count_field.clone(),
                        step: index,
                        value: raw.to_string(),
                    })
                })
                .transpose()?;
            match (steps.first().and_then(|s| s.declared_modules), declared_modules) {
                (Some(first), Some(current)) if first != current => {
                    return Err(TraceError::ConsistencyCheck(format!(
                        "{}: {} is {} at step {} but {} at step 0",
                        name, profile.module_count_field, current, index, first
                    )));
                }
                _ => {}
            }

            steps.push(TraceStep {
                index,
                group,
                threads,
                regulation,
                responding,
                triggering,
                declared_modules,
            });
        }

        Ok(Self { table, steps })
    }

    #[must_use]
    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The underlying table, for carried columns.
    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Module count declared by the trace, if it carries one. Every step
    /// declares the same count.
    #[must_use]
    pub fn declared_module_count(&self) -> Option<usize> {
        self.steps.first().and_then(|s| s.declared_modules)
    }
}
