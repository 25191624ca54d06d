//! # Event Emitter
//!
//! Serializes intervals as rows of the event table, and reads event tables
//! back by header name.
//!
//! Module sets and value vectors are written as `[a,b,c]` literals in quoted
//! fields. The header and numeric fields are left bare, so the first line
//! splits on plain commas.

use crate::formats::{Table, format_f64_list, format_module_set, parse_f64_list, parse_module_set};
use crate::profile::{EventColumn, ReducerProfile};
use crate::segmenter::Interval;
use crate::trace::Trace;
use crate::{GroupId, ModuleId, ModuleSet, TraceError, module_or_sentinel};
use csv::{QuoteStyle, WriterBuilder};
use std::collections::BTreeMap;
use std::io::{Read, Write};

// =============================================================================
// CYCLE LEDGER
// =============================================================================

/// Triggering and responding module of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleEntry {
    /// Triggering module at the group's first step.
    pub triggered: Option<ModuleId>,
    /// First responding module seen in the group.
    pub responded: Option<ModuleId>,
}

/// Per-group ledger built over a whole trace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleLedger {
    entries: BTreeMap<GroupId, CycleEntry>,
}

impl CycleLedger {
    #[must_use]
    pub fn from_trace(trace: &Trace) -> Self {
        let mut entries: BTreeMap<GroupId, CycleEntry> = BTreeMap::new();
        for step in trace.steps() {
            let entry = entries.entry(step.group).or_insert(CycleEntry {
                triggered: step.triggering,
                responded: None,
            });
            if entry.responded.is_none() {
                entry.responded = step.responding;
            }
        }
        Self { entries }
    }

    /// Entry for `group`; unknown groups have neither module.
    #[must_use]
    pub fn get(&self, group: GroupId) -> CycleEntry {
        self.entries.get(&group).copied().unwrap_or_default()
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

// =============================================================================
// EVENT RECORD
// =============================================================================

/// One row of an event table.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub state_id: usize,
    pub group: GroupId,
    pub time_step: usize,
    pub module_triggered: Option<ModuleId>,
    pub module_responded: Option<ModuleId>,
    pub active: ModuleSet,
    pub promoted: ModuleSet,
    pub repressed: ModuleSet,
    pub values: Vec<f64>,
    pub deltas: Vec<f64>,
}

impl EventRecord {
    #[must_use]
    pub fn from_interval(interval: &Interval, ledger: &CycleLedger) -> Self {
        let entry = ledger.get(interval.group);
        Self {
            state_id: interval.id,
            group: interval.group,
            time_step: interval.closing_step,
            module_triggered: entry.triggered,
            module_responded: entry.responded,
            active: interval.active.clone(),
            promoted: interval.promoted.clone(),
            repressed: interval.repressed.clone(),
            values: interval.values.clone(),
            deltas: interval.deltas.clone(),
        }
    }
}

// =============================================================================
// EMITTER
// =============================================================================

/// Writes event tables in a profile's column layout.
#[derive(Debug, Clone, Copy)]
pub struct EventEmitter<'p> {
    profile: &'p ReducerProfile,
}

impl<'p> EventEmitter<'p> {
    #[must_use]
    pub fn new(profile: &'p ReducerProfile) -> Self {
        Self { profile }
    }

    #[must_use]
    pub fn header(&self) -> Vec<String> {
        self.profile.header()
    }

    /// Cells of one record in column order.
    #[must_use]
    pub fn row(&self, record: &EventRecord) -> Vec<String> {
        self.profile
            .columns
            .iter()
            .map(|column| match column {
                EventColumn::StateId => record.state_id.to_string(),
                EventColumn::Group => record.group.to_string(),
                EventColumn::TimeStep => record.time_step.to_string(),
                EventColumn::ModuleTriggered => module_or_sentinel(record.module_triggered),
                EventColumn::ModuleResponded => module_or_sentinel(record.module_responded),
                EventColumn::ActiveModules => format_module_set(&record.active),
                EventColumn::Promoted => format_module_set(&record.promoted),
                EventColumn::Repressed => format_module_set(&record.repressed),
                EventColumn::Values => format_f64_list(&record.values),
                EventColumn::Deltas => format_f64_list(&record.deltas),
            })
            .collect()
    }

    /// Write the header and every record. Returns the number of rows.
    ///
    /// List cells are always quoted; nothing else is. Labels and list
    /// literals never contain quotes themselves.
    pub fn write<'r, W, I>(&self, writer: W, records: I) -> Result<usize, TraceError>
    where
        W: Write,
        I: IntoIterator<Item = &'r EventRecord>,
    {
        let mut csv_writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Never)
            .from_writer(writer);
        csv_writer.write_record(self.header())?;
        let mut count = 0;
        for record in records {
            let cells = self
                .profile
                .columns
                .iter()
                .zip(self.row(record))
                .map(|(column, cell)| {
                    if column.is_list() {
                        format!("\"{}\"", cell)
                    } else {
                        cell
                    }
                });
            csv_writer.write_record(cells)?;
            count += 1;
        }
        csv_writer.flush()?;
        Ok(count)
    }
}

// =============================================================================
// READER
// =============================================================================

/// Read an event table written under `profile`.
///
/// `active_modules`, `promoted`, `repressed` and the deltas column are
/// required; other columns fall back to row position or "none".
pub fn read_events<R: Read>(
    profile: &ReducerProfile,
    name: &str,
    reader: R,
) -> Result<Vec<EventRecord>, TraceError> {
    let table = Table::from_reader(name, reader)?;

    let active_label = profile.column_name(EventColumn::ActiveModules);
    let promoted_label = profile.column_name(EventColumn::Promoted);
    let repressed_label = profile.column_name(EventColumn::Repressed);
    let deltas_label = profile.column_name(EventColumn::Deltas);
    for required in [active_label, promoted_label, repressed_label, deltas_label] {
        table.column(required)?;
    }

    let optional = |column: EventColumn| {
        let label = profile.column_name(column);
        table.has_column(label).then_some(label)
    };
    let state_label = optional(EventColumn::StateId);
    let group_label = optional(EventColumn::Group);
    let step_label = optional(EventColumn::TimeStep);
    let triggered_label = optional(EventColumn::ModuleTriggered);
    let responded_label = optional(EventColumn::ModuleResponded);
    let values_label = optional(EventColumn::Values);

    let parse_index = |row: usize, label: &str| -> Result<u64, TraceError> {
        let raw = table.cell(row, label)?;
        raw.parse::<u64>().map_err(|_| TraceError::MalformedValue {
            field: label.to_string(),
            step: row,
            value: raw.to_string(),
        })
    };

    let mut records = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let state_id = match state_label {
            Some(label) => parse_index(row, label)? as usize,
            None => row,
        };
        let group = match group_label {
            Some(label) => GroupId(parse_index(row, label)?),
            None => GroupId::default(),
        };
        let time_step = match step_label {
            Some(label) => parse_index(row, label)? as usize,
            None => row,
        };
        let module_triggered = match triggered_label {
            Some(label) => ModuleId::parse_optional(table.cell(row, label)?, label, row)?,
            None => None,
        };
        let module_responded = match responded_label {
            Some(label) => ModuleId::parse_optional(table.cell(row, label)?, label, row)?,
            None => None,
        };
        let values = match values_label {
            Some(label) => parse_f64_list(table.cell(row, label)?, label, row)?,
            None => Vec::new(),
        };

        records.push(EventRecord {
            state_id,
            group,
            time_step,
            module_triggered,
            module_responded,
            active: parse_module_set(table.cell(row, active_label)?, active_label, row)?,
            promoted: parse_module_set(table.cell(row, promoted_label)?, promoted_label, row)?,
            repressed: parse_module_set(table.cell(row, repressed_label)?, repressed_label, row)?,
            values,
            deltas: parse_f64_list(table.cell(row, deltas_label)?, deltas_label, row)?,
        });
    }
    Ok(records)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn set(ids: &[u32]) -> ModuleSet {
        ids.iter().copied().map(ModuleId).collect()
    }

    fn record(state_id: usize, group: u64) -> EventRecord {
        EventRecord {
            state_id,
            group: GroupId(group),
            time_step: state_id * 3,
            module_triggered: Some(ModuleId(1)),
            module_responded: None,
            active: set(&[0, 2]),
            promoted: set(&[1]),
            repressed: set(&[]),
            values: vec![0.5, -1.0, 0.0],
            deltas: vec![0.0, -1.0, 0.0],
        }
    }

    #[test]
    fn row_follows_profile_columns() {
        let profile = ReducerProfile::match_score();
        let emitter = EventEmitter::new(&profile);
        assert_eq!(
            emitter.row(&record(4, 2)),
            [
                "4",
                "2",
                "12",
                "1",
                "[0,2]",
                "[1]",
                "[]",
                "[0.5,-1.0,0.0]",
                "[0.0,-1.0,0.0]"
            ]
        );
    }

    #[test]
    fn lists_are_quoted_and_numbers_bare() {
        let profile = ReducerProfile::regulation();
        let mut out = Vec::new();
        let count = EventEmitter::new(&profile)
            .write(&mut out, &[record(0, 0)])
            .expect("write");
        assert_eq!(count, 1);
        let text = String::from_utf8(out).expect("utf8");
        let row = text.lines().nth(1).expect("row");
        assert_eq!(row, "0,0,0,\"[0,2]\",\"[1]\",\"[]\",\"[0.0,-1.0,0.0]\"");
    }

    #[test]
    fn header_splits_on_plain_commas() {
        let profile = ReducerProfile::match_score();
        let mut out = Vec::new();
        EventEmitter::new(&profile)
            .write(&mut out, &[record(0, 0)])
            .expect("write");
        let text = String::from_utf8(out).expect("utf8");
        let fields: Vec<&str> = text.lines().next().expect("header").split(',').collect();
        assert_eq!(fields, profile.header());
        assert_eq!(fields[0], "state_id");
        assert!(!text.lines().next().expect("header").contains('"'));
    }

    #[test]
    fn written_table_reads_back() {
        let profile = ReducerProfile::match_score();
        let records = vec![record(0, 0), record(1, 3)];
        let mut out = Vec::new();
        EventEmitter::new(&profile)
            .write(&mut out, &records)
            .expect("write");
        let back = read_events(&profile, "events", out.as_slice()).expect("read");
        assert_eq!(back, records);
    }

    #[test]
    fn reader_uses_header_names_not_positions() {
        let profile = ReducerProfile::regulation();
        let text = "reg_deltas,repressed,promoted,active_modules,extra\n\
                    \"[1.0,0.0]\",\"[0]\",[],[1],x\n";
        let back = read_events(&profile, "events", text.as_bytes()).expect("read");
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].active, set(&[1]));
        assert_eq!(back[0].repressed, set(&[0]));
        assert_eq!(back[0].deltas, vec![1.0, 0.0]);
        assert_eq!(back[0].state_id, 0);
    }

    #[test]
    fn reader_requires_deltas() {
        let profile = ReducerProfile::regulation();
        let text = "active_modules,promoted,repressed\n[],[],[]\n";
        assert!(matches!(
            read_events(&profile, "events", text.as_bytes()),
            Err(TraceError::MissingColumn { .. })
        ));
    }

    #[test]
    fn ledger_takes_first_trigger_and_first_response() {
        let profile = ReducerProfile {
            responding_field: Some("resp".to_string()),
            triggering_field: Some("trig".to_string()),
            ..ReducerProfile::match_score()
        };
        let text = "\
env_cycle,trig,resp,env_signal_match_scores,thread_state_info
0,2,-1,[0],[]
0,1,-1,[0],[]
0,1,3,[0],[]
0,1,4,[0],[]
1,-1,-1,[0],[]
";
        let trace = Trace::from_reader("t", text.as_bytes(), &profile).expect("load");
        let ledger = CycleLedger::from_trace(&trace);
        assert_eq!(ledger.len(), 2);
        assert_eq!(
            ledger.get(GroupId(0)),
            CycleEntry {
                triggered: Some(ModuleId(2)),
                responded: Some(ModuleId(3)),
            }
        );
        assert_eq!(ledger.get(GroupId(1)), CycleEntry::default());
        assert_eq!(ledger.get(GroupId(9)), CycleEntry::default());
    }
}
