//! Execution trace: the instructions each running thread is about to
//! execute, one row per step.

use crate::decoder::ThreadState;
use crate::formats::format_str_list;
use crate::profile::ReducerProfile;
use crate::trace::Trace;
use crate::TraceError;
use csv::{QuoteStyle, WriterBuilder};
use std::io::Write;

/// Instruction names at the top of every running thread's active frame.
///
/// Threads that are not running, or whose call stack is empty, contribute
/// nothing. A running thread with an active frame must name its instruction.
pub fn active_instructions(threads: &[ThreadState], step: usize) -> Result<Vec<&str>, TraceError> {
    let mut names = Vec::new();
    for thread in threads.iter().filter(|t| t.is_running()) {
        let Some(frame) = thread.active_frame() else {
            continue;
        };
        let name = frame
            .inst_name
            .as_deref()
            .ok_or_else(|| TraceError::MalformedThreadState {
                step,
                reason: format!("running frame of module {} has no inst_name", frame.mp),
            })?;
        names.push(name.trim().trim_end_matches(','));
    }
    Ok(names)
}

/// Writes execution traces in a profile's layout.
#[derive(Debug, Clone, Copy)]
pub struct ExecTraceWriter<'p> {
    profile: &'p ReducerProfile,
}

impl<'p> ExecTraceWriter<'p> {
    #[must_use]
    pub fn new(profile: &'p ReducerProfile) -> Self {
        Self { profile }
    }

    #[must_use]
    pub fn header(&self) -> Vec<String> {
        let mut header = self.profile.carry_fields.clone();
        header.push("time_step".to_string());
        header.push("active_instructions".to_string());
        header
    }

    pub fn write<W: Write>(&self, writer: W, trace: &Trace) -> Result<usize, TraceError> {
        let table = trace.table();
        let carry_cols = self
            .profile
            .carry_fields
            .iter()
            .map(|f| table.column(f))
            .collect::<Result<Vec<_>, _>>()?;

        let mut csv_writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .from_writer(writer);
        csv_writer.write_record(self.header())?;
        for step in trace.steps() {
            let record = &table.rows()[step.index];
            let mut row: Vec<String> = carry_cols
                .iter()
                .map(|&col| record.get(col).unwrap_or_default().to_string())
                .collect();
            row.push(step.index.to_string());
            row.push(format_str_list(&active_instructions(&step.threads, step.index)?));
            csv_writer.write_record(&row)?;
        }
        csv_writer.flush()?;
        Ok(trace.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::decoder::decode_threads;

    #[test]
    fn only_running_threads_contribute() {
        let threads = decode_threads(
            "[{state:running,call_stack:[{flow_stack:[{mp:0,inst_name:Inc}]}]},\
             {state:pending,call_stack:[{flow_stack:[{mp:1,inst_name:Dec}]}]},\
             {state:running,call_stack:[]},\
             {state:running,call_stack:[{flow_stack:[{mp:2,inst_name:Nop}]}]}]",
            0,
        )
        .expect("decode");
        assert_eq!(active_instructions(&threads, 0).expect("names"), ["Inc", "Nop"]);
    }

    #[test]
    fn running_frame_without_name_is_malformed() {
        let threads =
            decode_threads("[{state:running,call_stack:[{flow_stack:[{mp:3}]}]}]", 4).expect("decode");
        assert!(matches!(
            active_instructions(&threads, 4),
            Err(TraceError::MalformedThreadState { step: 4, .. })
        ));
    }

    #[test]
    fn writes_one_row_per_step() {
        let text = "\
cur_test_id,cpu_step,module_regulator_states,cur_responding_function,thread_state_info
0,0,\"[0]\",-1,\"[{state:running,call_stack:[{flow_stack:[{mp:0,inst_name:Inc}]}]},{state:running,call_stack:[{flow_stack:[{mp:0,inst_name:Nop}]}]}]\"
0,1,\"[0]\",-1,\"[]\"
";
        let mut profile = ReducerProfile::regulation();
        profile.carry_fields = vec!["cur_test_id".to_string(), "cpu_step".to_string()];
        let trace = Trace::from_reader("trace", text.as_bytes(), &profile).expect("load");

        let mut out = Vec::new();
        let rows = ExecTraceWriter::new(&profile).write(&mut out, &trace).expect("write");
        assert_eq!(rows, 2);
        let written = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "cur_test_id,cpu_step,time_step,active_instructions");
        assert_eq!(lines[1], "0,0,0,\"[Inc,Nop]\"");
        assert_eq!(lines[2], "0,1,1,[]");
    }
}
