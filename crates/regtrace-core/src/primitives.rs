//! # Primitives
//!
//! Fixed names and markers shared by the reduction engine and the app layer.
//!
//! The simulation writes its artifacts with these names; they are compiled in
//! and are not configurable at runtime.
//!
//! ## Run Layout
//!
//! ```text
//! <data_dir>/<..RUN_..>/output/run_config.csv
//! <data_dir>/<..RUN_..>/output/analysis_org_<id>_update_<u>.csv
//! <data_dir>/<..RUN_..>/output/trace_org_<id>_update_<u>.csv
//! ```

/// Subdirectory of a run directory that holds its artifacts.
pub const OUTPUT_SUBDIR: &str = "output";

/// Run configuration table file name.
pub const RUN_CONFIG_FILE: &str = "run_config.csv";

/// Column of the run configuration table holding parameter names.
pub const CONFIG_PARAMETER_COLUMN: &str = "parameter";

/// Column of the run configuration table holding parameter values.
pub const CONFIG_VALUE_COLUMN: &str = "value";

/// Marker in organism analysis file names.
pub const ANALYSIS_FILE_MARKER: &str = "analysis_org_";

/// Marker in organism trace file names.
pub const TRACE_FILE_MARKER: &str = "trace_org_";

/// Separator between organism id and update in artifact file names.
pub const UPDATE_MARKER: &str = "_update_";

/// Default substring identifying run directories.
pub const DEFAULT_RUN_DIR_IDENTIFIER: &str = "RUN_";

// =============================================================================
// OUTPUT NAMES
// =============================================================================

/// Marker in event table file names (`reg-graph_update-<u>_run-id-<seed>.csv`).
pub const EVENT_TABLE_MARKER: &str = "reg-graph";

/// Marker preceding the run id in per-run output file names.
pub const RUN_ID_MARKER: &str = "run-id-";

/// Marker in execution trace file names (`trace-exec_update-<u>_run-id-<seed>.csv`).
pub const EXEC_TRACE_MARKER: &str = "trace-exec";

/// Aggregate execution summary file name.
pub const EXEC_SUMMARY_FILE: &str = "exec_trace_summary.csv";

/// Aggregate regulation graph summary file name.
pub const GRAPH_SUMMARY_FILE: &str = "reg_graphs_summary.csv";

/// Default aggregate organism summary file name.
pub const DEFAULT_SUMMARY_FILE: &str = "max_fit_orgs.csv";

/// Event table file name for one run.
#[must_use]
pub fn event_table_name(update: &str, run_id: &str) -> String {
    format!("{EVENT_TABLE_MARKER}_update-{update}_{RUN_ID_MARKER}{run_id}.csv")
}

/// Module trace file name for one run.
#[must_use]
pub fn module_trace_name(update: &str, run_id: &str) -> String {
    format!("trace_update-{update}_{RUN_ID_MARKER}{run_id}.csv")
}

/// Execution trace file name for one run.
#[must_use]
pub fn exec_trace_name(update: &str, run_id: &str) -> String {
    format!("{EXEC_TRACE_MARKER}_update-{update}_{RUN_ID_MARKER}{run_id}.csv")
}

/// Node table file name of one regulation graph. `group` is set when graphs
/// are partitioned per group.
#[must_use]
pub fn graph_nodes_name(run_id: &str, group: Option<&str>) -> String {
    graph_table_name(run_id, group, "nodes")
}

/// Edge table file name of one regulation graph.
#[must_use]
pub fn graph_edges_name(run_id: &str, group: Option<&str>) -> String {
    graph_table_name(run_id, group, "edges")
}

fn graph_table_name(run_id: &str, group: Option<&str>, table: &str) -> String {
    match group {
        Some(group) => format!("reg_graph_id-{run_id}_test-{group}_{table}.csv"),
        None => format!("reg_graph_id-{run_id}_{table}.csv"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names() {
        assert_eq!(
            event_table_name("1000", "23001"),
            "reg-graph_update-1000_run-id-23001.csv"
        );
        assert_eq!(
            module_trace_name("1000", "23001"),
            "trace_update-1000_run-id-23001.csv"
        );
        assert_eq!(
            exec_trace_name("5", "7"),
            "trace-exec_update-5_run-id-7.csv"
        );
    }

    #[test]
    fn graph_table_names() {
        assert_eq!(graph_nodes_name("7", None), "reg_graph_id-7_nodes.csv");
        assert_eq!(
            graph_edges_name("7", Some("3")),
            "reg_graph_id-7_test-3_edges.csv"
        );
    }
}
