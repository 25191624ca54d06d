//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands. All
//! file access happens here; the core only sees readers and writers.

use crate::config::{AppConfig, load_profile};
use crate::runs::{discover_outputs, discover_runs, locate_artifacts, output_run_id, output_update};
use regtrace_core::primitives::{
    EVENT_TABLE_MARKER, EXEC_TRACE_MARKER, GRAPH_SUMMARY_FILE, event_table_name, exec_trace_name,
    graph_edges_name, graph_nodes_name, module_trace_name,
};
use regtrace_core::{
    EventEmitter, EventRecord, ExecSummary, ExecTraceWriter, GraphSummary, InstructionCategories,
    ModuleTraceWriter, OrganismSummaryBuilder, ReducerProfile, Reduction, RegulationGraph,
    RunConfig, RunFacts, SegmenterConfig, Table, Trace, TraceError, TraceReducer, read_events,
};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// `test_id` written for graphs that span a whole run.
const WHOLE_RUN_GROUP: &str = "all";

// =============================================================================
// FILE HELPERS
// =============================================================================

fn open_input(path: &Path) -> Result<BufReader<File>, TraceError> {
    if !path.is_file() {
        return Err(TraceError::MissingFile(path.display().to_string()));
    }
    Ok(BufReader::new(File::open(path)?))
}

fn create_output(path: &Path) -> Result<BufWriter<File>, TraceError> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Sibling of `path` that a file is written to before being renamed into place.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `path` through a staging file. `path` is only replaced once `write`
/// succeeds; on failure the staging file is removed and `path` is untouched.
fn write_staged<T, F>(path: &Path, write: F) -> Result<T, TraceError>
where
    F: FnOnce(BufWriter<File>) -> Result<T, TraceError>,
{
    let staging = staging_path(path);
    let result = create_output(&staging).and_then(write);
    match result {
        Ok(value) => {
            std::fs::rename(&staging, path).map_err(|e| {
                TraceError::IoError(format!("cannot move {} into place: {}", path.display(), e))
            })?;
            Ok(value)
        }
        Err(err) => {
            if let Err(cleanup) = std::fs::remove_file(&staging) {
                tracing::warn!(path = %staging.display(), error = %cleanup, "staging file left behind");
            }
            Err(err)
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn ensure_dir(path: &Path) -> Result<(), TraceError> {
    std::fs::create_dir_all(path)
        .map_err(|e| TraceError::IoError(format!("cannot create {}: {}", path.display(), e)))
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

/// Load a trace and reduce it.
fn reduce_trace(
    profile: &ReducerProfile,
    trace_path: &Path,
    modules: Option<usize>,
    cycles: Option<usize>,
) -> Result<(Trace, Reduction, usize), TraceError> {
    let trace = Trace::from_reader(&display_name(trace_path), open_input(trace_path)?, profile)?;
    let module_count = match modules.or_else(|| trace.declared_module_count()) {
        Some(count) => count,
        None if trace.is_empty() => 0,
        None => {
            return Err(TraceError::MissingColumn {
                table: display_name(trace_path),
                column: profile.module_count_field.clone(),
            });
        }
    };
    let config = SegmenterConfig::from_profile(profile, module_count).with_cycle_count(cycles);
    let reduction = TraceReducer::new(profile, config).reduce(&trace)?;
    tracing::debug!(
        trace = %trace_path.display(),
        steps = trace.len(),
        modules = module_count,
        intervals = reduction.intervals.len(),
        "reduced trace"
    );
    Ok((trace, reduction, module_count))
}

fn event_records(reduction: &Reduction) -> Vec<EventRecord> {
    reduction
        .intervals
        .iter()
        .map(|interval| EventRecord::from_interval(interval, &reduction.ledger))
        .collect()
}

fn write_events(
    profile: &ReducerProfile,
    path: &Path,
    reduction: &Reduction,
) -> Result<usize, TraceError> {
    let rows = EventEmitter::new(profile).write(create_output(path)?, &event_records(reduction))?;
    tracing::info!(path = %path.display(), rows, "wrote event table");
    Ok(rows)
}

fn write_module_trace(
    profile: &ReducerProfile,
    path: &Path,
    trace: &Trace,
    reduction: &Reduction,
    module_count: usize,
) -> Result<usize, TraceError> {
    let rows = ModuleTraceWriter::new(profile).write(
        create_output(path)?,
        trace,
        &reduction.activities,
        module_count,
    )?;
    tracing::info!(path = %path.display(), rows, "wrote module trace");
    Ok(rows)
}

fn write_exec_trace(profile: &ReducerProfile, path: &Path, trace: &Trace) -> Result<usize, TraceError> {
    let rows = ExecTraceWriter::new(profile).write(create_output(path)?, trace)?;
    tracing::info!(path = %path.display(), rows, "wrote execution trace");
    Ok(rows)
}

// =============================================================================
// REDUCE COMMAND
// =============================================================================

/// Arguments of `reduce`.
#[derive(Debug, Clone, Copy)]
pub struct ReduceRequest<'a> {
    pub trace: &'a Path,
    pub output: &'a Path,
    pub modules: Option<usize>,
    pub cycles: Option<usize>,
    pub module_trace: Option<&'a Path>,
    pub exec_trace: Option<&'a Path>,
}

#[derive(Debug, Serialize)]
struct ReduceReport {
    profile: String,
    steps: usize,
    modules: usize,
    intervals: usize,
    promotions: usize,
    repressions: usize,
    output: String,
}

/// Reduce one trace file.
pub fn cmd_reduce(
    profile: &ReducerProfile,
    request: &ReduceRequest<'_>,
    json_mode: bool,
) -> Result<(), TraceError> {
    tracing::info!(trace = %request.trace.display(), profile = %profile.name, "reducing trace");

    let (trace, reduction, module_count) =
        reduce_trace(profile, request.trace, request.modules, request.cycles)?;
    write_events(profile, request.output, &reduction)?;
    if let Some(path) = request.module_trace {
        write_module_trace(profile, path, &trace, &reduction, module_count)?;
    }
    if let Some(path) = request.exec_trace {
        write_exec_trace(profile, path, &trace)?;
    }

    let report = ReduceReport {
        profile: profile.name.clone(),
        steps: trace.len(),
        modules: module_count,
        intervals: reduction.intervals.len(),
        promotions: reduction.promotion_count(),
        repressions: reduction.repression_count(),
        output: display_name(request.output),
    };
    if json_mode {
        print_json(&report);
        return Ok(());
    }

    println!("Trace Reduction");
    println!("===============");
    println!("Profile:     {}", report.profile);
    println!("Steps:       {}", report.steps);
    println!("Modules:     {}", report.modules);
    println!("Intervals:   {}", report.intervals);
    println!("Promotions:  {}", report.promotions);
    println!("Repressions: {}", report.repressions);
    println!("Output:      {}", report.output);
    Ok(())
}

// =============================================================================
// AGGREGATE COMMAND
// =============================================================================

/// Arguments of `aggregate`.
#[derive(Debug, Clone, Copy)]
pub struct AggregateRequest<'a> {
    pub data: &'a [PathBuf],
    pub dump: &'a Path,
    pub update: Option<u64>,
    pub out_fname: &'a str,
    pub traces: bool,
}

#[derive(Debug, Serialize)]
struct RunReport {
    run: String,
    run_id: String,
    update: u64,
    intervals: usize,
    calls_with_promoters: usize,
    calls_with_repressors: usize,
}

#[derive(Debug, Serialize)]
struct AggregateReport {
    profile: String,
    runs: Vec<RunReport>,
    summary: String,
}

/// Reduce every run under `request.data` and write the organism summary.
///
/// The first failing run aborts the whole batch; nothing is skipped.
pub fn cmd_aggregate(
    config: &AppConfig,
    profile: &ReducerProfile,
    request: &AggregateRequest<'_>,
    json_mode: bool,
) -> Result<(), TraceError> {
    let runs = discover_runs(request.data, &config.runs.identifier)?;
    tracing::info!(runs = runs.len(), profile = %profile.name, "found run directories");
    ensure_dir(request.dump)?;

    let mut summary = OrganismSummaryBuilder::new(config.knockouts.clone())
        .field_exclude(config.runs.field_exclude.iter().cloned())
        .config_exclude(config.runs.config_exclude.iter().cloned())
        .task_param(config.runs.task_param.clone());
    let mut reports = Vec::with_capacity(runs.len());

    for run_dir in &runs {
        let artifacts = locate_artifacts(run_dir, request.update)?;
        let label = artifacts.label();
        tracing::info!(run = %label, update = artifacts.update, "extracting run");

        let run_config =
            RunConfig::from_reader(&display_name(&artifacts.config), open_input(&artifacts.config)?)?;
        let analysis =
            Table::from_reader(&display_name(&artifacts.analysis), open_input(&artifacts.analysis)?)?;
        let cycles = config
            .runs
            .cycle_count_param
            .as_deref()
            .map(|param| run_config.require_usize(param))
            .transpose()?;
        let run_id = run_config.require(&config.runs.seed_param)?.to_string();
        let update = artifacts.update.to_string();

        let (trace, reduction, module_count) = reduce_trace(profile, &artifacts.trace, None, cycles)?;
        write_events(
            profile,
            &request.dump.join(event_table_name(&update, &run_id)),
            &reduction,
        )?;
        if request.traces {
            write_module_trace(
                profile,
                &request.dump.join(module_trace_name(&update, &run_id)),
                &trace,
                &reduction,
                module_count,
            )?;
            write_exec_trace(
                profile,
                &request.dump.join(exec_trace_name(&update, &run_id)),
                &trace,
            )?;
        }

        let facts = RunFacts {
            update: update.clone(),
            calls_with_promoters: reduction.promotion_count(),
            calls_with_repressors: reduction.repression_count(),
        };
        summary.add_run(&label, &analysis, &run_config, &facts)?;
        reports.push(RunReport {
            run: label,
            run_id,
            update: artifacts.update,
            intervals: reduction.intervals.len(),
            calls_with_promoters: facts.calls_with_promoters,
            calls_with_repressors: facts.calls_with_repressors,
        });
    }

    let summary_path = request.dump.join(request.out_fname);
    let rows = summary.write(create_output(&summary_path)?)?;
    tracing::info!(path = %summary_path.display(), rows, "wrote organism summary");

    let report = AggregateReport {
        profile: profile.name.clone(),
        runs: reports,
        summary: display_name(&summary_path),
    };
    if json_mode {
        print_json(&report);
        return Ok(());
    }

    println!("Aggregated {} runs", report.runs.len());
    for run in &report.runs {
        println!(
            "  {:<24} update {:<8} intervals {:<6} promoters {:<5} repressors {}",
            run.run, run.update, run.intervals, run.calls_with_promoters, run.calls_with_repressors
        );
    }
    println!("Summary: {}", report.summary);
    Ok(())
}

// =============================================================================
// GRAPHS COMMAND
// =============================================================================

#[derive(Debug, Serialize)]
struct GraphsReport {
    tables: usize,
    graphs: usize,
    summary: String,
}

/// Build regulation graphs from every event table in `data`.
pub fn cmd_graphs(
    profile: &ReducerProfile,
    data: &Path,
    dump: &Path,
    partition: bool,
    tables: bool,
    json_mode: bool,
) -> Result<(), TraceError> {
    let event_tables = discover_outputs(data, EVENT_TABLE_MARKER)?;
    tracing::info!(tables = event_tables.len(), "found event tables");
    ensure_dir(dump)?;

    let summary_path = dump.join(GRAPH_SUMMARY_FILE);
    let graph_count = write_staged(&summary_path, |out| {
        let mut writer = csv::Writer::from_writer(out);
        let mut header = vec!["run_id".to_string(), "test_id".to_string()];
        header.extend(GraphSummary::FIELDS.iter().map(|f| (*f).to_string()));
        writer.write_record(&header)?;

        let mut graph_count = 0;
        for path in &event_tables {
            let file_name = file_name_of(path);
            let run_id = output_run_id(&file_name).ok_or_else(|| {
                TraceError::ConsistencyCheck(format!("{}: no run id in file name", path.display()))
            })?;
            let events = read_events(profile, &display_name(path), open_input(path)?)?;

            let graphs: Vec<(String, RegulationGraph)> = if partition {
                RegulationGraph::partition(&events)?
                    .into_iter()
                    .map(|(group, graph)| (group.to_string(), graph))
                    .collect()
            } else {
                vec![(WHOLE_RUN_GROUP.to_string(), RegulationGraph::from_events(&events)?)]
            };

            for (group, graph) in &graphs {
                if tables {
                    let group_part = partition.then_some(group.as_str());
                    let nodes_path = dump.join(graph_nodes_name(run_id, group_part));
                    let edges_path = dump.join(graph_edges_name(run_id, group_part));
                    graph.write_nodes(create_output(&nodes_path)?)?;
                    graph.write_edges(create_output(&edges_path)?, profile.edge_delta_label())?;
                    tracing::debug!(nodes = %nodes_path.display(), edges = %edges_path.display(), "wrote graph tables");
                }
                let mut row = vec![run_id.to_string(), group.clone()];
                row.extend(GraphSummary::from_graph(graph).values());
                writer.write_record(&row)?;
                graph_count += 1;
            }
            tracing::info!(run_id, graphs = graphs.len(), "built regulation graphs");
        }
        writer.flush()?;
        Ok(graph_count)
    })?;

    let report = GraphsReport {
        tables: event_tables.len(),
        graphs: graph_count,
        summary: display_name(&summary_path),
    };
    if json_mode {
        print_json(&report);
        return Ok(());
    }
    println!(
        "Built {} graphs from {} event tables",
        report.graphs, report.tables
    );
    println!("Summary: {}", report.summary);
    Ok(())
}

// =============================================================================
// EXEC-SUMMARY COMMAND
// =============================================================================

#[derive(Debug, Serialize)]
struct ExecRunReport {
    run_id: String,
    update: String,
    total_instructions: usize,
    total_steps: usize,
}

#[derive(Debug, Serialize)]
struct ExecSummaryReport {
    categories: Vec<String>,
    runs: Vec<ExecRunReport>,
    summary: String,
}

/// Summarize every execution trace in `data` by instruction category.
pub fn cmd_exec_summary(
    categories: &InstructionCategories,
    data: &Path,
    dump: &Path,
    out_fname: &str,
    json_mode: bool,
) -> Result<(), TraceError> {
    if categories.is_empty() {
        return Err(TraceError::ConfigError(
            "no instruction categories configured ([exec_summary] in regtrace.toml)".to_string(),
        ));
    }
    categories.validate()?;
    let exec_traces = discover_outputs(data, EXEC_TRACE_MARKER)?;
    tracing::info!(traces = exec_traces.len(), "found execution traces");
    ensure_dir(dump)?;

    let summary_path = dump.join(out_fname);
    let runs = write_staged(&summary_path, |out| {
        let mut writer = csv::Writer::from_writer(out);
        let mut header = vec!["run_id".to_string(), "update".to_string()];
        header.extend(categories.fields());
        writer.write_record(&header)?;

        let mut runs = Vec::with_capacity(exec_traces.len());
        for path in &exec_traces {
            let file_name = file_name_of(path);
            let (run_id, update) = match (output_run_id(&file_name), output_update(&file_name)) {
                (Some(run_id), Some(update)) => (run_id.to_string(), update.to_string()),
                _ => {
                    return Err(TraceError::ConsistencyCheck(format!(
                        "{}: no update and run id in file name",
                        path.display()
                    )));
                }
            };
            let table = Table::from_reader(&display_name(path), open_input(path)?)?;
            let summary = ExecSummary::from_table(categories, &table)?;
            tracing::debug!(run_id = %run_id, instructions = summary.total_instructions, "summarized execution trace");

            let mut row = vec![run_id.clone(), update.clone()];
            row.extend(summary.values());
            writer.write_record(&row)?;
            runs.push(ExecRunReport {
                run_id,
                update,
                total_instructions: summary.total_instructions,
                total_steps: summary.total_steps,
            });
        }
        writer.flush()?;
        Ok(runs)
    })?;
    tracing::info!(path = %summary_path.display(), rows = runs.len(), "wrote execution summary");

    let report = ExecSummaryReport {
        categories: categories.categories.clone(),
        runs,
        summary: display_name(&summary_path),
    };
    if json_mode {
        print_json(&report);
        return Ok(());
    }
    println!("Summarized {} execution traces", report.runs.len());
    for run in &report.runs {
        println!(
            "  run {:<12} update {:<8} instructions {:<8} steps {}",
            run.run_id, run.update, run.total_instructions, run.total_steps
        );
    }
    println!("Summary: {}", report.summary);
    Ok(())
}

// =============================================================================
// PROFILES COMMAND
// =============================================================================

/// List built-in presets, or show one profile in full.
pub fn cmd_profiles(config: &AppConfig, show: Option<&str>, json_mode: bool) -> Result<(), TraceError> {
    let Some(spec) = show else {
        let configured = config.resolve_profile(None)?;
        if json_mode {
            print_json(&serde_json::json!({
                "presets": ReducerProfile::presets(),
                "configured": configured.name,
            }));
            return Ok(());
        }
        println!("Built-in profiles:");
        for name in ReducerProfile::presets() {
            let marker = if name == configured.name { " (configured)" } else { "" };
            println!("  {}{}", name, marker);
        }
        return Ok(());
    };

    let profile = load_profile(spec)?;
    if json_mode {
        print_json(&profile);
        return Ok(());
    }

    println!("Profile: {}", profile.name);
    println!("==========={}", "=".repeat(profile.name.len()));
    println!("Group field:       {} (as {})", profile.group_field, profile.group_label);
    println!("Vector field:      {}", profile.regulation_field);
    println!("Thread state:      {}", profile.thread_state_field);
    println!("Module count:      {}", profile.module_count_field);
    println!("Sign convention:   {:?}", profile.sign);
    println!("Split on change:   {}", profile.split_on_regulation_change);
    println!(
        "Injected:          responding={} triggering={}",
        profile.inject.responding, profile.inject.triggering
    );
    println!("Event columns:     {}", profile.header().join(","));
    println!("Carried columns:   {}", profile.carry_fields.join(","));
    Ok(())
}
