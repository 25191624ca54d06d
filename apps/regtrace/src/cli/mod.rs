//! # regtrace CLI Module
//!
//! ## Available Commands
//!
//! - `reduce` - Reduce one trace file to an event table
//! - `aggregate` - Reduce every run and build the organism summary
//! - `graphs` - Build regulation graphs from event tables
//! - `exec-summary` - Count executed instructions by category
//! - `profiles` - List or show reducer profiles

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use regtrace_core::TraceError;
use regtrace_core::primitives::{DEFAULT_SUMMARY_FILE, EXEC_SUMMARY_FILE};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// regtrace - experiment trace aggregation
///
/// Reduces per-timestep organism traces into regulation event tables,
/// regulation graphs and per-run organism summaries.
#[derive(Parser, Debug)]
#[command(name = "regtrace")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a regtrace.toml config
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reduce one trace file to an event table
    Reduce {
        /// Organism trace table
        #[arg(short, long)]
        trace: PathBuf,

        /// Event table to write
        #[arg(short, long)]
        output: PathBuf,

        /// Preset name or profile .toml file
        #[arg(short, long)]
        profile: Option<String>,

        /// Module count (default: the trace's module count column)
        #[arg(short, long)]
        modules: Option<usize>,

        /// Reject group ids at or above this count
        #[arg(long)]
        cycles: Option<usize>,

        /// Also write the per-module trace here
        #[arg(long)]
        module_trace: Option<PathBuf>,

        /// Also write the execution trace here
        #[arg(long)]
        exec_trace: Option<PathBuf>,
    },

    /// Reduce every run and build the organism summary
    Aggregate {
        /// Data directories holding run directories
        #[arg(short, long, required = true, num_args = 1..)]
        data: Vec<PathBuf>,

        /// Output directory
        #[arg(long, default_value = ".")]
        dump: PathBuf,

        /// Newest update to take organisms from
        #[arg(short, long)]
        update: Option<u64>,

        /// Organism summary file name
        #[arg(long, default_value = DEFAULT_SUMMARY_FILE)]
        out_fname: String,

        /// Preset name or profile .toml file
        #[arg(short, long)]
        profile: Option<String>,

        /// Skip the module and execution traces
        #[arg(long)]
        no_traces: bool,
    },

    /// Build regulation graphs from event tables
    Graphs {
        /// Directory holding event tables
        #[arg(short, long)]
        data: PathBuf,

        /// Output directory
        #[arg(long, default_value = ".")]
        dump: PathBuf,

        /// Preset name or profile .toml file the tables were written with
        #[arg(short, long)]
        profile: Option<String>,

        /// One graph per group id instead of one per run
        #[arg(long)]
        partition: bool,

        /// Also write node and edge tables for every graph
        #[arg(long)]
        tables: bool,
    },

    /// Count executed instructions by category in every execution trace
    ExecSummary {
        /// Directory holding execution traces
        #[arg(short, long)]
        data: PathBuf,

        /// Output directory
        #[arg(long, default_value = ".")]
        dump: PathBuf,

        /// Execution summary file name
        #[arg(long, default_value = EXEC_SUMMARY_FILE)]
        out_fname: String,
    },

    /// List built-in profiles, or show one
    Profiles {
        /// Preset name or profile .toml file to show
        #[arg(short, long)]
        show: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), TraceError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Reduce {
            trace,
            output,
            profile,
            modules,
            cycles,
            module_trace,
            exec_trace,
        }) => {
            let profile = config.resolve_profile(profile.as_deref())?;
            let request = ReduceRequest {
                trace: &trace,
                output: &output,
                modules,
                cycles,
                module_trace: module_trace.as_deref(),
                exec_trace: exec_trace.as_deref(),
            };
            cmd_reduce(&profile, &request, json_mode)
        }
        Some(Commands::Aggregate {
            data,
            dump,
            update,
            out_fname,
            profile,
            no_traces,
        }) => {
            let profile = config.resolve_profile(profile.as_deref())?;
            let request = AggregateRequest {
                data: &data,
                dump: &dump,
                update,
                out_fname: &out_fname,
                traces: !no_traces,
            };
            cmd_aggregate(&config, &profile, &request, json_mode)
        }
        Some(Commands::Graphs {
            data,
            dump,
            profile,
            partition,
            tables,
        }) => {
            let profile = config.resolve_profile(profile.as_deref())?;
            cmd_graphs(&profile, &data, &dump, partition, tables, json_mode)
        }
        Some(Commands::ExecSummary {
            data,
            dump,
            out_fname,
        }) => cmd_exec_summary(&config.exec_summary, &data, &dump, &out_fname, json_mode),
        Some(Commands::Profiles { show }) => cmd_profiles(&config, show.as_deref(), json_mode),
        None => {
            // No subcommand - list profiles by default
            cmd_profiles(&config, None, json_mode)
        }
    }
}
