//! # regtrace-core
//!
//! The trace reduction engine for regtrace - THE LOGIC.
//!
//! Per-timestep organism traces go in; state-interval regulation event
//! tables, module and execution traces, execution summaries, regulation
//! graphs and organism summaries come out.
//!
//! ```text
//! trace table ─► Trace (decoder) ─► TraceReducer (segmenter) ─► EventEmitter
//!                                                                   │
//!                         RegulationGraph ◄─ read_events ◄──────────┘
//! ```
//!
//! ## Architectural Constraints
//!
//! - Works on readers and writers; run discovery and file naming on disk
//!   belong to the app layer
//! - Deterministic: ordered collections only
//! - Fail fast: one malformed record invalidates the whole trace
//! - NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod decoder;
pub mod emitter;
pub mod exec_summary;
pub mod exec_trace;
pub mod formats;
pub mod graph;
pub mod knockout;
pub mod module_trace;
pub mod organism;
pub mod primitives;
pub mod profile;
pub mod reducer;
pub mod run_config;
pub mod segmenter;
pub mod system;
pub mod trace;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{GroupId, ModuleId, ModuleSet, NO_MODULE, TraceError, module_or_sentinel};

// =============================================================================
// RE-EXPORTS: Reduction Pipeline
// =============================================================================

pub use decoder::{CallFrame, FlowFrame, ModuleActivity, ThreadState, decode_threads};
pub use emitter::{CycleEntry, CycleLedger, EventEmitter, EventRecord, read_events};
pub use profile::{
    EventColumn, InjectionRules, ReducerProfile, RegulationChange, SignConvention, TraceValue,
};
pub use reducer::{Reduction, TraceReducer};
pub use segmenter::{Interval, SegmentInput, Segmenter, SegmenterConfig};
pub use trace::{Trace, TraceStep};

// =============================================================================
// RE-EXPORTS: Derived Tables
// =============================================================================

pub use exec_summary::{ExecSummary, InstructionCategories};
pub use exec_trace::{ExecTraceWriter, active_instructions};
pub use graph::{EdgeKind, ModuleNode, RegulationEdge, RegulationGraph};
pub use knockout::{Conjunction, KnockoutProfile, KnockoutSpec};
pub use module_trace::{MODULE_TRACE_FIELDS, ModuleTraceWriter};
pub use organism::{OrganismSummaryBuilder, RunFacts};
pub use run_config::RunConfig;

// =============================================================================
// RE-EXPORTS: Formats & System
// =============================================================================

pub use formats::Table;
pub use system::{GraphSummary, NOT_AVAILABLE};
