//! # Trace Decoder
//!
//! Decodes one step's thread-state text into typed values and derives the
//! module activity for that step.
//!
//! ```text
//! ThreadState ─► call_stack: [CallFrame] ─► flow_stack: [FlowFrame { mp, .. }]
//! ```
//!
//! - A module is *present* if it appears in any flow frame of any call frame
//!   of any thread.
//! - A module is *active* if it is at the top of the top call frame's flow
//!   stack of some thread.

use crate::formats::relaxed;
use crate::{ModuleId, ModuleSet, TraceError};
use serde::Deserialize;

// =============================================================================
// THREAD STATE
// =============================================================================

/// One flow of control inside a call frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlowFrame {
    /// Module pointer.
    pub mp: ModuleId,

    /// Instruction about to execute.
    #[serde(default)]
    pub inst_name: Option<String>,

    /// Flow type (`basic`, `while_loop`, `routine`, ...).
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// One frame of a thread's call stack.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CallFrame {
    #[serde(default)]
    pub flow_stack: Vec<FlowFrame>,
}

/// One thread of a program.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ThreadState {
    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub call_stack: Vec<CallFrame>,
}

impl ThreadState {
    /// Top flow frame of the top call frame.
    #[must_use]
    pub fn active_frame(&self) -> Option<&FlowFrame> {
        self.call_stack.last().and_then(|call| call.flow_stack.last())
    }

    #[must_use]
    pub fn active_module(&self) -> Option<ModuleId> {
        self.active_frame().map(|frame| frame.mp)
    }

    /// True when the thread reports the `running` state.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state
            .as_deref()
            .is_some_and(|s| s.trim() == "running")
    }

    /// Every module referenced anywhere in this thread's call stack.
    pub fn modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.call_stack
            .iter()
            .flat_map(|call| call.flow_stack.iter().map(|flow| flow.mp))
    }
}

/// Decode one step's thread-state text.
pub fn decode_threads(text: &str, step: usize) -> Result<Vec<ThreadState>, TraceError> {
    relaxed::from_str(text).map_err(|reason| TraceError::MalformedThreadState { step, reason })
}

// =============================================================================
// MODULE ACTIVITY
// =============================================================================

/// Present and active module sets of one step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleActivity {
    pub present: ModuleSet,
    pub active: ModuleSet,
}

impl ModuleActivity {
    /// Derive activity from decoded threads.
    #[must_use]
    pub fn observe(threads: &[ThreadState]) -> Self {
        let mut activity = Self::default();
        for thread in threads {
            if let Some(module) = thread.active_module() {
                activity.active.insert(module);
            }
            activity.present.extend(thread.modules());
        }
        activity
    }

    /// Add a module to both sets. Thread-derived entries are kept.
    pub fn inject(&mut self, module: ModuleId) {
        self.present.insert(module);
        self.active.insert(module);
    }

    /// Every module must be below `module_count`.
    pub fn check_range(&self, module_count: usize, step: usize) -> Result<(), TraceError> {
        match self.present.union(&self.active).find(|m| m.index() >= module_count) {
            Some(&module) => Err(TraceError::ModuleOutOfRange {
                step,
                module,
                module_count,
            }),
            None => Ok(()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
