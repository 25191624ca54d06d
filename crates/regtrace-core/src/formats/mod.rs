//! # Formats Module
//!
//! Text formats found in simulation artifacts:
//! - Header-addressed CSV tables (`table`)
//! - Bracketed list literals inside CSV cells (`list_literal`)
//! - Relaxed object notation for thread state (`relaxed`)
//!
//! File I/O operations are in the app layer; everything here works on
//! readers, writers and strings.

pub mod list_literal;
pub mod relaxed;
mod table;

pub use list_literal::{
    format_f64_list, format_module_set, format_str_list, parse_f64_list, parse_module_set,
    parse_str_list,
};
pub use table::Table;
