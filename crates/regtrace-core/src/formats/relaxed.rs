//! # Relaxed Object Notation
//!
//! The simulation dumps thread state in Hjson-style notation: keys and
//! scalar values are unquoted, and trailing commas may appear before a
//! closing bracket.
//!
//! ```text
//! [{id:0,state:running,call_stack:[{flow_stack:[{type:basic,mp:2,inst_name:Nop,},],}],}]
//! ```
//!
//! Hjson ends a quoteless value at the line break, so the dump is first
//! laid out one member per line and then handed to `deser_hjson`.

use serde::de::DeserializeOwned;

/// Put every member and every closing bracket on its own line.
fn one_member_per_line(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        match c {
            ',' => out.push('\n'),
            '}' | ']' => {
                out.push('\n');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Decode relaxed notation into `T`.
///
/// Returns the parser's message on failure.
pub fn from_str<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    deser_hjson::from_str(&one_member_per_line(text)).map_err(|e| e.to_string())
}
