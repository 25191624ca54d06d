//! Bracketed list literals (`[0.5,-1,2]`) embedded in CSV cells.
//!
//! The simulation writes per-module vectors this way, and the event table
//! writes module sets and delta vectors back out in the same shape so that
//! simple comma-delimited readers keep working once the cell is quoted.

use crate::{ModuleId, ModuleSet, TraceError};

/// Strip the surrounding brackets of a list literal.
fn list_body<'a>(raw: &'a str, field: &str, step: usize) -> Result<&'a str, TraceError> {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| TraceError::MalformedList {
            field: field.to_string(),
            step,
            reason: format!("expected '[...]', found '{}'", trimmed),
        })
}

/// Parse a list of floats. `[]` is the empty list; empty elements are errors.
pub fn parse_f64_list(raw: &str, field: &str, step: usize) -> Result<Vec<f64>, TraceError> {
    let body = list_body(raw, field, step)?;
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    body.split(',')
        .map(|item| {
            let item = item.trim();
            item.parse::<f64>().map_err(|_| TraceError::MalformedList {
                field: field.to_string(),
                step,
                reason: format!("'{}' is not a number", item),
            })
        })
        .collect()
}

/// Parse a set of module ids. Empty elements are skipped.
pub fn parse_module_set(raw: &str, field: &str, step: usize) -> Result<ModuleSet, TraceError> {
    let body = list_body(raw, field, step)?;
    let mut set = ModuleSet::new();
    for item in body.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let id = item.parse::<u32>().map_err(|_| TraceError::MalformedList {
            field: field.to_string(),
            step,
            reason: format!("'{}' is not a module id", item),
        })?;
        set.insert(ModuleId(id));
    }
    Ok(set)
}

/// Parse a list of bare names. Empty elements are skipped.
pub fn parse_str_list<'a>(raw: &'a str, field: &str, step: usize) -> Result<Vec<&'a str>, TraceError> {
    let body = list_body(raw, field, step)?;
    Ok(body.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
}

/// Format floats as `[a,b,c]`, keeping enough digits to read back the same value.
#[must_use]
pub fn format_f64_list(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().map(|v| format!("{:?}", v)).collect();
    format!("[{}]", items.join(","))
}

/// Format a module set as `[a,b,c]` in ascending order.
#[must_use]
pub fn format_module_set(set: &ModuleSet) -> String {
    let items: Vec<String> = set.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(","))
}

/// Format plain strings as `[a,b,c]`.
#[must_use]
pub fn format_str_list<S: AsRef<str>>(items: &[S]) -> String {
    let items: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
    format!("[{}]", items.join(","))
}
