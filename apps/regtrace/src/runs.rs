//! # Run Discovery
//!
//! Locates run directories and the artifacts inside them.
//!
//! ```text
//! <data_dir>/<..RUN_..>/output/run_config.csv
//!                              analysis_org_<id>_update_<u>.csv
//!                              trace_org_<id>_update_<u>.csv
//! ```
//!
//! The organism analysis and trace are taken from the newest update at or
//! below an optional limit. Both must come from the same update.

use regtrace_core::TraceError;
use regtrace_core::primitives::{
    ANALYSIS_FILE_MARKER, OUTPUT_SUBDIR, RUN_CONFIG_FILE, RUN_ID_MARKER, TRACE_FILE_MARKER,
    UPDATE_MARKER,
};
use std::path::{Path, PathBuf};

/// Files of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifacts {
    pub run_dir: PathBuf,
    pub config: PathBuf,
    pub analysis: PathBuf,
    pub trace: PathBuf,
    /// Update both the analysis and the trace were taken from.
    pub update: u64,
}

impl RunArtifacts {
    /// Directory name of the run, for log and error messages.
    #[must_use]
    pub fn label(&self) -> String {
        self.run_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.run_dir.display().to_string())
    }
}

/// Marker preceding the update in per-run output file names.
const OUTPUT_UPDATE_MARKER: &str = "_update-";

fn read_dir_names(dir: &Path) -> Result<Vec<String>, TraceError> {
    if !dir.is_dir() {
        return Err(TraceError::MissingFile(dir.display().to_string()));
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

/// Trailing `_<n>` of a directory name (`RUN_C0_12` gives 12).
fn trailing_number(path: &Path) -> Option<u64> {
    path.file_name()?
        .to_str()?
        .rsplit('_')
        .next()?
        .parse()
        .ok()
}

/// Every run directory under `data_dirs`, ordered by trailing number.
/// Names without one sort first, by path.
pub fn discover_runs(data_dirs: &[PathBuf], identifier: &str) -> Result<Vec<PathBuf>, TraceError> {
    let mut runs = Vec::new();
    for data_dir in data_dirs {
        for name in read_dir_names(data_dir)? {
            let path = data_dir.join(&name);
            if name.contains(identifier) && path.is_dir() {
                runs.push(path);
            }
        }
    }
    runs.sort_by_key(|path| (trailing_number(path), path.clone()));
    Ok(runs)
}

/// Update encoded in an artifact file name (`..._update_1000.csv` gives 1000).
#[must_use]
pub fn artifact_update(file_name: &str) -> Option<u64> {
    file_name
        .rsplit(UPDATE_MARKER)
        .next()?
        .split('.')
        .next()?
        .parse()
        .ok()
}

/// Newest artifact carrying `marker` whose update is at or below `limit`.
pub fn newest_artifact(
    output_dir: &Path,
    marker: &str,
    limit: Option<u64>,
) -> Result<Option<(PathBuf, u64)>, TraceError> {
    let newest = read_dir_names(output_dir)?
        .into_iter()
        .filter(|name| name.contains(marker))
        .filter_map(|name| artifact_update(&name).map(|update| (name, update)))
        .filter(|(_, update)| limit.is_none_or(|limit| *update <= limit))
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    Ok(newest.map(|(name, update)| (output_dir.join(name), update)))
}

/// Locate the config, analysis and trace of one run.
pub fn locate_artifacts(run_dir: &Path, update_limit: Option<u64>) -> Result<RunArtifacts, TraceError> {
    let output_dir = run_dir.join(OUTPUT_SUBDIR);
    let config = output_dir.join(RUN_CONFIG_FILE);
    if !config.is_file() {
        return Err(TraceError::MissingFile(config.display().to_string()));
    }

    let missing = |marker: &str| {
        TraceError::MissingFile(format!(
            "{}/{}*{}",
            output_dir.display(),
            marker,
            update_limit.map_or(String::new(), |u| format!(" (update <= {})", u))
        ))
    };
    let (analysis, analysis_update) = newest_artifact(&output_dir, ANALYSIS_FILE_MARKER, update_limit)?
        .ok_or_else(|| missing(ANALYSIS_FILE_MARKER))?;
    let (trace, trace_update) = newest_artifact(&output_dir, TRACE_FILE_MARKER, update_limit)?
        .ok_or_else(|| missing(TRACE_FILE_MARKER))?;

    if analysis_update != trace_update {
        return Err(TraceError::ConsistencyCheck(format!(
            "{}: analysis is from update {} but trace is from update {}",
            run_dir.display(),
            analysis_update,
            trace_update
        )));
    }

    Ok(RunArtifacts {
        run_dir: run_dir.to_path_buf(),
        config,
        analysis,
        trace,
        update: analysis_update,
    })
}

/// Run id of a per-run output file (`reg-graph_update-5_run-id-7.csv` gives 7).
#[must_use]
pub fn output_run_id(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_suffix(".csv").unwrap_or(file_name);
    let (_, run_id) = stem.rsplit_once(RUN_ID_MARKER)?;
    (!run_id.is_empty()).then_some(run_id)
}

/// Update of a per-run output file (`trace-exec_update-5_run-id-7.csv` gives 5).
#[must_use]
pub fn output_update(file_name: &str) -> Option<&str> {
    let (_, rest) = file_name.split_once(OUTPUT_UPDATE_MARKER)?;
    let (update, _) = rest.split_once('_')?;
    (!update.is_empty()).then_some(update)
}

/// Per-run output files in `dir` whose name starts with `marker`, ordered
/// by name.
pub fn discover_outputs(dir: &Path, marker: &str) -> Result<Vec<PathBuf>, TraceError> {
    let mut tables: Vec<PathBuf> = read_dir_names(dir)?
        .into_iter()
        .filter(|name| name.starts_with(marker) && name.ends_with(".csv"))
        .map(|name| dir.join(name))
        .collect();
    tables.sort();
    Ok(tables)
}
