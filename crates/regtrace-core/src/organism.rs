//! # Organism Summary
//!
//! One row per run: the final organism of the analysis table, knockout
//! results, run facts and the run configuration, under a header shared by
//! every run.
//!
//! ```text
//! sorted analysis fields | knockout fields, update, [task], calls_with_* | sorted config fields
//! ```
//!
//! Excluded fields are dropped from their section, and names claimed by the
//! middle section are dropped from both outer ones. A run whose header
//! differs from the first run's is rejected.

use crate::formats::Table;
use crate::knockout::KnockoutProfile;
use crate::run_config::RunConfig;
use crate::TraceError;
use csv::Writer;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

/// Facts about a run that do not come from its analysis or config tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFacts {
    /// Update the organism was taken from.
    pub update: String,
    pub calls_with_promoters: usize,
    pub calls_with_repressors: usize,
}

/// Accumulates organism summary rows across runs.
#[derive(Debug, Clone)]
pub struct OrganismSummaryBuilder {
    knockouts: KnockoutProfile,
    field_exclude: BTreeSet<String>,
    config_exclude: BTreeSet<String>,
    task_param: Option<String>,
    header: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
}

impl OrganismSummaryBuilder {
    #[must_use]
    pub fn new(knockouts: KnockoutProfile) -> Self {
        Self {
            knockouts,
            field_exclude: BTreeSet::new(),
            config_exclude: BTreeSet::new(),
            task_param: None,
            header: None,
            rows: Vec::new(),
        }
    }

    /// Analysis fields left out of the summary.
    #[must_use]
    pub fn field_exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_exclude = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Config parameters left out of the summary.
    #[must_use]
    pub fn config_exclude<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config_exclude = params.into_iter().map(Into::into).collect();
        self
    }

    /// Derive a `task` column from a config parameter naming a data file
    /// (`training_set_nand.csv` gives `nand`).
    #[must_use]
    pub fn task_param(mut self, param: Option<String>) -> Self {
        self.task_param = param;
        self
    }

    /// Middle section column names.
    #[must_use]
    pub fn extra_fields(&self) -> Vec<String> {
        let mut fields = self.knockouts.fields();
        fields.push("update".to_string());
        if self.task_param.is_some() {
            fields.push("task".to_string());
        }
        fields.push("calls_with_promoters".to_string());
        fields.push("calls_with_repressors".to_string());
        fields
    }

    /// Add one run. `run` labels errors.
    pub fn add_run(
        &mut self,
        run: &str,
        analysis: &Table,
        config: &RunConfig,
        facts: &RunFacts,
    ) -> Result<(), TraceError> {
        let organism = analysis.last_row().ok_or_else(|| {
            TraceError::ConsistencyCheck(format!("{}: analysis table has no organisms", run))
        })?;
        let organism_step = analysis.len().saturating_sub(1);

        let extras = self.extra_fields();
        let claimed: BTreeSet<&str> = extras.iter().map(String::as_str).collect();

        let mut analysis_fields: Vec<&str> = organism
            .keys()
            .map(String::as_str)
            .filter(|f| !self.field_exclude.contains(*f) && !claimed.contains(f))
            .collect();
        analysis_fields.sort_unstable();
        let config_fields: Vec<&str> = config
            .iter()
            .map(|(k, _)| k)
            .filter(|k| !self.config_exclude.contains(*k) && !claimed.contains(k))
            .collect();

        let header: Vec<String> = analysis_fields
            .iter()
            .copied()
            .chain(extras.iter().map(String::as_str))
            .chain(config_fields.iter().copied())
            .map(str::to_string)
            .collect();
        match &self.header {
            Some(expected) if expected != &header => {
                return Err(TraceError::HeaderMismatch(format!(
                    "{}: {} columns, expected {}",
                    run,
                    header.len(),
                    expected.len()
                )));
            }
            Some(_) => {}
            None => self.header = Some(header),
        }

        let mut row: Vec<String> = analysis_fields
            .iter()
            .map(|f| organism.get(*f).cloned().unwrap_or_default())
            .collect();
        row.extend(self.knockouts.evaluate(&organism, organism_step)?);
        row.push(facts.update.clone());
        if let Some(param) = &self.task_param {
            row.push(task_name(config.require(param)?));
        }
        row.push(facts.calls_with_promoters.to_string());
        row.push(facts.calls_with_repressors.to_string());
        row.extend(
            config_fields
                .iter()
                .map(|k| config.get(k).unwrap_or_default().to_string()),
        );
        self.rows.push(row);
        Ok(())
    }

    #[must_use]
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the summary table. Nothing is written when no run was added.
    pub fn write<W: Write>(&self, writer: W) -> Result<usize, TraceError> {
        let Some(header) = &self.header else {
            return Ok(0);
        };
        let mut csv_writer = Writer::from_writer(writer);
        csv_writer.write_record(header)?;
        for row in &self.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(self.rows.len())
    }
}

/// Last `_`-separated part of a file stem.
fn task_name(path: &str) -> String {
    let stem = Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path);
    stem.rsplit('_').next().unwrap_or(stem).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::knockout::KnockoutSpec;

    fn knockouts() -> KnockoutProfile {
        KnockoutProfile {
            base_score_field: "score".to_string(),
            knockouts: vec![KnockoutSpec {
                name: "regulation".to_string(),
                score_field: "score_ko_regulation".to_string(),
            }],
            conjunctions: Vec::new(),
        }
    }

    fn analysis(text: &str) -> Table {
        Table::from_reader("analysis", text.as_bytes()).expect("analysis")
    }

    fn config(text: &str) -> RunConfig {
        RunConfig::from_reader("run_config", text.as_bytes()).expect("config")
    }

    fn facts() -> RunFacts {
        RunFacts {
            update: "1000".to_string(),
            calls_with_promoters: 3,
            calls_with_repressors: 1,
        }
    }

    const ANALYSIS: &str = "update,score,score_ko_regulation,program,num_modules\n\
                            10,1,1,x,2\n\
                            1000,5,2,\"a,b\",4\n";
    const CONFIG: &str = "parameter,value\nSEED,7\nOUTPUT_DIR,out\nTRAINING_SET_FILE,data/training_set_nand.csv\n";

    #[test]
    fn builds_header_and_row() {
        let mut builder = OrganismSummaryBuilder::new(knockouts())
            .field_exclude(["program"])
            .config_exclude(["OUTPUT_DIR"])
            .task_param(Some("TRAINING_SET_FILE".to_string()));
        builder
            .add_run("RUN_7", &analysis(ANALYSIS), &config(CONFIG), &facts())
            .expect("add");

        assert_eq!(
            builder.header().expect("header"),
            [
                "num_modules",
                "score",
                "score_ko_regulation",
                "relies_on_regulation",
                "ko_regulation_delta",
                "update",
                "task",
                "calls_with_promoters",
                "calls_with_repressors",
                "SEED",
                "TRAINING_SET_FILE",
            ]
        );

        let mut out = Vec::new();
        assert_eq!(builder.write(&mut out).expect("write"), 1);
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(
            text.lines().nth(1).expect("row"),
            "4,5,2,1,3.0,1000,nand,3,1,7,data/training_set_nand.csv"
        );
    }

    #[test]
    fn header_mismatch_across_runs() {
        let mut builder = OrganismSummaryBuilder::new(knockouts());
        builder
            .add_run("RUN_1", &analysis(ANALYSIS), &config(CONFIG), &facts())
            .expect("first");
        let other = config("parameter,value\nSEED,8\n");
        assert!(matches!(
            builder.add_run("RUN_2", &analysis(ANALYSIS), &other, &facts()),
            Err(TraceError::HeaderMismatch(_))
        ));
    }

    #[test]
    fn empty_analysis_is_rejected() {
        let mut builder = OrganismSummaryBuilder::new(knockouts());
        let empty = analysis("update,score,score_ko_regulation\n");
        assert!(matches!(
            builder.add_run("RUN_1", &empty, &config(CONFIG), &facts()),
            Err(TraceError::ConsistencyCheck(_))
        ));
        let mut out = Vec::new();
        assert_eq!(builder.write(&mut out).expect("write"), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn task_names() {
        assert_eq!(task_name("training_set_nand.csv"), "nand");
        assert_eq!(task_name("./sets/echo.csv"), "echo");
    }
}
