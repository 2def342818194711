use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sdc_batch::{BatchCommand, Job, render_batch};
use sdc_cli::load_job;
use sdc_hierarchy::TreeHierarchy;
use sdc_model::Recode;
use sdc_result::TableResult;
use serde::Serialize;
use tracing::{info, info_span};

use crate::cli::{DecodeArgs, HierarchyArgs, JobArgs};

/// A file the engine reads or writes for a compiled job.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub kind: &'static str,
    pub subject: String,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct CompileResult {
    pub job: Job,
    pub commands: Vec<BatchCommand>,
    pub artifacts: Vec<Artifact>,
}

impl CompileResult {
    pub fn script(&self) -> String {
        render_batch(&self.commands)
    }
}

pub fn run_compile(args: &JobArgs) -> Result<CompileResult> {
    let mut job = load_job(&args.job)?;
    let span = info_span!("compile", job = %job.name());
    let _guard = span.enter();
    job.setup()
        .with_context(|| format!("set up job {}", job.name()))?;
    let commands = job.commands()?;
    let artifacts = collect_artifacts(&job);
    info!(
        commands = commands.len(),
        artifacts = artifacts.len(),
        batch = %job.batch_path().display(),
        "compiled job"
    );
    Ok(CompileResult {
        job,
        commands,
        artifacts,
    })
}

/// Consistency problems of the job; empty when it can be compiled.
pub fn run_check(args: &JobArgs) -> Result<(Job, Vec<String>)> {
    let job = load_job(&args.job)?;
    let problems = job.problems();
    info!(job = %job.name(), problems = problems.len(), "checked job");
    Ok((job, problems))
}

pub fn run_decode(args: &DecodeArgs) -> Result<TableResult> {
    TableResult::read_csv(&args.path, args.index.as_slice(), &args.response)
        .with_context(|| format!("decode {}", args.path.display()))
}

pub fn run_hierarchy(args: &HierarchyArgs) -> Result<TreeHierarchy> {
    TreeHierarchy::read_hrc(&args.path, &args.indent, &args.total)
        .with_context(|| format!("read {}", args.path.display()))
}

fn collect_artifacts(job: &Job) -> Vec<Artifact> {
    let mut artifacts = Vec::new();
    let mut push = |kind: &'static str, subject: &str, path: Option<&Path>| {
        if let Some(path) = path {
            artifacts.push(Artifact {
                kind,
                subject: subject.to_string(),
                path: path.to_path_buf(),
            });
        }
    };

    let input = job.input();
    push("data", input.kind_name(), input.data_path());
    push("metadata", input.kind_name(), input.metadata_path());
    for column in input.columns() {
        push(
            "hierarchy",
            column.name(),
            column.hierarchy().as_tree().and_then(TreeHierarchy::filepath),
        );
        push(
            "codelist",
            column.name(),
            column.codelist().and_then(|codelist| codelist.filepath()),
        );
    }
    for (name, table) in job.tables() {
        push(
            "apriori",
            name,
            table.overrides.as_ref().and_then(|overrides| overrides.filepath()),
        );
        for (variable, recode) in &table.recodes {
            let path = match recode {
                Recode::File(path) => Some(path.as_path()),
                Recode::Tree(tree) => tree.filepath(),
                Recode::Level(_) => None,
            };
            push("recode", &format!("{name}.{variable}"), path);
        }
        push("output", name, table.output_path.as_deref());
    }
    let batch = job.batch_path();
    push("batch", job.name(), Some(&batch));
    if let Some(logbook) = job.logbook_path() {
        push("logbook", job.name(), Some(&logbook));
    }
    artifacts
}
