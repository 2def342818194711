//! Setting up jobs on disk and the batch files they produce.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use sdc_batch::{Job, JobError, Logbook, RunReport, Runner};
use sdc_hierarchy::{Hierarchy, TreeHierarchy, TreeRecode};
use sdc_model::{
    CellOverrides, InputData, OverrideStatus, Recode, SafetyRuleSpec, SuppressMethod,
    Suppression, Table,
};

fn regions() -> TreeHierarchy {
    let mut tree = TreeHierarchy::new();
    tree.create_node(["North", "A"]).unwrap();
    tree.create_node(["North", "B"]).unwrap();
    tree
}

fn survey() -> InputData {
    let frame = df! {
        "region" => ["A", "B", "A", "B"],
        "size" => ["1", "2", "2", "1"],
        "amount" => [10.0, 20.5, 30.0, 5.0],
    }
    .unwrap();
    let mut input = InputData::microdata(frame);
    input
        .set_hierarchy("region", Hierarchy::tree(regions()))
        .unwrap();
    input.set_total_code("size", "All").unwrap();
    input
}

fn amount_by_region() -> Table {
    Table::new(["region"], "amount")
        .with_safety_rule(SafetyRuleSpec::parse("FREQ(3,20)"))
        .with_suppression(Suppression::with_default_args(SuppressMethod::Hypercube))
}

fn read_script(job: &Job) -> String {
    fs::read_to_string(job.batch_path())
        .unwrap()
        .replace(&job.directory().display().to_string(), "<dir>")
}

fn keywords(script: &str) -> Vec<&str> {
    script
        .lines()
        .map(|line| line.split('\t').next().unwrap_or_default())
        .collect()
}

#[test]
fn microdata_job_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = Job::new(survey(), dir.path(), "survey");
    job.add_table(amount_by_region());
    job.setup().unwrap();

    let script = read_script(&job);
    insta::assert_snapshot!(script, @r#"
    <OPENMICRODATA>	"<dir>/input/survey_microdata.csv"
    <OPENMETADATA>	"<dir>/input/survey_microdata.rda"
    <SPECIFYTABLE>	"region"|"amount"||
    <SAFETYRULE>	FREQ(3,20)
    <READMICRODATA>
    <SUPPRESS>	GH(1,0,1)
    <WRITETABLE>	(1, 2, AS+, "<dir>/output/survey_table-1.csv")
    "#);

    let hrc = dir.path().join("input/survey_region_hierarchy.hrc");
    assert_eq!(fs::read_to_string(&hrc).unwrap(), "North\n@    A\n@    B\n");

    let metadata = fs::read_to_string(dir.path().join("input/survey_microdata.rda")).unwrap();
    assert!(metadata.contains(&format!("\t<HIERCODELIST> {}\n", hrc.display())));
    assert!(dir.path().join("input/survey_microdata.csv").is_file());
    assert!(dir.path().join("output").is_dir());
    assert!(job.workdir().is_dir());
}

#[test]
fn setup_twice_keeps_existing_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = Job::new(survey(), dir.path(), "survey");
    job.add_table(amount_by_region());
    job.setup().unwrap();
    let first = read_script(&job);

    let hrc = dir.path().join("input/survey_region_hierarchy.hrc");
    fs::write(&hrc, "edited by hand\n").unwrap();

    job.setup().unwrap();
    assert_eq!(fs::read_to_string(&hrc).unwrap(), "edited by hand\n");
    assert_eq!(read_script(&job), first);
}

#[test]
fn caller_supplied_paths_win() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("my-data.csv");
    fs::write(&data, "A,1,10\n").unwrap();

    let mut input = survey();
    input.set_data_path(&data);
    let table = amount_by_region().with_output_path(dir.path().join("result.csv"));
    let mut job = Job::new(input, dir.path(), "survey")
        .with_table("amounts", table)
        .unwrap();
    job.setup().unwrap();

    let script = read_script(&job);
    assert!(script.starts_with("<OPENMICRODATA>\t\"<dir>/my-data.csv\"\n"));
    assert!(script.contains("(1, 2, AS+, \"<dir>/result.csv\")"));
    assert!(!dir.path().join("input/survey_microdata.csv").exists());
    assert_eq!(fs::read_to_string(&data).unwrap(), "A,1,10\n");
}

#[test]
fn commands_follow_engine_order() {
    let dir = tempfile::tempdir().unwrap();

    let mut overrides = CellOverrides::new();
    overrides.change_status(["A"], OverrideStatus::Safe);
    let first = amount_by_region()
        .with_overrides(overrides)
        .with_recode("region", Recode::Level(1));
    let second = Table::frequency(["region", "size"])
        .with_recode("region", Recode::Tree(TreeRecode::new(["North"])))
        .with_safety_rule(SafetyRuleSpec::parse("FREQ(3, 20)").with_holding("FREQ(2, 10)"));

    let mut job = Job::new(survey(), dir.path(), "survey")
        .with_table("Amounts", first)
        .unwrap()
        .with_table("Counts", second)
        .unwrap()
        .with_linked_suppression(Suppression::with_default_args(SuppressMethod::Modular))
        .with_interactive(true);
    job.setup().unwrap();

    let script = read_script(&job);
    assert_eq!(
        keywords(&script),
        vec![
            "<OPENMICRODATA>",
            "<OPENMETADATA>",
            "<SPECIFYTABLE>",
            "<SAFETYRULE>",
            "<SPECIFYTABLE>",
            "<SAFETYRULE>",
            "<READMICRODATA>",
            "<APRIORI>",
            "<RECODE>",
            "<SUPPRESS>",
            "<RECODE>",
            "<SUPPRESS>",
            "<WRITETABLE>",
            "<WRITETABLE>",
            "<GOINTERACTIVE>",
        ]
    );

    let lines: Vec<&str> = script.lines().collect();
    assert_eq!(
        lines[7],
        "<APRIORI>\t\"<dir>/input/survey_amounts_apriori.hst\", 1, \",\", 0, 1"
    );
    assert_eq!(lines[8], "<RECODE>\t1, \"region\", 1");
    assert_eq!(
        lines[10],
        "<RECODE>\t2, \"region\", \"<dir>/input/survey_counts_region.grc\""
    );
    assert_eq!(lines[11], "<SUPPRESS>\tMOD(0,5,1,1,1)");
    assert_eq!(lines[5], "<SAFETYRULE>\tFREQ(3, 20)|FREQ(2, 10)");
    assert_eq!(lines[4], "<SPECIFYTABLE>\t\"region\"\"size\"|\"<freq>\"||");
    assert_eq!(
        lines[13],
        "<WRITETABLE>\t(2, 2, AS+, \"<dir>/output/survey_counts.csv\")"
    );

    let apriori = dir.path().join("input/survey_amounts_apriori.hst");
    assert_eq!(fs::read_to_string(apriori).unwrap(), "A,s\n");
    assert!(dir.path().join("input/survey_counts_region.grc").is_file());
}

#[test]
fn table_data_uses_its_own_table() {
    let dir = tempfile::tempdir().unwrap();
    let frame = df! {
        "region" => ["A", "B", "Total"],
        "turnover" => [100.0, 250.0, 350.0],
        "n" => [3, 5, 8],
    }
    .unwrap();
    let table = Table::new(["region"], "turnover")
        .with_safety_rule(SafetyRuleSpec::parse("NK(3, 70)"));
    let mut input = InputData::tabular(frame, table);
    input.set_total_code("region", "Total").unwrap();
    input.set_frequency("n").unwrap();

    let mut job = Job::new(input, dir.path(), "turnover");
    job.setup().unwrap();

    let script = read_script(&job);
    assert_eq!(
        keywords(&script),
        vec![
            "<OPENTABLEDATA>",
            "<OPENMETADATA>",
            "<SPECIFYTABLE>",
            "<SAFETYRULE>",
            "<READTABLE>",
            "<WRITETABLE>",
        ]
    );
    assert!(script.contains("<OPENTABLEDATA>\t\"<dir>/input/turnover_tabledata.csv\""));
    assert!(script.contains("\"<dir>/output/turnover_table-1.csv\""));
    assert_eq!(
        job.table("table-1").and_then(|table| table.output_path.clone()),
        Some(dir.path().join("output/turnover_table-1.csv"))
    );
}

#[test]
fn inconsistent_job_writes_no_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = Job::new(survey(), dir.path(), "survey");
    job.add_table(Table::new(["region", "sector"], "size"));

    let err = job.setup().unwrap_err();
    assert_eq!(
        err.problems(),
        [
            "Variable sector not present in input data.",
            "Variable size not numeric.",
        ]
    );
    assert!(!job.batch_path().exists());
}

#[test]
fn too_many_rules_name_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let table = amount_by_region().with_safety_rule(SafetyRuleSpec::parse("P(10)|P(15)|P(20)"));
    let mut job = Job::new(survey(), dir.path(), "survey")
        .with_table("amounts", table)
        .unwrap();

    let err = job.setup().unwrap_err();
    assert!(matches!(err, JobError::Rule { ref table, .. } if table == "amounts"));
}

#[test]
fn job_without_tables_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = Job::new(survey(), dir.path(), "survey");
    assert!(matches!(job.setup(), Err(JobError::NoTables)));
}

/// Stands in for the engine: records its arguments and writes a logbook.
struct FakeEngine {
    exit_code: i32,
    calls: RefCell<Vec<(PathBuf, Option<PathBuf>, Option<PathBuf>)>>,
}

impl FakeEngine {
    fn new(exit_code: i32) -> Self {
        Self {
            exit_code,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl Runner for FakeEngine {
    fn run(
        &self,
        batch: &Path,
        logbook: Option<&Path>,
        workdir: Option<&Path>,
    ) -> sdc_batch::Result<RunReport> {
        self.calls.borrow_mut().push((
            batch.to_path_buf(),
            logbook.map(Path::to_path_buf),
            workdir.map(Path::to_path_buf),
        ));
        if let Some(logbook) = logbook {
            fs::write(logbook, "Start of batch procedure\nEnd of TauArgus run\n").unwrap();
        }
        RunReport::collect(Some(self.exit_code), logbook.map(Path::to_path_buf))
    }
}

#[test]
fn run_hands_files_to_the_runner() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = Job::new(survey(), dir.path(), "survey");
    job.add_table(amount_by_region());

    let engine = FakeEngine::new(0);
    let report = job.run(&engine).unwrap();
    assert!(report.is_success());
    assert_eq!(
        report.logbook().map(<[String]>::len),
        Some(2)
    );

    let calls = engine.calls.borrow();
    let (batch, logbook, workdir) = &calls[0];
    assert_eq!(batch, &job.batch_path());
    assert_eq!(logbook.as_deref(), Some(dir.path().join("survey_logbook.txt").as_path()));
    assert_eq!(workdir.as_deref(), Some(job.workdir().as_path()));
}

#[test]
fn failed_run_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = Job::new(survey(), dir.path(), "survey").with_logbook(Logbook::Disabled);
    job.add_table(amount_by_region());

    let err = job.run(&FakeEngine::new(3)).unwrap_err();
    match err {
        JobError::EngineFailed(report) => {
            assert_eq!(report.exit_code(), Some(3));
            assert!(report.logbook().is_none());
        }
        other => panic!("unexpected error: {other}"),
    }
}
