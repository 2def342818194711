//! Metadata files for microdata and table data.

use polars::prelude::*;
use sdc_hierarchy::{Hierarchy, TreeHierarchy};
use sdc_model::{InputData, ModelError, Table};

fn business_survey() -> DataFrame {
    df! {
        "sbi" => ["011", "012", "021"],
        "size" => ["1", "2", "1"],
        "income" => [1200.5, 800.0, 430.25],
        "weight" => [1, 3, 2],
        "holding" => ["H1", "H1", "H2"],
    }
    .unwrap()
}

#[test]
fn microdata_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let hrc = dir.path().join("sbi.hrc");

    let mut sbi = TreeHierarchy::new();
    sbi.create_node(["01", "011"]).unwrap();
    sbi.create_node(["01", "012"]).unwrap();
    sbi.create_node(["02", "021"]).unwrap();
    sbi.write_hrc(&hrc, 3).unwrap();

    let mut input = InputData::microdata(business_survey());
    input.set_hierarchy("sbi", Hierarchy::tree(sbi)).unwrap();
    input.set_total_code("size", "All").unwrap();
    input.set_weight("weight").unwrap();
    input.set_holding("holding").unwrap();
    input.column_mut("income").unwrap().set_decimals(2).unwrap();
    input.column_mut("income").unwrap().set_missing(["-1"]);

    let text = input
        .metadata_text()
        .unwrap()
        .replace(&dir.path().display().to_string(), "<dir>");
    insta::assert_snapshot!(text, @r"
	<SEPARATOR> ,
sbi 3
	<RECODABLE>
	<TOTCODE> Total
	<HIERARCHICAL>
	<HIERCODELIST> <dir>/sbi.hrc
	<HIERLEADSTRING> @
size 1
	<RECODABLE>
	<TOTCODE> All
income 20 -1
	<NUMERIC>
	<DECIMALS> 2
weight 20
	<NUMERIC>
	<WEIGHT>
holding 2
	<HOLDING>
");
}

#[test]
fn request_values_are_quoted() {
    let frame = df! { "id" => [1, 2], "req" => ["1", "0"] }.unwrap();
    let mut input = InputData::microdata(frame);
    input.set_request("req", Vec::new()).unwrap();
    let text = input.metadata_text().unwrap();
    assert!(text.contains("req 1\n\t<REQUEST> \"1\" \"2\"\n"));
}

#[test]
fn tabledata_metadata() {
    let frame = df! {
        "region" => ["A", "B", "Total"],
        "turnover" => [100.0, 250.0, 350.0],
        "n" => [3, 5, 8],
        "top1" => [60.0, 90.0, 90.0],
        "top2" => [20.0, 70.0, 70.0],
        "status" => ["S", "U", "S"],
    }
    .unwrap();
    let table = Table::new(["region"], "turnover");
    let mut input = InputData::tabular(frame, table);
    input.set_total_code("region", "Total").unwrap();
    input.set_frequency("n").unwrap();
    input.set_top_contributors(&["top1", "top2"]).unwrap();
    input.set_status_indicator("status", None).unwrap();

    insta::assert_snapshot!(input.metadata_text().unwrap(), @r"
	<SEPARATOR> ,
	<SAFE> S
	<UNSAFE> U
	<PROTECT> P
region
	<RECODABLE>
	<TOTCODE> Total
turnover
	<NUMERIC>
	<DECIMALS> 15
n
	<NUMERIC>
	<FREQUENCY>
top1
	<NUMERIC>
	<DECIMALS> 15
	<MAXSCORE>
top2
	<NUMERIC>
	<DECIMALS> 15
	<MAXSCORE>
status
	<STATUS>
");
}

#[test]
fn metadata_needs_hierarchy_file() {
    let mut sbi = TreeHierarchy::new();
    sbi.create_node(["01", "011"]).unwrap();
    let mut input = InputData::microdata(business_survey());
    input.set_hierarchy("sbi", Hierarchy::tree(sbi)).unwrap();
    let err = input.metadata_text().unwrap_err();
    assert!(matches!(err, ModelError::HierarchyWithoutFile { column } if column == "sbi"));
}

#[test]
fn write_metadata_records_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("survey.rda");
    let mut input = InputData::microdata(business_survey());
    input.write_metadata(&path).unwrap();
    assert_eq!(input.metadata_path(), Some(path.as_path()));
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("\t<SEPARATOR> ,\nsbi 3\n"));
}
