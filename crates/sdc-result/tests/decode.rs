//! Reading engine output and masking suppressed cells.

use std::fs;

use polars::prelude::*;
use proptest::prelude::*;
use sdc_model::Table;
use sdc_result::{CellStatus, ResultError, TableResult, decode_status};

const OUTPUT: &str = "\
sbi,income,Status
01,1200,1
02,350.5,9
03,80,11
Total,1630.5,10
";

#[test]
fn reads_output_with_text_codes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.csv");
    fs::write(&path, OUTPUT).unwrap();

    let result = TableResult::read_csv(&path, &["sbi"], "income").unwrap();
    let codes: Vec<Option<&str>> = result
        .frame()
        .column("sbi")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(codes, vec![Some("01"), Some("02"), Some("03"), Some("Total")]);
    assert_eq!(
        result.statuses().unwrap(),
        vec![
            CellStatus::Safe,
            CellStatus::Unsafe,
            CellStatus::SecondaryUnsafe,
            CellStatus::Protected,
        ]
    );
}

#[test]
fn to_dataframe_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.csv");
    fs::write(&path, OUTPUT).unwrap();

    let result = TableResult::read_csv(&path, &["sbi"], "income").unwrap();
    let frame = result.to_dataframe("-").unwrap();
    let names: Vec<&str> = frame
        .get_column_names()
        .into_iter()
        .map(PlSmallStr::as_str)
        .collect();
    assert_eq!(names, vec!["sbi", "safe", "status", "unsafe"]);

    let safe: Vec<Option<&str>> = frame.column("safe").unwrap().str().unwrap().into_iter().collect();
    assert_eq!(safe, vec![Some("1200"), Some("-"), Some("-"), Some("1630.5")]);
    let status: Vec<Option<&str>> = frame.column("status").unwrap().str().unwrap().into_iter().collect();
    assert_eq!(status, vec![Some("S"), Some("U"), Some("M"), Some("P")]);
}

#[test]
fn for_table_uses_output_path_and_frequency_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counts.csv");
    fs::write(&path, "region,Freq,Status\nA,12,1\nB,2,3\n").unwrap();

    let table = Table::frequency(["region"]).with_output_path(&path);
    let result = TableResult::for_table(&table).unwrap();
    assert_eq!(result.response(), "Freq");
    assert_eq!(result.len(), 2);

    let unrun = Table::frequency(["region"]);
    assert!(matches!(
        TableResult::for_table(&unrun),
        Err(ResultError::NoOutputPath)
    ));
}

#[test]
fn unreadable_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.csv");
    let err = TableResult::read_csv(&path, &["sbi"], "income").unwrap_err();
    assert!(matches!(err, ResultError::Read { path: p, .. } if p == path));
}

fn frame_with_statuses(codes: &[i64]) -> DataFrame {
    let labels: Vec<String> = (0..codes.len()).map(|i| format!("c{i}")).collect();
    let values: Vec<f64> = (0..codes.len()).map(|i| i as f64 * 1.5).collect();
    df! {
        "cell" => labels,
        "value" => values,
        "Status" => codes.to_vec(),
    }
    .unwrap()
}

proptest! {
    #[test]
    fn decoding_never_fails(code in any::<i64>()) {
        let status = decode_status(code);
        prop_assert_eq!(status == CellStatus::Unknown, !matches!(code, 1..=6 | 9..=14));
    }

    #[test]
    fn masking_is_repeatable_and_leaves_raw_values(codes in prop::collection::vec(0i64..16, 0..20)) {
        let frame = frame_with_statuses(&codes);
        let result = TableResult::new(frame.clone(), vec!["cell".into()], "value").unwrap();

        let first = result.masked_values("x").unwrap();
        let second = result.masked_values("x").unwrap();
        prop_assert!(first.equals(&second));
        prop_assert!(result.raw_values().unwrap().equals(frame.column("value").unwrap().as_materialized_series()));
        prop_assert!(result.frame().equals(&frame));

        let masked = first.str().unwrap().into_iter().filter(|value| *value == Some("x")).count();
        let suppressed = codes.iter().filter(|code| decode_status(**code).is_suppressed()).count();
        prop_assert_eq!(masked, suppressed);
    }
}
