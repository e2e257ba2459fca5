use merge_core::persist::{load_json, save_json};
use merge_core::MergeConfig;
use merger::{merge_summary, parse_assignment, run_courselets, run_csv, run_merge, run_report, CsvOptions};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn content(dir: &Path) -> PathBuf {
    let path = dir.join("waves.json");
    save_json(
        &path,
        &json!([
            {"kind": "question", "rustID": "w-1", "title": "What sets the pitch of a sound",
             "answer": ["its frequency"], "tests": "Pitch,Sound_waves",
             "error": ["louder sounds have higher pitch"]}
        ]),
    )
    .unwrap();
    path
}

fn legacy(dir: &Path) -> PathBuf {
    let path = dir.join("legacy.json");
    save_json(
        &path,
        &json!({"questions": [[
            {"question_id": 5, "title": "What sets the pitch of a sound?", "date_added": "2011-09-01",
             "errors": [{"error_id": 3, "belief": "louder sounds have a higher pitch"}],
             "responses": [{"username": "kim", "answer": "loudness", "errors": [{"error_id": 3}]}]}
        ]]}),
    )
    .unwrap();
    path
}

#[test]
fn merge_writes_merged_file_and_report() {
    let dir = tempdir().unwrap();
    let src = content(dir.path());
    let old = legacy(dir.path());
    let report_path = dir.path().join("out").join("report.json");

    let (written, report) = run_merge(&old, &[src], MergeConfig::default(), Some(&report_path)).unwrap();
    assert_eq!(written, vec![dir.path().join("wavesmerge.json")]);
    assert_eq!(report.count(merge_core::Severity::Skipped), 0);

    let merged: Vec<Value> = load_json(&written[0]).unwrap();
    assert_eq!(merged[0]["responses"][0]["username"], json!("kim"));
    assert_eq!(merged[0]["responses"][0]["errors"][0]["error_id"], json!(0));
    assert_eq!(merged[0]["answer"], json!("its frequency"));
    assert_eq!(merged[0]["tests"], json!(["Pitch", "Sound waves"]));

    let dump: Value = load_json(&report_path).unwrap();
    assert!(dump["generated_at"].as_str().is_some_and(|s| !s.is_empty()));
    let issues = dump["issues"].as_array().unwrap();
    let copied = issues.iter().find(|i| i["reason"] == json!("copied")).unwrap();
    assert_eq!(copied["responses"], json!(1));
    // five of the six title phrases survive the trailing "?"
    assert!((copied["fraction"].as_f64().unwrap() - 5.0 / 6.0).abs() < 1e-9);
}

#[test]
fn courselets_then_csv_export() {
    let dir = tempdir().unwrap();
    let src = content(dir.path());
    let old = legacy(dir.path());
    let (written, _) = run_merge(&old, &[src], MergeConfig::default(), None).unwrap();
    let merged = written[0].clone();

    let titles = dir.path().join("titles.json");
    let errors = dir.path().join("errors.json");
    save_json(&titles, &json!([[31, "What sets the pitch of a sound"]])).unwrap();
    save_json(&errors, &json!([[77, "Pitch", "louder sounds have higher pitch"]])).unwrap();
    let (counts, report) = run_courselets(&titles, &errors, &[merged.clone()]).unwrap();
    assert_eq!((counts.titles, counts.errors), (1, 1));
    assert!(report.is_clean());

    let enriched: Vec<Value> = load_json(&merged).unwrap();
    assert_eq!(enriched[0]["courseletsUL"], json!(31));
    assert_eq!(enriched[0]["courseletsError"], json!({"0": 77}));

    let opts = CsvOptions {
        columns: vec!["q.courseletsUL".into(), "r.username".into(), "errors.0.status".into()],
        header: true,
        ..Default::default()
    };
    let (out, _) = run_csv(&merged, &opts).unwrap();
    assert_eq!(out, dir.path().join("wavesmerge.csv"));
    let text = std::fs::read_to_string(out).unwrap();
    assert_eq!(text, "q.courseletsUL,r.username,errors.0.status\n31,kim,1\n");
}

#[test]
fn csv_set_values_land_in_their_columns() {
    let dir = tempdir().unwrap();
    let src = content(dir.path());
    let old = legacy(dir.path());
    let (written, _) = run_merge(&old, &[src], MergeConfig::default(), None).unwrap();

    let extra = ["term=fall-2012", "cohort=4", "q={\"rustID\": \"renamed\"}"]
        .iter()
        .map(|a| parse_assignment(a).unwrap())
        .collect();
    let opts = CsvOptions {
        columns: vec!["q.rustID".into(), "r.username".into(), "term".into(), "cohort".into()],
        extra,
        header: false,
        ..Default::default()
    };
    let (out, _) = run_csv(&written[0], &opts).unwrap();
    let text = std::fs::read_to_string(out).unwrap();
    assert_eq!(text, "renamed,kim,fall-2012,4\n");
}

#[test]
fn assignments_need_a_key() {
    assert_eq!(parse_assignment("cohort=4").unwrap(), ("cohort".to_string(), json!(4)));
    assert_eq!(parse_assignment("note=a=b").unwrap(), ("note".to_string(), json!("a=b")));
    assert!(parse_assignment("=4").is_err());
    assert!(parse_assignment("cohort").is_err());
}

#[test]
fn report_lists_legacy_questions() {
    let dir = tempdir().unwrap();
    let old = legacy(dir.path());
    let mut out = Vec::new();
    assert_eq!(run_report(&old, &mut out).unwrap(), 1);
    assert_eq!(String::from_utf8(out).unwrap(), "5\tWhat sets the pitch of a sound?\t1\t2011-09-01\n");
}

#[test]
fn merge_summary_counts_issues_without_listing_them() {
    let dir = tempdir().unwrap();
    let src = content(dir.path());
    let old = dir.path().join("legacy.json");
    save_json(
        &old,
        &json!({"questions": [[
            {"question_id": 9, "title": "Unrelated entirely", "responses": [{"username": "zed"}]}
        ]]}),
    )
    .unwrap();
    let (written, report) = run_merge(&old, &[src], MergeConfig::default(), None).unwrap();
    let line = merge_summary(&written, &report);
    assert_eq!(line, "wrote 1 merged files (1 skipped, 0 warnings)");
    assert!(!line.contains("Unrelated"));
}

#[test]
fn missing_legacy_file_is_an_error() {
    let dir = tempdir().unwrap();
    let src = content(dir.path());
    let err = run_merge(&dir.path().join("nope.json"), &[src], MergeConfig::default(), None).unwrap_err();
    assert!(format!("{err:#}").contains("nope.json"));
}
