//! Integration test for the `predict` example.
//!
//! Expectation: a reading document on stdin yields one JSON object with a
//! `score` in `[0, 1]` and the list of defaulted channels.

use assert_cmd::Command;
use predicates::prelude::*;

fn predict_cmd() -> Command {
    let mut cmd = Command::new("cargo");
    cmd.args([
        "run",
        "--package",
        "keimwart-model",
        "--example",
        "predict",
    ]);
    cmd
}

#[test]
fn example_predict_scores_a_full_reading() {
    let mut cmd = predict_cmd();
    cmd.write_stdin(r#"{"temperature": 37.0, "ph": 7.0, "dissolvedOxygen": 40.0, "opticalDensity": 0.8}"#);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"score\""))
        .stdout(predicate::str::contains("\"defaulted\": []"));
}

#[test]
fn example_predict_reports_defaulted_channels() {
    let mut cmd = predict_cmd();
    cmd.write_stdin(r#"{"temperature": 37.0, "do": 40.0, "od": 0.8}"#);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"ph\""));
}

#[test]
fn example_predict_score_stays_between_0_and_1() {
    let mut cmd = predict_cmd();
    cmd.write_stdin(r#"{"temp": "29.5", "ph": "6.1", "do": 70, "od": 1.4}"#);

    let output = cmd.assert().success().get_output().stdout.clone();
    let out_str = String::from_utf8_lossy(&output);
    let value: serde_json::Value =
        serde_json::from_str(out_str.trim()).expect("example output should be JSON");
    let score = value["score"].as_f64().expect("score should be a number");
    assert!((0.0..=1.0).contains(&score), "score out of range: {score}");
}
