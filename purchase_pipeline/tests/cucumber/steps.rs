use cucumber::{then, when};
use purchase_pipeline::Artifact;
use serde_json::Value;

use crate::cucumber::PipelineWorld;

const EPSILON: f64 = 1e-9;

fn assert_close(actual: &Value, expected: f64, what: &str) {
    let actual = actual.as_f64().unwrap_or_else(|| panic!("{what} is not a number: {actual}"));
    assert!((actual - expected).abs() < EPSILON, "Expected {what} to be {expected}, got {actual}");
}

fn artifact_named(name: &str) -> Artifact {
    Artifact::ALL.into_iter().find(|a| a.file_name() == name).unwrap_or_else(|| panic!("Unknown artifact {name}"))
}

#[when("the pipeline runs")]
async fn pipeline_runs(world: &mut PipelineWorld) {
    world.run();
}

#[then("the pipeline succeeds")]
async fn pipeline_succeeds(world: &mut PipelineWorld) {
    let summary = world.summary();
    assert_eq!(summary.artifacts.len(), Artifact::ALL.len());
}

#[then(expr = "the curated table has {int} rows")]
async fn curated_rows(world: &mut PipelineWorld, rows: usize) {
    let csv = world.curated_csv();
    // The header is always present
    assert_eq!(csv.lines().count(), rows + 1, "Curated table:\n{csv}");
    assert_eq!(world.summary().curation.eligible - world.summary().curation.duplicates_dropped, rows);
}

#[then(expr = "{int} duplicate purchases were dropped")]
async fn duplicates_dropped(world: &mut PipelineWorld, count: usize) {
    assert_eq!(world.summary().curation.duplicates_dropped, count);
}

#[then(expr = "curated row {int} is '{word}' at {word} with revenue {float}")]
async fn curated_row(world: &mut PipelineWorld, index: usize, id: String, time: String, revenue: f64) {
    let csv = world.curated_csv();
    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let record = reader
        .records()
        .nth(index - 1)
        .unwrap_or_else(|| panic!("There is no curated row {index}"))
        .expect("Invalid curated row");
    assert_eq!(&record[0], id.as_str());
    assert_eq!(&record[1], time.as_str());
    let actual = record[3].parse::<f64>().expect("Curated revenue is not a number");
    assert!((actual - revenue).abs() < EPSILON, "Expected revenue {revenue}, got {actual}");
}

#[then(expr = "the reconciliation has {int} matched, {int} source only and {int} confirmed only records")]
async fn reconciliation_summary(world: &mut PipelineWorld, matched: u64, source_only: u64, confirmed_only: u64) {
    let report = world.json(Artifact::Reconciliation);
    assert_eq!(report["summary"]["matched"], matched);
    assert_eq!(report["summary"]["source_only"], source_only);
    assert_eq!(report["summary"]["confirmed_only"], confirmed_only);
    let details = report["details"].as_array().map(Vec::len).unwrap_or_default() as u64;
    assert_eq!(details, matched + source_only + confirmed_only);
}

#[then(expr = "'{word}' is reconciled as {word}")]
async fn reconciled_as(world: &mut PipelineWorld, id: String, kind: String) {
    let records = world.reconciliation_for(&id);
    assert_eq!(records.len(), 1, "Expected exactly one record for {id}, got {records:?}");
    assert_eq!(records[0]["type"], kind.as_str());
}

#[then(expr = "'{word}' is reconciled as {word} against the confirmation at {word}")]
async fn matched_against(world: &mut PipelineWorld, id: String, kind: String, time: String) {
    let records = world.reconciliation_for(&id);
    let found = records.iter().any(|r| r["type"] == kind.as_str() && r["confirmed_event_time_utc"] == time.as_str());
    assert!(found, "No {kind} record for {id} at {time}. Records: {records:?}");
}

#[then(expr = "'{word}' has {int} reconciliation records")]
async fn record_count(world: &mut PipelineWorld, id: String, count: usize) {
    assert_eq!(world.reconciliation_for(&id).len(), count);
}

#[then(expr = "the ROAS D-1 date is {word}")]
async fn roas_d1_date(world: &mut PipelineWorld, date: String) {
    assert_eq!(world.summary().roas_d1.map(|d| d.to_string()), Some(date));
}

#[then(expr = "the ARPDAU D-1 date is {word}")]
async fn arpdau_d1_date(world: &mut PipelineWorld, date: String) {
    assert_eq!(world.summary().arpdau_d1.map(|d| d.to_string()), Some(date));
}

#[then(expr = "the D-1 ROAS for '{word}' is {float}")]
async fn roas_d1(world: &mut PipelineWorld, campaign: String, roas: f64) {
    let row = world.row_for(Artifact::RoasD1, &campaign);
    assert_close(&row["roas"], roas, "roas");
}

#[then(expr = "the D-1 ad cost for '{word}' is missing")]
async fn ad_cost_missing(world: &mut PipelineWorld, campaign: String) {
    let row = world.row_for(Artifact::RoasD1, &campaign);
    assert_eq!(row["ad_cost_usd"], Value::Null);
}

#[then(expr = "the daily ROAS table has {int} rows")]
async fn roas_daily_rows(world: &mut PipelineWorld, rows: usize) {
    assert_eq!(world.json(Artifact::RoasDaily).as_array().map(Vec::len), Some(rows));
}

#[then(expr = "'{word}' has a trailing average of {float} and is flagged as {word}")]
async fn anomaly(world: &mut PipelineWorld, campaign: String, avg7: f64, flag: String) {
    let row = world.row_for(Artifact::RoasAnomaly, &campaign);
    assert_close(&row["avg7"], avg7, "avg7");
    let expected = match flag.as_str() {
        "anomalous" => true,
        "normal" => false,
        f => panic!("Unknown anomaly flag {f}"),
    };
    assert_eq!(row["anomaly"], expected, "Anomaly row: {row}");
}

#[then(expr = "the D-1 ARPDAU for '{word}' is {float} with {int} active users")]
async fn arpdau_d1(world: &mut PipelineWorld, campaign: String, arpdau: f64, dau: u64) {
    let row = world.row_for(Artifact::ArpdauD1, &campaign);
    assert_close(&row["arpdau"], arpdau, "arpdau");
    assert_eq!(row["dau"], dau);
}

#[then(expr = "the D-1 ARPDAU for '{word}' is 0 with no active user data")]
async fn arpdau_without_dau(world: &mut PipelineWorld, campaign: String) {
    let row = world.row_for(Artifact::ArpdauD1, &campaign);
    assert_close(&row["arpdau"], 0.0, "arpdau");
    assert_eq!(row["dau"], Value::Null);
}

#[then(expr = "{word} is an empty list")]
async fn empty_artifact(world: &mut PipelineWorld, name: String) {
    assert_eq!(world.json(artifact_named(&name)), Value::Array(vec![]));
}
