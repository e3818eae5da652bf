use cucumber::{gherkin::Step, given};
use purchase_pipeline::{
    data_types::{ConfirmedPurchase, CostRow, RawPurchase, SessionRecord},
    ingest::{coerce_costs, parse_dataset, Dataset},
};

use crate::cucumber::PipelineWorld;

/// Renders a Gherkin table as CSV (the first row is the header) and parses it with the ingestion loader.
fn table_rows<R: Dataset>(step: &Step) -> Vec<R> {
    let table = step.table.as_ref().expect("This step needs a data table");
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in &table.rows {
        writer.write_record(row).expect("Could not write table row");
    }
    let csv = writer.into_inner().expect("Could not flush table");
    parse_dataset::<R, _>(csv.as_slice()).expect("The table is not a valid dataset")
}

#[given("the raw purchases:")]
async fn raw_purchases(world: &mut PipelineWorld, step: &Step) {
    world.batch.purchases = table_rows::<RawPurchase>(step);
}

#[given("the confirmed purchases:")]
async fn confirmed_purchases(world: &mut PipelineWorld, step: &Step) {
    world.batch.confirmed = table_rows::<ConfirmedPurchase>(step);
}

#[given("the daily costs:")]
async fn daily_costs(world: &mut PipelineWorld, step: &Step) {
    world.batch.costs = coerce_costs(table_rows::<CostRow>(step));
}

#[given("the sessions:")]
async fn sessions(world: &mut PipelineWorld, step: &Step) {
    world.batch.sessions = table_rows::<SessionRecord>(step);
}

#[given(expr = "{int} distinct users were active on {word}")]
async fn active_users(world: &mut PipelineWorld, users: usize, date: String) {
    let sessions = (0..users)
        .map(|i| SessionRecord { event_timestamp_utc: format!("{date}T12:00:00Z"), user_id: format!("user_{i}") });
    world.batch.sessions.extend(sessions);
}

#[given(expr = "a match tolerance of {int} minutes")]
async fn match_tolerance(world: &mut PipelineWorld, minutes: i64) {
    world.options = world.options.with_tolerance_mins(minutes);
}
