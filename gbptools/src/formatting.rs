use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};
use purchase_pipeline::{InputBatch, PipelineSummary};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn or_none<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "n/a".to_string())
}

pub fn format_summary(summary: &PipelineSummary) -> String {
    let mut table = Table::new();
    table.set_format(markdown_format());
    table.set_titles(row!["Stage", "Result"]);
    let curation = &summary.curation;
    let curated = curation.eligible - curation.duplicates_dropped;
    let flagged = format!("{} of {}", summary.anomalies_flagged, summary.anomalies);
    table.add_row(row!["Raw purchases", curation.raw]);
    table.add_row(row!["Curated purchases", curated]);
    table.add_row(row!["Duplicates dropped", curation.duplicates_dropped]);
    table.add_row(row!["Charged-back purchases", curation.chargeback_zeroed]);
    table.add_row(row!["Curated revenue", curation.curated_revenue]);
    let rec = &summary.reconciliation;
    table.add_row(row!["Matched", rec.matched]);
    table.add_row(row!["Source only", rec.source_only]);
    table.add_row(row!["Confirmed only", rec.confirmed_only]);
    table.add_row(row!["ROAS D-1", or_none(summary.roas_d1)]);
    table.add_row(row!["ROAS D-1 rows", summary.roas_d1_rows]);
    table.add_row(row!["Anomalies flagged", flagged]);
    table.add_row(row!["ARPDAU D-1", or_none(summary.arpdau_d1)]);
    table.add_row(row!["ARPDAU D-1 rows", summary.arpdau_d1_rows]);
    table.add_row(row!["Artifacts", summary.artifacts.join("\n")]);
    table.to_string()
}

pub fn format_input_counts(batch: &InputBatch) -> String {
    let mut table = Table::new();
    table.set_format(markdown_format());
    table.set_titles(row!["Dataset", "Rows"]);
    table.add_row(row!["purchases_raw.csv", batch.purchases.len()]);
    table.add_row(row!["confirmed_purchases.csv", batch.confirmed.len()]);
    table.add_row(row!["costs_daily.csv", batch.costs.len()]);
    table.add_row(row!["sessions.csv", batch.sessions.len()]);
    table.to_string()
}
