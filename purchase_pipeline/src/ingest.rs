//! # Ingestion loader
//!
//! Reads the four CSV exports that feed the pipeline and turns them into typed records. Header validation happens
//! once per file, before any row is decoded, so a missing column is reported as [`IngestError::MissingColumn`] rather
//! than as a generic parse failure.
//!
//! | File                      | Required columns                                                              |
//! |---------------------------|-------------------------------------------------------------------------------|
//! | `purchases_raw.csv`       | `appsflyer_id, event_time_utc, event_name, revenue_usd, campaign, status`      |
//! | `confirmed_purchases.csv` | `appsflyer_id, event_time_utc, revenue_usd`                                    |
//! | `costs_daily.csv`         | `date, campaign, ad_cost_usd`                                                  |
//! | `sessions.csv`            | `event_timestamp_utc, user_id`                                                 |
//!
//! `purchases_raw.csv` may also carry a `receipt_id` column, which enables chargeback handling.
use std::{fs, io, path::Path};

use csv::{ReaderBuilder, Trim};
use gbp_common::Usd;
use log::*;
use serde::de::DeserializeOwned;

use crate::{
    data_types::{normalize_campaign, ConfirmedPurchase, CostRow, DailyCost, InputBatch, RawPurchase, SessionRecord},
    errors::IngestError,
    helpers::parse_report_date,
};

/// A CSV dataset with a fixed file name and a set of columns that must be present in its header.
pub trait Dataset: DeserializeOwned {
    const NAME: &'static str;
    const FILE_NAME: &'static str;
    const REQUIRED_COLUMNS: &'static [&'static str];
}

impl Dataset for RawPurchase {
    const FILE_NAME: &'static str = "purchases_raw.csv";
    const NAME: &'static str = "purchases";
    const REQUIRED_COLUMNS: &'static [&'static str] =
        &["appsflyer_id", "event_time_utc", "event_name", "revenue_usd", "campaign", "status"];
}

impl Dataset for ConfirmedPurchase {
    const FILE_NAME: &'static str = "confirmed_purchases.csv";
    const NAME: &'static str = "confirmed purchases";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["appsflyer_id", "event_time_utc", "revenue_usd"];
}

impl Dataset for CostRow {
    const FILE_NAME: &'static str = "costs_daily.csv";
    const NAME: &'static str = "daily costs";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["date", "campaign", "ad_cost_usd"];
}

impl Dataset for SessionRecord {
    const FILE_NAME: &'static str = "sessions.csv";
    const NAME: &'static str = "sessions";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["event_timestamp_utc", "user_id"];
}

/// Loads all four datasets from `data_dir`. The presence of every file is checked before any of them is parsed.
pub fn load_inputs<P: AsRef<Path>>(data_dir: P) -> Result<InputBatch, IngestError> {
    let dir = data_dir.as_ref();
    info!("📥️ Loading CSV files from {}", dir.display());
    for file_name in
        [RawPurchase::FILE_NAME, ConfirmedPurchase::FILE_NAME, CostRow::FILE_NAME, SessionRecord::FILE_NAME]
    {
        let path = dir.join(file_name);
        if !path.exists() {
            return Err(IngestError::FileNotFound(path));
        }
    }
    let purchases = read_dataset::<RawPurchase>(dir)?;
    let confirmed = read_dataset::<ConfirmedPurchase>(dir)?;
    let costs = coerce_costs(read_dataset::<CostRow>(dir)?);
    let sessions = read_dataset::<SessionRecord>(dir)?;
    Ok(InputBatch { purchases, confirmed, costs, sessions })
}

/// Reads and parses the file for dataset `R` in `dir`.
pub fn read_dataset<R: Dataset>(dir: &Path) -> Result<Vec<R>, IngestError> {
    let path = dir.join(R::FILE_NAME);
    let contents = fs::read(&path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => IngestError::FileNotFound(path.clone()),
        _ => IngestError::Unreadable { path: path.clone(), source: e },
    })?;
    let rows = parse_dataset::<R, _>(contents.as_slice())?;
    info!("📥️ Loaded {} rows from {}", rows.len(), R::FILE_NAME);
    Ok(rows)
}

/// Parses CSV text for dataset `R`. Useful for tests that don't want to touch the filesystem.
pub fn parse_dataset<R: Dataset, T: io::Read>(source: T) -> Result<Vec<R>, IngestError> {
    let mut reader = ReaderBuilder::new().trim(Trim::Headers).from_reader(source);
    let headers = reader
        .headers()
        .map_err(|e| IngestError::Malformed { dataset: R::NAME, row: 1, reason: e.to_string() })?
        .clone();
    if headers.is_empty() {
        return Err(IngestError::Empty { dataset: R::NAME });
    }
    if let Some(column) = R::REQUIRED_COLUMNS.iter().find(|&&c| !headers.iter().any(|h| h == c)) {
        return Err(IngestError::MissingColumn { dataset: R::NAME, column });
    }
    reader
        .deserialize::<R>()
        .enumerate()
        .map(|(i, row)| {
            row.map_err(|e| {
                let row = e.position().map(|p| p.line()).unwrap_or(i as u64 + 2);
                IngestError::Malformed { dataset: R::NAME, row, reason: e.to_string() }
            })
        })
        .collect()
}

/// Coerces raw cost rows. Rows with an unusable date cannot be joined against anything and are dropped. Unparseable
/// costs are kept as missing costs.
pub fn coerce_costs(rows: Vec<CostRow>) -> Vec<DailyCost> {
    let mut bad_dates = 0usize;
    let mut bad_costs = 0usize;
    let costs = rows
        .into_iter()
        .filter_map(|row| {
            let Some(date) = parse_report_date(&row.date) else {
                bad_dates += 1;
                return None;
            };
            let ad_cost_usd = row.ad_cost_usd.as_deref().map(str::trim).filter(|s| !s.is_empty()).and_then(|s| {
                s.parse::<Usd>()
                    .map(|v| v.value())
                    .map_err(|e| {
                        debug!("📥️ Cost for {} on {date} is unusable. {e}", row.campaign);
                        bad_costs += 1;
                    })
                    .ok()
            });
            Some(DailyCost { date, campaign: normalize_campaign(&row.campaign), ad_cost_usd })
        })
        .collect::<Vec<_>>();
    if bad_dates > 0 {
        warn!("📥️ Dropped {bad_dates} cost rows with invalid dates");
    }
    if bad_costs > 0 {
        warn!("📥️ {bad_costs} cost rows have unparseable amounts and are treated as missing");
    }
    costs
}
