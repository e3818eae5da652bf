use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::*;
use serde::Serialize;

use crate::metrics::roas::RoasRecord;

pub const DEFAULT_ANOMALY_WINDOW_DAYS: usize = 7;
pub const DEFAULT_ANOMALY_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyConfig {
    /// The number of distinct trailing dates (D-1 inclusive) averaged per campaign
    pub window_days: usize,
    /// A campaign is flagged when its D-1 ROAS falls below `ratio` times its trailing average
    pub ratio: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self { window_days: DEFAULT_ANOMALY_WINDOW_DAYS, ratio: DEFAULT_ANOMALY_RATIO }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRecord {
    pub date: NaiveDate,
    pub campaign: String,
    pub roas_d1: f64,
    pub avg7: f64,
    pub anomaly: bool,
}

/// Scores every campaign that has a ROAS row on `d1` against its own trailing average.
///
/// The trailing window holds the campaign's last `window_days` distinct dates up to and including `d1`. A campaign
/// whose average is zero (or negative) is never flagged. Results are ordered by campaign.
pub fn detect_anomalies(roas: &[RoasRecord], d1: NaiveDate, config: AnomalyConfig) -> Vec<AnomalyRecord> {
    let mut history = BTreeMap::<&str, BTreeMap<NaiveDate, f64>>::new();
    for r in roas.iter().filter(|r| r.date <= d1) {
        history.entry(r.campaign.as_str()).or_default().insert(r.date, r.roas);
    }
    let anomalies = history
        .into_iter()
        .filter_map(|(campaign, by_date)| {
            let roas_d1 = *by_date.get(&d1)?;
            let window = by_date.values().rev().take(config.window_days.max(1)).copied().collect::<Vec<_>>();
            let avg7 = window.iter().sum::<f64>() / window.len() as f64;
            let anomaly = avg7 > 0.0 && roas_d1 < config.ratio * avg7;
            Some(AnomalyRecord { date: d1, campaign: campaign.to_string(), roas_d1, avg7, anomaly })
        })
        .collect::<Vec<_>>();
    info!("📊️ Detected {} ROAS anomalies on {d1}", anomalies.iter().filter(|a| a.anomaly).count());
    anomalies
}
