use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use log::*;
use serde::Serialize;

use crate::{data_types::SessionRecord, metrics::revenue::DailyRevenue};

/// Distinct active users per day. DAU is not campaign specific.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DauTable(BTreeMap<NaiveDate, u64>);

impl DauTable {
    pub fn get(&self, date: NaiveDate) -> Option<u64> {
        self.0.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Counts distinct `user_id`s per session date. Sessions with an invalid timestamp are excluded.
pub fn daily_active_users(sessions: &[SessionRecord]) -> DauTable {
    let mut users = BTreeMap::<NaiveDate, BTreeSet<&str>>::new();
    let mut invalid = 0usize;
    for session in sessions {
        match session.session_date() {
            Some(date) => {
                users.entry(date).or_default().insert(session.user_id.as_str());
            },
            None => invalid += 1,
        }
    }
    if invalid > 0 {
        warn!("📊️ Found {invalid} sessions with invalid timestamps. They are excluded from DAU.");
    }
    let table = DauTable(users.into_iter().map(|(date, ids)| (date, ids.len() as u64)).collect());
    debug!("📊️ Calculated DAU for {} dates", table.len());
    table
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArpdauRecord {
    pub date: NaiveDate,
    pub campaign: String,
    pub revenue: f64,
    pub dau: Option<u64>,
    pub arpdau: f64,
}

/// Joins campaign-level daily revenue against date-level DAU. Every campaign on a given date shares that date's DAU.
pub fn compute_arpdau(revenue: &[DailyRevenue], dau: &DauTable) -> Vec<ArpdauRecord> {
    let records = revenue
        .iter()
        .map(|r| {
            let users = dau.get(r.date);
            let arpdau = match users {
                Some(n) if n > 0 => r.revenue_usd / n as f64,
                _ => 0.0,
            };
            ArpdauRecord { date: r.date, campaign: r.campaign.clone(), revenue: r.revenue_usd, dau: users, arpdau }
        })
        .collect::<Vec<_>>();
    let missing = records.iter().filter(|r| r.dau.is_none()).count();
    if missing > 0 {
        warn!("📊️ Missing DAU data for {missing} date-campaign combinations. Their ARPDAU is reported as zero.");
    }
    records
}
