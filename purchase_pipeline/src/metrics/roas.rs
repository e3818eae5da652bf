use std::collections::BTreeMap;

use chrono::NaiveDate;
use gbp_common::Usd;
use log::*;
use serde::Serialize;

use crate::{data_types::DailyCost, metrics::revenue::DailyRevenue};

/// Ad spend keyed by (date, normalised campaign).
#[derive(Debug, Clone, Default)]
pub struct CostTable {
    costs: BTreeMap<(NaiveDate, String), Option<f64>>,
}

impl CostTable {
    /// Builds the cost lookup. When a campaign has more than one row for the same day, the costs are summed. A
    /// missing cost on any of those rows leaves the known costs in place.
    pub fn from_rows(rows: &[DailyCost]) -> Self {
        let mut costs = BTreeMap::<(NaiveDate, String), Option<f64>>::new();
        let mut duplicates = 0usize;
        for row in rows {
            let key = (row.date, row.campaign.clone());
            match costs.get_mut(&key) {
                Some(existing) => {
                    duplicates += 1;
                    *existing = match (*existing, row.ad_cost_usd) {
                        (Some(a), Some(b)) => Some(a + b),
                        (a, b) => a.or(b),
                    };
                },
                None => {
                    costs.insert(key, row.ad_cost_usd);
                },
            }
        }
        if duplicates > 0 {
            warn!("📊️ {duplicates} duplicate cost rows were found. Their costs have been summed.");
        }
        Self { costs }
    }

    pub fn lookup(&self, date: NaiveDate, campaign: &str) -> Option<f64> {
        self.costs.get(&(date, campaign.to_string())).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

/// A row of the ROAS tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoasRecord {
    pub date: NaiveDate,
    pub campaign: String,
    pub revenue_usd: f64,
    pub ad_cost_usd: Option<f64>,
    pub roas: f64,
}

/// Left-joins daily revenue against ad spend. A campaign-day without a cost keeps its revenue, with a `null` cost and
/// a ROAS of zero.
pub fn compute_roas(revenue: &[DailyRevenue], costs: &CostTable) -> Vec<RoasRecord> {
    let records = revenue
        .iter()
        .map(|r| {
            let ad_cost_usd = costs.lookup(r.date, &r.campaign);
            let roas = Usd::from(r.revenue_usd).ratio(ad_cost_usd);
            RoasRecord { date: r.date, campaign: r.campaign.clone(), revenue_usd: r.revenue_usd, ad_cost_usd, roas }
        })
        .collect::<Vec<_>>();
    let missing = records.iter().filter(|r| r.ad_cost_usd.is_none()).count();
    if missing > 0 {
        warn!("📊️ Missing cost data for {missing} date-campaign combinations. Their ROAS is reported as zero.");
    }
    records
}
