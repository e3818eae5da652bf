use std::collections::BTreeMap;

use chrono::NaiveDate;
use gbp_common::Usd;
use log::*;
use serde::Serialize;

use crate::data_types::CuratedPurchase;

/// Revenue for one normalised campaign on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub campaign: String,
    pub revenue_usd: f64,
}

/// Sums curated revenue by (date, campaign_norm). Purchases with an unparseable timestamp have no date and are left
/// out. The result is ordered by date, then campaign.
pub fn daily_revenue(curated: &[CuratedPurchase]) -> Vec<DailyRevenue> {
    let mut totals = BTreeMap::<(NaiveDate, &str), Usd>::new();
    let mut undated = 0usize;
    for purchase in curated {
        match purchase.event_date() {
            Some(date) => *totals.entry((date, purchase.campaign_norm.as_str())).or_default() += purchase.revenue_usd,
            None => undated += 1,
        }
    }
    if undated > 0 {
        warn!("📊️ {undated} curated purchases have invalid timestamps and are excluded from daily revenue");
    }
    debug!("📊️ Aggregated revenue for {} date-campaign combinations", totals.len());
    totals
        .into_iter()
        .map(|((date, campaign), total)| DailyRevenue {
            date,
            campaign: campaign.to_string(),
            revenue_usd: total.value(),
        })
        .collect()
}

/// The D-1 reporting date: the second most recent distinct date. When only one date exists, that date is used.
pub fn select_d1<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Option<NaiveDate> {
    let mut distinct = dates.into_iter().collect::<Vec<_>>();
    distinct.sort_unstable();
    distinct.dedup();
    match distinct.len() {
        0 => None,
        1 => distinct.first().copied(),
        n => distinct.get(n - 2).copied(),
    }
}
