//! # Purchase curation
//!
//! Turns the raw, noisy purchase export into the curated purchase table:
//!
//! 1. Revenue is normalised (`12,5` → `12.5`). Anything that is not a number becomes zero.
//! 2. The campaign is trimmed, and an upper-case `campaign_norm` is added for joining against costs.
//! 3. Only successful `purchase` events with positive revenue are kept.
//! 4. Events are ordered by timestamp and de-duplicated on their composite key, keeping the earliest.
//! 5. Revenue is zeroed (but the row kept) for every receipt that was charged back anywhere in the raw batch.
use std::collections::{BTreeSet, HashSet};

use gbp_common::Usd;
use log::*;
use serde::Serialize;

use crate::{
    data_types::{normalize_campaign, CuratedPurchase, PurchaseStatus, RawPurchase},
    helpers::parse_event_time,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CurationStats {
    /// Rows in the raw export
    pub raw: usize,
    /// Successful purchase events with positive revenue
    pub eligible: usize,
    pub duplicates_dropped: usize,
    /// Distinct receipts with a chargeback in the raw export
    pub chargeback_receipts: usize,
    /// Curated rows whose revenue was zeroed because of a chargeback
    pub chargeback_zeroed: usize,
    pub revenue_zeroed: Usd,
    /// Revenue of the curated table, after chargebacks
    pub curated_revenue: Usd,
}

#[derive(Debug, Clone, Default)]
pub struct CurationResult {
    pub purchases: Vec<CuratedPurchase>,
    pub stats: CurationStats,
}

pub fn curate_purchases(raw: &[RawPurchase]) -> CurationResult {
    let mut stats = CurationStats { raw: raw.len(), ..Default::default() };
    let mut eligible = raw
        .iter()
        .filter(|r| r.status() == PurchaseStatus::Success && r.is_purchase_event())
        .map(normalize_purchase)
        .filter(|p| p.revenue_usd.is_positive())
        .collect::<Vec<_>>();
    stats.eligible = eligible.len();

    // Stable sort: parseable timestamps in time order, then unparseable ones, each in input order
    eligible.sort_by_key(|p| (p.event_time.is_none(), p.event_time));
    let mut seen = HashSet::new();
    let mut purchases = eligible.into_iter().filter(|p| seen.insert(p.composite_key())).collect::<Vec<_>>();
    stats.duplicates_dropped = stats.eligible - purchases.len();
    debug!("🧹️ {} eligible purchases, {} duplicates dropped", stats.eligible, stats.duplicates_dropped);

    let chargebacks = chargeback_receipts(raw);
    stats.chargeback_receipts = chargebacks.len();
    for purchase in purchases.iter_mut() {
        if purchase.receipt().is_some_and(|r| chargebacks.contains(r)) {
            stats.revenue_zeroed += purchase.revenue_usd;
            purchase.revenue_usd = Usd::zero();
            stats.chargeback_zeroed += 1;
        }
    }
    stats.curated_revenue = purchases.iter().map(|p| p.revenue_usd).sum();
    info!(
        "🧹️ Curated {} of {} raw purchases ({}). Zeroed {} of revenue on {} purchases across {} charged-back receipts",
        purchases.len(),
        stats.raw,
        stats.curated_revenue,
        stats.revenue_zeroed,
        stats.chargeback_zeroed,
        stats.chargeback_receipts
    );
    CurationResult { purchases, stats }
}

/// The receipt ids of every chargeback in the raw (unfiltered) batch.
pub fn chargeback_receipts(raw: &[RawPurchase]) -> BTreeSet<&str> {
    raw.iter().filter(|r| r.status() == PurchaseStatus::Chargeback).filter_map(RawPurchase::receipt).collect()
}

fn normalize_purchase(raw: &RawPurchase) -> CuratedPurchase {
    let campaign = raw.campaign.trim().to_string();
    CuratedPurchase {
        appsflyer_id: raw.appsflyer_id.clone(),
        event_time_utc: raw.event_time_utc.clone(),
        event_name: raw.event_name.clone(),
        revenue_usd: Usd::from_locale_str(&raw.revenue_usd),
        campaign_norm: normalize_campaign(&campaign),
        campaign,
        status: raw.status.clone(),
        receipt_id: raw.receipt_id.clone(),
        event_time: parse_event_time(&raw.event_time_utc),
    }
}
