//! # Metrics engine
//!
//! Marketing efficiency metrics derived from the curated purchase table:
//!
//! * **ROAS** (return on ad spend): revenue / ad cost, per campaign per day. See [`RoasReport`].
//! * **ARPDAU** (average revenue per daily active user): revenue / distinct active users, per campaign per day. See
//!   [`ArpdauReport`].
//!
//! Both reports focus on the **D-1** reporting date, the second most recent date in their own data. When the data
//! covers a single date, that date is used. ROAS and ARPDAU select D-1 independently.
//!
//! Empty inputs produce empty reports. Missing costs or DAU are data-quality warnings, never errors.
pub mod anomaly;
pub mod arpdau;
pub mod revenue;
pub mod roas;

use chrono::NaiveDate;
use log::*;
use serde::Serialize;

pub use anomaly::{detect_anomalies, AnomalyConfig, AnomalyRecord};
pub use arpdau::{compute_arpdau, daily_active_users, ArpdauRecord, DauTable};
pub use revenue::{daily_revenue, select_d1, DailyRevenue};
pub use roas::{compute_roas, CostTable, RoasRecord};

use crate::{
    data_types::{DailyCost, SessionRecord},
    errors::MetricsError,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoasReport {
    pub d1: Option<NaiveDate>,
    /// Every campaign-day, ordered by date then campaign
    pub daily: Vec<RoasRecord>,
    pub d1_rows: Vec<RoasRecord>,
    pub anomalies: Vec<AnomalyRecord>,
}

impl RoasReport {
    pub fn compute(
        revenue: &[DailyRevenue],
        costs: &[DailyCost],
        config: AnomalyConfig,
    ) -> Result<Self, MetricsError> {
        check_finite(revenue)?;
        let table = CostTable::from_rows(costs);
        let daily = compute_roas(revenue, &table);
        let Some(d1) = select_d1(daily.iter().map(|r| r.date)) else {
            warn!("📊️ No ROAS data to process. The ROAS reports will be empty.");
            return Ok(Self::default());
        };
        info!("📊️ Calculating ROAS for D-1 date: {d1}");
        let d1_rows = daily.iter().filter(|r| r.date == d1).cloned().collect();
        let anomalies = detect_anomalies(&daily, d1, config);
        Ok(Self { d1: Some(d1), daily, d1_rows, anomalies })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArpdauReport {
    pub d1: Option<NaiveDate>,
    pub d1_rows: Vec<ArpdauRecord>,
}

impl ArpdauReport {
    pub fn compute(revenue: &[DailyRevenue], sessions: &[SessionRecord]) -> Result<Self, MetricsError> {
        check_finite(revenue)?;
        let dau = daily_active_users(sessions);
        let all = compute_arpdau(revenue, &dau);
        let Some(d1) = select_d1(all.iter().map(|r| r.date)) else {
            warn!("📊️ No ARPDAU data to process. The ARPDAU report will be empty.");
            return Ok(Self::default());
        };
        info!("📊️ Calculating ARPDAU for D-1 date: {d1}");
        let d1_rows = all.into_iter().filter(|r| r.date == d1).collect();
        Ok(Self { d1: Some(d1), d1_rows })
    }
}

/// Revenue sums are finite unless the inputs overflowed `f64`. Such a total cannot be serialized as JSON.
fn check_finite(revenue: &[DailyRevenue]) -> Result<(), MetricsError> {
    match revenue.iter().find(|r| !r.revenue_usd.is_finite()) {
        Some(r) => Err(MetricsError::NonFiniteRevenue { campaign: r.campaign.clone(), date: r.date }),
        None => Ok(()),
    }
}
