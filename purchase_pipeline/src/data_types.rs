use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use gbp_common::Usd;
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use crate::helpers::parse_event_time;

//--------------------------------------     AppsflyerId       ---------------------------------------------------------
/// The attribution identifier that links a purchase event to a confirmed purchase. It is opaque to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppsflyerId(pub String);

impl FromStr for AppsflyerId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for AppsflyerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AppsflyerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for AppsflyerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AppsflyerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    PurchaseStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseStatus {
    Success,
    Chargeback,
    Other,
}

impl From<&str> for PurchaseStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "success" => Self::Success,
            "chargeback" => Self::Chargeback,
            _ => Self::Other,
        }
    }
}

//--------------------------------------      RawPurchase      ---------------------------------------------------------
/// A row of `purchases_raw.csv`, exactly as exported. Nothing is normalised at this point; that is the job of
/// [`crate::curation`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPurchase {
    pub appsflyer_id: AppsflyerId,
    pub event_time_utc: String,
    pub event_name: String,
    pub revenue_usd: String,
    pub campaign: String,
    pub status: String,
    #[serde(default)]
    pub receipt_id: Option<String>,
}

impl RawPurchase {
    pub fn status(&self) -> PurchaseStatus {
        PurchaseStatus::from(self.status.as_str())
    }

    pub fn is_purchase_event(&self) -> bool {
        self.event_name.trim().eq_ignore_ascii_case("purchase")
    }

    /// The receipt id, if one was supplied and is not blank.
    pub fn receipt(&self) -> Option<&str> {
        self.receipt_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

//--------------------------------------    CuratedPurchase    ---------------------------------------------------------
/// A purchase event that survived curation. Field order is the column order of `purchases_curated.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CuratedPurchase {
    pub appsflyer_id: AppsflyerId,
    pub event_time_utc: String,
    pub event_name: String,
    pub revenue_usd: Usd,
    pub campaign: String,
    pub status: String,
    pub receipt_id: Option<String>,
    pub campaign_norm: String,
    #[serde(skip)]
    pub event_time: Option<DateTime<Utc>>,
}

impl CuratedPurchase {
    /// The fingerprint used for de-duplication: identity, timestamp, event name and revenue.
    pub fn composite_key(&self) -> String {
        format!("{}|{}|{}|{:?}", self.appsflyer_id, self.event_time_utc, self.event_name, self.revenue_usd.value())
    }

    pub fn event_date(&self) -> Option<NaiveDate> {
        self.event_time.map(|t| t.date_naive())
    }

    pub fn receipt(&self) -> Option<&str> {
        self.receipt_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

pub const CURATED_COLUMNS: [&str; 8] = [
    "appsflyer_id",
    "event_time_utc",
    "event_name",
    "revenue_usd",
    "campaign",
    "status",
    "receipt_id",
    "campaign_norm",
];

//--------------------------------------   ConfirmedPurchase   ---------------------------------------------------------
/// A row of `confirmed_purchases.csv`: the trusted confirmation stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConfirmedPurchase {
    pub appsflyer_id: AppsflyerId,
    pub event_time_utc: String,
    #[serde(deserialize_with = "deserialize_locale_usd")]
    pub revenue_usd: Usd,
}

impl ConfirmedPurchase {
    pub fn event_time(&self) -> Option<DateTime<Utc>> {
        parse_event_time(&self.event_time_utc)
    }
}

//--------------------------------------        CostRow        ---------------------------------------------------------
/// A row of `costs_daily.csv` before coercion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CostRow {
    pub date: String,
    pub campaign: String,
    #[serde(default)]
    pub ad_cost_usd: Option<String>,
}

/// Ad spend for one campaign on one day. `campaign` is normalised (trimmed, upper case) so that it joins against
/// [`CuratedPurchase::campaign_norm`].
#[derive(Debug, Clone, PartialEq)]
pub struct DailyCost {
    pub date: NaiveDate,
    pub campaign: String,
    pub ad_cost_usd: Option<f64>,
}

//--------------------------------------      SessionRow       ---------------------------------------------------------
/// A row of `sessions.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionRecord {
    pub event_timestamp_utc: String,
    pub user_id: String,
}

impl SessionRecord {
    pub fn session_date(&self) -> Option<NaiveDate> {
        parse_event_time(&self.event_timestamp_utc).map(|t| t.date_naive())
    }
}

//--------------------------------------      InputBatch       ---------------------------------------------------------
/// Everything the pipeline consumes in a single run.
#[derive(Debug, Clone, Default)]
pub struct InputBatch {
    pub purchases: Vec<RawPurchase>,
    pub confirmed: Vec<ConfirmedPurchase>,
    pub costs: Vec<DailyCost>,
    pub sessions: Vec<SessionRecord>,
}

impl InputBatch {
    pub fn is_empty(&self) -> bool {
        self.purchases.is_empty() && self.confirmed.is_empty() && self.costs.is_empty() && self.sessions.is_empty()
    }
}

pub fn normalize_campaign(campaign: &str) -> String {
    campaign.trim().to_uppercase()
}

fn deserialize_locale_usd<'de, D>(deserializer: D) -> Result<Usd, D::Error>
where D: Deserializer<'de> {
    let raw = String::deserialize(deserializer)?;
    Ok(raw.parse::<Usd>().unwrap_or_else(|e| {
        warn!("📥️ {e}. Treating the amount as zero.");
        Usd::zero()
    }))
}
