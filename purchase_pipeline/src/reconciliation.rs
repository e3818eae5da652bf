//! # Reconciliation
//!
//! Matches curated purchases against the confirmed purchase stream. The two streams come from different systems with
//! different clocks, so a match is the *nearest* confirmed purchase for the same `appsflyer_id` within a tolerance
//! window (10 minutes by default).
//!
//! Every curated purchase and every confirmed purchase ends up in exactly one [`ReconciliationRecord`]:
//!
//! * `matched`: the curated purchase claimed a confirmed purchase.
//! * `source_only`: the curated purchase has no unclaimed confirmed purchase within tolerance.
//! * `confirmed_only`: the confirmed purchase was not claimed by any curated purchase.
//!
//! A confirmed purchase can be claimed at most once. Claims are made in curated order (identities in order of first
//! appearance, then purchases in curated order), so the first curated purchase to reach a confirmed purchase wins it.
use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use gbp_common::Usd;
use log::*;
use serde::Serialize;

use crate::data_types::{AppsflyerId, ConfirmedPurchase, CuratedPurchase};

pub const DEFAULT_MATCH_TOLERANCE: Duration = Duration::minutes(10);

//--------------------------------------  ReconciliationRecord ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReconciliationRecord {
    Matched {
        appsflyer_id: AppsflyerId,
        source_event_time_utc: String,
        confirmed_event_time_utc: String,
        revenue_usd: Usd,
        confirmed_revenue_usd: Usd,
    },
    SourceOnly {
        appsflyer_id: AppsflyerId,
        event_time_utc: String,
        revenue_usd: Usd,
    },
    ConfirmedOnly {
        appsflyer_id: AppsflyerId,
        event_time_utc: String,
        revenue_usd: Usd,
    },
}

impl ReconciliationRecord {
    fn matched(source: &CuratedPurchase, confirmed: &ConfirmedPurchase) -> Self {
        Self::Matched {
            appsflyer_id: source.appsflyer_id.clone(),
            source_event_time_utc: source.event_time_utc.clone(),
            confirmed_event_time_utc: confirmed.event_time_utc.clone(),
            revenue_usd: source.revenue_usd,
            confirmed_revenue_usd: confirmed.revenue_usd,
        }
    }

    fn source_only(source: &CuratedPurchase) -> Self {
        Self::SourceOnly {
            appsflyer_id: source.appsflyer_id.clone(),
            event_time_utc: source.event_time_utc.clone(),
            revenue_usd: source.revenue_usd,
        }
    }

    fn confirmed_only(confirmed: &ConfirmedPurchase) -> Self {
        Self::ConfirmedOnly {
            appsflyer_id: confirmed.appsflyer_id.clone(),
            event_time_utc: confirmed.event_time_utc.clone(),
            revenue_usd: confirmed.revenue_usd,
        }
    }

    pub fn appsflyer_id(&self) -> &AppsflyerId {
        match self {
            Self::Matched { appsflyer_id, .. } |
            Self::SourceOnly { appsflyer_id, .. } |
            Self::ConfirmedOnly { appsflyer_id, .. } => appsflyer_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Matched { .. } => "matched",
            Self::SourceOnly { .. } => "source_only",
            Self::ConfirmedOnly { .. } => "confirmed_only",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    pub matched: usize,
    pub source_only: usize,
    pub confirmed_only: usize,
}

impl ReconciliationSummary {
    pub fn from_records(records: &[ReconciliationRecord]) -> Self {
        records.iter().fold(Self::default(), |mut acc, r| {
            match r {
                ReconciliationRecord::Matched { .. } => acc.matched += 1,
                ReconciliationRecord::SourceOnly { .. } => acc.source_only += 1,
                ReconciliationRecord::ConfirmedOnly { .. } => acc.confirmed_only += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.matched + self.source_only + self.confirmed_only
    }
}

/// The `reconciliation.json` artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub summary: ReconciliationSummary,
    pub details: Vec<ReconciliationRecord>,
}

//--------------------------------------     ConfirmedIndex    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IndexedConfirmation {
    /// Position in the confirmed purchase list
    position: usize,
    time: Option<DateTime<Utc>>,
}

/// Confirmed purchases grouped by identity, in file order. Built once per run.
#[derive(Debug, Default)]
pub struct ConfirmedIndex<'a> {
    by_identity: HashMap<&'a str, Vec<IndexedConfirmation>>,
    invalid_timestamps: usize,
}

impl<'a> ConfirmedIndex<'a> {
    pub fn build(confirmed: &'a [ConfirmedPurchase]) -> Self {
        let mut index = Self::default();
        for (position, c) in confirmed.iter().enumerate() {
            let time = c.event_time();
            if time.is_none() {
                index.invalid_timestamps += 1;
                debug!("🔗️ Confirmed purchase for {} has an invalid timestamp: {}", c.appsflyer_id, c.event_time_utc);
            }
            index.by_identity.entry(c.appsflyer_id.as_str()).or_default().push(IndexedConfirmation { position, time });
        }
        index
    }

    pub fn invalid_timestamps(&self) -> usize {
        self.invalid_timestamps
    }

    pub fn has_identity(&self, id: &AppsflyerId) -> bool {
        self.by_identity.contains_key(id.as_str())
    }

    /// Finds the nearest unclaimed confirmed purchase for `id` and returns its position and distance from `at`.
    /// Confirmed purchases with invalid timestamps are never candidates. Ties go to the earliest in file order.
    pub fn nearest_unclaimed(
        &self,
        id: &AppsflyerId,
        at: DateTime<Utc>,
        claims: &ClaimSet,
    ) -> Option<(usize, Duration)> {
        self.by_identity
            .get(id.as_str())?
            .iter()
            .filter(|c| !claims.is_claimed(c.position))
            .filter_map(|c| c.time.map(|t| (c.position, (t - at).abs())))
            .fold(None, |best, (position, distance)| match best {
                Some((_, d)) if d <= distance => best,
                _ => Some((position, distance)),
            })
    }
}

//--------------------------------------       ClaimSet        ---------------------------------------------------------
/// The positions of confirmed purchases that have already been claimed by a match.
#[derive(Debug, Clone, Default)]
pub struct ClaimSet(BTreeSet<usize>);

impl ClaimSet {
    /// Claims the confirmed purchase at `position`. Returns false if it was already claimed.
    pub fn claim(&mut self, position: usize) -> bool {
        self.0.insert(position)
    }

    pub fn is_claimed(&self, position: usize) -> bool {
        self.0.contains(&position)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

//--------------------------------------       Matching        ---------------------------------------------------------
pub fn reconcile(
    curated: &[CuratedPurchase],
    confirmed: &[ConfirmedPurchase],
    tolerance: Duration,
) -> ReconciliationReport {
    let index = ConfirmedIndex::build(confirmed);
    let invalid_source = curated.iter().filter(|p| p.event_time.is_none()).count();
    if invalid_source > 0 {
        warn!("🔗️ Found {invalid_source} invalid timestamps in curated purchases. They cannot be matched.");
    }
    if index.invalid_timestamps() > 0 {
        warn!(
            "🔗️ Found {} invalid timestamps in confirmed purchases. They cannot be matched.",
            index.invalid_timestamps()
        );
    }

    let mut claims = ClaimSet::default();
    let mut details = Vec::with_capacity(curated.len() + confirmed.len());
    for group in group_by_identity(curated) {
        details.extend(match_identity(&group, confirmed, &index, tolerance, &mut claims));
    }
    details.extend(
        confirmed
            .iter()
            .enumerate()
            .filter(|(position, _)| !claims.is_claimed(*position))
            .map(|(_, c)| ReconciliationRecord::confirmed_only(c)),
    );

    let summary = ReconciliationSummary::from_records(&details);
    info!(
        "🔗️ Reconciliation summary: {} matched, {} source only, {} confirmed only",
        summary.matched, summary.source_only, summary.confirmed_only
    );
    ReconciliationReport { summary, details }
}

/// Matches every curated purchase of a single identity, claiming confirmed purchases in `claims` as it goes.
pub fn match_identity(
    purchases: &[&CuratedPurchase],
    confirmed: &[ConfirmedPurchase],
    index: &ConfirmedIndex,
    tolerance: Duration,
    claims: &mut ClaimSet,
) -> Vec<ReconciliationRecord> {
    purchases
        .iter()
        .map(|&purchase| {
            if !index.has_identity(&purchase.appsflyer_id) {
                return ReconciliationRecord::source_only(purchase);
            }
            let nearest = purchase
                .event_time
                .and_then(|at| index.nearest_unclaimed(&purchase.appsflyer_id, at, claims))
                .filter(|(_, distance)| *distance <= tolerance);
            match nearest {
                Some((position, distance)) if claims.claim(position) => {
                    trace!(
                        "🔗️ {} at {} matched confirmed purchase #{position} ({}s apart)",
                        purchase.appsflyer_id,
                        purchase.event_time_utc,
                        distance.num_seconds()
                    );
                    ReconciliationRecord::matched(purchase, &confirmed[position])
                },
                _ => ReconciliationRecord::source_only(purchase),
            }
        })
        .collect()
}

/// Groups curated purchases by identity. Groups are in order of first appearance, and purchases keep their order.
fn group_by_identity(curated: &[CuratedPurchase]) -> Vec<Vec<&CuratedPurchase>> {
    let mut positions = HashMap::<&str, usize>::new();
    let mut groups: Vec<Vec<&CuratedPurchase>> = Vec::new();
    for purchase in curated {
        let next = groups.len();
        let i = *positions.entry(purchase.appsflyer_id.as_str()).or_insert(next);
        if i == next {
            groups.push(Vec::new());
        }
        groups[i].push(purchase);
    }
    groups
}

#[cfg(test)]
mod test {
    use crate::helpers::parse_event_time;

    use super::*;

    fn curated(id: &str, time: &str, revenue: f64) -> CuratedPurchase {
        CuratedPurchase {
            appsflyer_id: id.into(),
            event_time_utc: time.into(),
            event_name: "purchase".into(),
            revenue_usd: Usd::from(revenue),
            campaign: "Campaign_A".into(),
            status: "success".into(),
            receipt_id: None,
            campaign_norm: "CAMPAIGN_A".into(),
            event_time: parse_event_time(time),
        }
    }

    fn confirmed(id: &str, time: &str, revenue: f64) -> ConfirmedPurchase {
        ConfirmedPurchase { appsflyer_id: id.into(), event_time_utc: time.into(), revenue_usd: Usd::from(revenue) }
    }

    fn kinds(report: &ReconciliationReport) -> Vec<(String, &'static str)> {
        report.details.iter().map(|r| (r.appsflyer_id().to_string(), r.kind())).collect()
    }

    #[test]
    fn basic_matching() {
        let source = vec![curated("af_001", "2025-10-20T08:00:00Z", 10.0), curated("af_002", "2025-10-20T09:00:00Z", 20.0)];
        let confirm = vec![confirmed("af_001", "2025-10-20T08:01:00Z", 10.0), confirmed("af_003", "2025-10-20T10:00:00Z", 30.0)];
        let report = reconcile(&source, &confirm, DEFAULT_MATCH_TOLERANCE);
        assert_eq!(report.summary, ReconciliationSummary { matched: 1, source_only: 1, confirmed_only: 1 });
        assert_eq!(
            kinds(&report),
            vec![
                ("af_001".to_string(), "matched"),
                ("af_002".to_string(), "source_only"),
                ("af_003".to_string(), "confirmed_only")
            ]
        );
        assert_eq!(
            report.details[0],
            ReconciliationRecord::Matched {
                appsflyer_id: "af_001".into(),
                source_event_time_utc: "2025-10-20T08:00:00Z".into(),
                confirmed_event_time_utc: "2025-10-20T08:01:00Z".into(),
                revenue_usd: Usd::from(10.0),
                confirmed_revenue_usd: Usd::from(10.0),
            }
        );
    }

    #[test]
    fn tolerance_is_inclusive() {
        let source = vec![curated("af_001", "2025-10-20T08:00:00Z", 10.0), curated("af_002", "2025-10-20T08:00:00Z", 10.0)];
        let confirm = vec![confirmed("af_001", "2025-10-20T08:10:00Z", 10.0), confirmed("af_002", "2025-10-20T08:10:01Z", 10.0)];
        let report = reconcile(&source, &confirm, DEFAULT_MATCH_TOLERANCE);
        assert_eq!(report.summary, ReconciliationSummary { matched: 1, source_only: 1, confirmed_only: 1 });
        assert_eq!(report.details[0].kind(), "matched");
        assert_eq!(report.details[1].kind(), "source_only");
    }

    #[test]
    fn nearest_confirmation_wins() {
        let source = vec![curated("af_001", "2025-10-20T08:00:00Z", 10.0)];
        let confirm = vec![
            confirmed("af_001", "2025-10-20T08:05:00Z", 1.0),
            confirmed("af_001", "2025-10-20T07:58:00Z", 2.0),
            confirmed("af_001", "2025-10-20T08:02:00Z", 3.0),
        ];
        let report = reconcile(&source, &confirm, DEFAULT_MATCH_TOLERANCE);
        match &report.details[0] {
            ReconciliationRecord::Matched { confirmed_event_time_utc, .. } => {
                assert_eq!(confirmed_event_time_utc, "2025-10-20T07:58:00Z")
            },
            r => panic!("Expected a match, got {r:?}"),
        }
        assert_eq!(report.summary.confirmed_only, 2);
    }

    #[test]
    fn confirmations_are_claimed_once() {
        // Both purchases are nearest to the 08:01 confirmation. The first claims it, the second falls back to the
        // next unclaimed one within tolerance.
        let source = vec![
            curated("af_001", "2025-10-20T08:00:00Z", 10.0),
            curated("af_001", "2025-10-20T08:02:00Z", 10.0),
            curated("af_001", "2025-10-20T08:03:00Z", 10.0),
        ];
        let confirm =
            vec![confirmed("af_001", "2025-10-20T08:01:00Z", 10.0), confirmed("af_001", "2025-10-20T08:09:00Z", 10.0)];
        let report = reconcile(&source, &confirm, DEFAULT_MATCH_TOLERANCE);
        assert_eq!(report.summary, ReconciliationSummary { matched: 2, source_only: 1, confirmed_only: 0 });
        let claimed = report
            .details
            .iter()
            .filter_map(|r| match r {
                ReconciliationRecord::Matched { confirmed_event_time_utc, .. } => Some(confirmed_event_time_utc.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(claimed, vec!["2025-10-20T08:01:00Z", "2025-10-20T08:09:00Z"]);
    }

    #[test]
    fn invalid_timestamps_never_match() {
        let source = vec![curated("af_001", "not-a-time", 10.0), curated("af_002", "2025-10-20T08:00:00Z", 10.0)];
        let confirm = vec![confirmed("af_001", "2025-10-20T08:00:00Z", 10.0), confirmed("af_002", "???", 10.0)];
        let report = reconcile(&source, &confirm, DEFAULT_MATCH_TOLERANCE);
        assert_eq!(report.summary, ReconciliationSummary { matched: 0, source_only: 2, confirmed_only: 2 });
    }

    #[test]
    fn every_record_is_accounted_for() {
        let source = vec![
            curated("af_002", "2025-10-20T09:00:00Z", 1.0),
            curated("af_001", "2025-10-20T08:00:00Z", 1.0),
            curated("af_002", "2025-10-20T09:30:00Z", 1.0),
            curated("af_001", "2025-10-20T12:00:00Z", 1.0),
        ];
        let confirm = vec![
            confirmed("af_001", "2025-10-20T08:03:00Z", 1.0),
            confirmed("af_002", "2025-10-20T09:29:00Z", 1.0),
            confirmed("af_004", "2025-10-20T09:29:00Z", 1.0),
            confirmed("af_002", "2025-10-20T09:31:00Z", 1.0),
        ];
        let report = reconcile(&source, &confirm, DEFAULT_MATCH_TOLERANCE);
        let s = report.summary;
        assert_eq!(s.matched + s.source_only, source.len());
        assert_eq!(s.matched + s.confirmed_only, confirm.len());
        assert_eq!(s.total(), report.details.len());
        // Identities are visited in order of first appearance
        assert_eq!(report.details[0].appsflyer_id().as_str(), "af_002");
        assert_eq!(report.details[1].appsflyer_id().as_str(), "af_002");
        assert_eq!(report.details[2].appsflyer_id().as_str(), "af_001");
    }

    #[test]
    fn empty_inputs() {
        let report = reconcile(&[], &[], DEFAULT_MATCH_TOLERANCE);
        assert_eq!(report, ReconciliationReport::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({"summary": {"matched": 0, "source_only": 0, "confirmed_only": 0}, "details": []}));
    }

    #[test]
    fn records_serialize_with_a_type_tag() {
        let record = ReconciliationRecord::source_only(&curated("af_001", "2025-10-20T08:00:00Z", 10.0));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "source_only",
                "appsflyer_id": "af_001",
                "event_time_utc": "2025-10-20T08:00:00Z",
                "revenue_usd": 10.0
            })
        );
    }
}
