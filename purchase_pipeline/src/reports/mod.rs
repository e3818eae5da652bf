//! # Report writer
//!
//! Every run produces six artifacts. Each one fully replaces the artifact of the previous run.
//!
//! | Artifact                 | Content                                 |
//! |--------------------------|-----------------------------------------|
//! | `purchases_curated.csv`  | The curated purchase table              |
//! | `reconciliation.json`    | `{summary, details}`                    |
//! | `roas_daily.json`        | ROAS for every campaign-day             |
//! | `roas_d1.json`           | ROAS on the D-1 date                    |
//! | `roas_anomaly.json`      | Anomaly scores on the D-1 date          |
//! | `arpdau_d1.json`         | ARPDAU on the D-1 date                  |
//!
//! [`ReportSink`] is the seam between the pipeline and storage. Implementors only supply
//! [`ReportSink::write_artifact`]; serialization is shared.
mod file_writer;
mod memory;

use std::fmt::Display;

use csv::WriterBuilder;
pub use file_writer::FileReportWriter;
pub use memory::MemoryReportSink;
use serde::Serialize;

use crate::{
    data_types::{CuratedPurchase, CURATED_COLUMNS},
    errors::ReportError,
    metrics::{AnomalyRecord, ArpdauRecord, RoasRecord},
    reconciliation::ReconciliationReport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Artifact {
    CuratedPurchases,
    Reconciliation,
    RoasDaily,
    RoasD1,
    RoasAnomaly,
    ArpdauD1,
}

impl Artifact {
    pub const ALL: [Artifact; 6] = [
        Artifact::CuratedPurchases,
        Artifact::Reconciliation,
        Artifact::RoasDaily,
        Artifact::RoasD1,
        Artifact::RoasAnomaly,
        Artifact::ArpdauD1,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Artifact::CuratedPurchases => "purchases_curated.csv",
            Artifact::Reconciliation => "reconciliation.json",
            Artifact::RoasDaily => "roas_daily.json",
            Artifact::RoasD1 => "roas_d1.json",
            Artifact::RoasAnomaly => "roas_anomaly.json",
            Artifact::ArpdauD1 => "arpdau_d1.json",
        }
    }
}

impl Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

pub trait ReportSink {
    /// Stores the complete contents of `artifact`, replacing any previous version.
    fn write_artifact(&self, artifact: Artifact, contents: &[u8]) -> Result<(), ReportError>;

    fn write_curated(&self, purchases: &[CuratedPurchase]) -> Result<(), ReportError> {
        let contents = curated_csv(purchases)?;
        self.write_artifact(Artifact::CuratedPurchases, &contents)
    }

    fn write_reconciliation(&self, report: &ReconciliationReport) -> Result<(), ReportError> {
        self.write_json(Artifact::Reconciliation, report)
    }

    fn write_roas_daily(&self, rows: &[RoasRecord]) -> Result<(), ReportError> {
        self.write_json(Artifact::RoasDaily, rows)
    }

    fn write_roas_d1(&self, rows: &[RoasRecord]) -> Result<(), ReportError> {
        self.write_json(Artifact::RoasD1, rows)
    }

    fn write_roas_anomalies(&self, rows: &[AnomalyRecord]) -> Result<(), ReportError> {
        self.write_json(Artifact::RoasAnomaly, rows)
    }

    fn write_arpdau_d1(&self, rows: &[ArpdauRecord]) -> Result<(), ReportError> {
        self.write_json(Artifact::ArpdauD1, rows)
    }

    fn write_json<T: Serialize + ?Sized>(&self, artifact: Artifact, value: &T) -> Result<(), ReportError> {
        let mut contents = serde_json::to_vec_pretty(value)
            .map_err(|source| ReportError::Json { artifact: artifact.file_name(), source })?;
        contents.push(b'\n');
        self.write_artifact(artifact, &contents)
    }
}

/// Renders the curated table as CSV. The header row is always written, even when there are no purchases.
pub fn curated_csv(purchases: &[CuratedPurchase]) -> Result<Vec<u8>, ReportError> {
    let artifact = Artifact::CuratedPurchases.file_name();
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(CURATED_COLUMNS).map_err(|source| ReportError::Csv { artifact, source })?;
    for purchase in purchases {
        writer.serialize(purchase).map_err(|source| ReportError::Csv { artifact, source })?;
    }
    writer.into_inner().map_err(|e| ReportError::Write { artifact, source: e.into_error() })
}
