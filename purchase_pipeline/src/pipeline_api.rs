use std::fmt::Debug;

use chrono::NaiveDate;
use log::*;
use serde::Serialize;

use crate::{
    config::{PipelineConfig, PipelineOptions},
    curation::{curate_purchases, CurationStats},
    data_types::InputBatch,
    errors::{PipelineError, ReportError, Stage},
    ingest::load_inputs,
    metrics::{daily_revenue, ArpdauReport, RoasReport},
    reconciliation::{reconcile, ReconciliationReport, ReconciliationSummary},
    reports::{Artifact, FileReportWriter, ReportSink},
};

/// What a successful run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineSummary {
    pub curation: CurationStats,
    pub reconciliation: ReconciliationSummary,
    pub roas_d1: Option<NaiveDate>,
    pub roas_d1_rows: usize,
    pub anomalies: usize,
    pub anomalies_flagged: usize,
    pub arpdau_d1: Option<NaiveDate>,
    pub arpdau_d1_rows: usize,
    pub artifacts: Vec<&'static str>,
}

/// `PipelineApi` runs the stages in order over an [`InputBatch`] and hands each stage's artifacts to the sink as soon
/// as the stage completes. Artifacts already written are left in place if a later stage fails.
pub struct PipelineApi<W> {
    sink: W,
    options: PipelineOptions,
}

impl<W> Debug for PipelineApi<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PipelineApi ({:?})", self.options)
    }
}

impl<W> PipelineApi<W> {
    pub fn new(sink: W, options: PipelineOptions) -> Self {
        Self { sink, options }
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_sink(self) -> W {
        self.sink
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }
}

impl<W> PipelineApi<W>
where W: ReportSink
{
    pub fn run(&self, batch: &InputBatch) -> Result<PipelineSummary, PipelineError> {
        let mut summary = PipelineSummary::default();

        let curated = curate_purchases(&batch.purchases);
        self.sink.write_curated(&curated.purchases).map_err(|e| PipelineError::report(Stage::Curate, e))?;
        summary.curation = curated.stats;
        summary.artifacts.push(Artifact::CuratedPurchases.file_name());

        let reconciliation = reconcile(&curated.purchases, &batch.confirmed, self.options.match_tolerance);
        check_reconciliation(&reconciliation, curated.purchases.len(), batch.confirmed.len())?;
        self.sink.write_reconciliation(&reconciliation).map_err(|e| PipelineError::report(Stage::Reconcile, e))?;
        summary.reconciliation = reconciliation.summary;
        summary.artifacts.push(Artifact::Reconciliation.file_name());

        let revenue = daily_revenue(&curated.purchases);
        let roas = RoasReport::compute(&revenue, &batch.costs, self.options.anomaly)
            .map_err(|e| PipelineError::metrics(Stage::Roas, e))?;
        let write_roas = || -> Result<(), ReportError> {
            self.sink.write_roas_daily(&roas.daily)?;
            self.sink.write_roas_d1(&roas.d1_rows)?;
            self.sink.write_roas_anomalies(&roas.anomalies)
        };
        write_roas().map_err(|e| PipelineError::report(Stage::Roas, e))?;
        summary.roas_d1 = roas.d1;
        summary.roas_d1_rows = roas.d1_rows.len();
        summary.anomalies = roas.anomalies.len();
        summary.anomalies_flagged = roas.anomalies.iter().filter(|a| a.anomaly).count();
        summary.artifacts.extend([Artifact::RoasDaily, Artifact::RoasD1, Artifact::RoasAnomaly].map(|a| a.file_name()));

        let arpdau = ArpdauReport::compute(&revenue, &batch.sessions)
            .map_err(|e| PipelineError::metrics(Stage::Arpdau, e))?;
        self.sink.write_arpdau_d1(&arpdau.d1_rows).map_err(|e| PipelineError::report(Stage::Arpdau, e))?;
        summary.arpdau_d1 = arpdau.d1;
        summary.arpdau_d1_rows = arpdau.d1_rows.len();
        summary.artifacts.push(Artifact::ArpdauD1.file_name());

        Ok(summary)
    }
}

/// Every curated and every confirmed purchase must appear in exactly one reconciliation record.
fn check_reconciliation(report: &ReconciliationReport, curated: usize, confirmed: usize) -> Result<(), PipelineError> {
    let s = report.summary;
    if s.matched + s.source_only != curated || s.matched + s.confirmed_only != confirmed || s.total() != report.details.len()
    {
        let reason = format!(
            "Reconciliation does not account for every record. {curated} curated and {confirmed} confirmed purchases \
             produced {} matched, {} source only and {} confirmed only records",
            s.matched, s.source_only, s.confirmed_only
        );
        return Err(PipelineError::computation(Stage::Reconcile, reason));
    }
    Ok(())
}

/// Loads the inputs from `config.data_dir`, runs the pipeline and writes the artifacts to `config.reports_dir`.
///
/// The inputs are fully loaded and validated before the reports directory is touched, so an input error leaves no
/// trace on disk.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineSummary, PipelineError> {
    info!("🚀️ Starting data processing pipeline");
    let batch = load_inputs(&config.data_dir)?;
    let writer = FileReportWriter::new(&config.reports_dir).map_err(|e| PipelineError::report(Stage::Report, e))?;
    let api = PipelineApi::new(writer, config.options);
    let result = api.run(&batch);
    match &result {
        Ok(_) => info!("🚀️ Pipeline completed. Reports written to {}", config.reports_dir.display()),
        Err(e) => error!("🚀️ {e}"),
    }
    result
}
