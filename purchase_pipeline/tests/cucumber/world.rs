use cucumber::World;
use log::*;
use purchase_pipeline::{
    Artifact,
    InputBatch,
    MemoryReportSink,
    PipelineApi,
    PipelineOptions,
    PipelineSummary,
};
use serde_json::Value;

#[derive(Default, Debug, World)]
pub struct PipelineWorld {
    pub batch: InputBatch,
    pub options: PipelineOptions,
    pub outcome: Option<PipelineOutcome>,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub result: Result<PipelineSummary, String>,
    pub reports: MemoryReportSink,
}

impl PipelineWorld {
    pub fn run(&mut self) {
        let api = PipelineApi::new(MemoryReportSink::default(), self.options);
        let result = api.run(&self.batch).map_err(|e| e.to_string());
        debug!("Pipeline run complete: {result:?}");
        self.outcome = Some(PipelineOutcome { result, reports: api.into_sink() });
    }

    pub fn outcome(&self) -> &PipelineOutcome {
        self.outcome.as_ref().expect("The pipeline has not been run")
    }

    pub fn summary(&self) -> &PipelineSummary {
        match &self.outcome().result {
            Ok(summary) => summary,
            Err(e) => panic!("The pipeline failed: {e}"),
        }
    }

    pub fn json(&self, artifact: Artifact) -> Value {
        self.outcome().reports.json(artifact).unwrap_or_else(|| panic!("{artifact} was not written"))
    }

    pub fn curated_csv(&self) -> String {
        let bytes = self.outcome().reports.get(Artifact::CuratedPurchases).expect("No curated table was written");
        String::from_utf8(bytes).expect("The curated table is not UTF-8")
    }

    /// Records of the reconciliation artifact for `id`, in artifact order.
    pub fn reconciliation_for(&self, id: &str) -> Vec<Value> {
        match &self.json(Artifact::Reconciliation)["details"] {
            Value::Array(records) => records.iter().filter(|r| r["appsflyer_id"] == id).cloned().collect(),
            v => panic!("Reconciliation details are not a list: {v}"),
        }
    }

    /// The row of a JSON list artifact for `campaign`.
    pub fn row_for(&self, artifact: Artifact, campaign: &str) -> Value {
        match self.json(artifact) {
            Value::Array(rows) => rows
                .into_iter()
                .find(|r| r["campaign"] == campaign)
                .unwrap_or_else(|| panic!("No row for {campaign} in {artifact}")),
            v => panic!("{artifact} is not a list: {v}"),
        }
    }
}

