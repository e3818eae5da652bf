use std::{cell::RefCell, collections::BTreeMap};

use serde_json::Value;

use crate::{
    errors::ReportError,
    reports::{Artifact, ReportSink},
};

/// Keeps artifacts in memory. Handy for tests and for callers that post-process the reports themselves.
#[derive(Debug, Default)]
pub struct MemoryReportSink {
    artifacts: RefCell<BTreeMap<Artifact, Vec<u8>>>,
}

impl MemoryReportSink {
    pub fn get(&self, artifact: Artifact) -> Option<Vec<u8>> {
        self.artifacts.borrow().get(&artifact).cloned()
    }

    /// The artifact parsed as JSON. `None` if it was never written or is not JSON.
    pub fn json(&self, artifact: Artifact) -> Option<Value> {
        self.artifacts.borrow().get(&artifact).and_then(|bytes| serde_json::from_slice(bytes).ok())
    }

    pub fn written(&self) -> Vec<Artifact> {
        self.artifacts.borrow().keys().copied().collect()
    }
}

impl ReportSink for MemoryReportSink {
    fn write_artifact(&self, artifact: Artifact, contents: &[u8]) -> Result<(), ReportError> {
        self.artifacts.borrow_mut().insert(artifact, contents.to_vec());
        Ok(())
    }
}
