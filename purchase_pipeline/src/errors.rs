use std::{fmt::Display, io, path::PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

/// Failures reading the input datasets. These are always fatal and are raised before any artifact is written.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Required file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Could not read {path}. {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("The {dataset} file is empty. A header row is required.")]
    Empty { dataset: &'static str },
    #[error("Missing required column '{column}' in the {dataset} file")]
    MissingColumn { dataset: &'static str, column: &'static str },
    #[error("Could not parse row {row} of the {dataset} file. {reason}")]
    Malformed { dataset: &'static str, row: u64, reason: String },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Could not create the reports directory {path}. {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not write {artifact}. {source}")]
    Write {
        artifact: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("Could not serialize {artifact} as JSON. {source}")]
    Json {
        artifact: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Could not serialize {artifact} as CSV. {source}")]
    Csv {
        artifact: &'static str,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("Revenue for {campaign} on {date} is not a finite number")]
    NonFiniteRevenue { campaign: String, date: NaiveDate },
}

/// The pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Curate,
    Reconcile,
    Roas,
    Arpdau,
    Report,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Load => write!(f, "load"),
            Stage::Curate => write!(f, "curate"),
            Stage::Reconcile => write!(f, "reconcile"),
            Stage::Roas => write!(f, "roas"),
            Stage::Arpdau => write!(f, "arpdau"),
            Stage::Report => write!(f, "report"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("Computation error. {0}")]
    Computation(String),
    #[error("Computation error. {0}")]
    Metrics(#[from] MetricsError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline failed at stage load: {0}")]
    Input(#[from] IngestError),
    #[error("Pipeline failed at stage {stage}: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: StageError,
    },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Input(_) => Stage::Load,
            Self::Stage { stage, .. } => *stage,
        }
    }

    /// The process exit code that the command-line tools use for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Input(_) => 2,
            Self::Stage { source: StageError::Computation(_) | StageError::Metrics(_), .. } => 3,
            Self::Stage { source: StageError::Report(_), .. } => 4,
        }
    }

    pub fn computation<S: Into<String>>(stage: Stage, reason: S) -> Self {
        Self::Stage { stage, source: StageError::Computation(reason.into()) }
    }

    pub fn metrics(stage: Stage, e: MetricsError) -> Self {
        Self::Stage { stage, source: StageError::Metrics(e) }
    }

    pub fn report(stage: Stage, e: ReportError) -> Self {
        Self::Stage { stage, source: StageError::Report(e) }
    }
}
