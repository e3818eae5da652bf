//! Purchase Pipeline
//!
//! An offline batch pipeline that reconciles in-game purchase events against the confirmed purchase stream, and
//! derives marketing efficiency metrics (ROAS and ARPDAU) with trend-based anomaly detection.
//!
//! The pipeline runs five stages, strictly in order, each fully materialising its output before the next begins:
//!
//! 1. Ingestion ([`mod@ingest`]). Reads the four CSV exports, validates their headers and coerces them into typed
//!    records. Any failure here is fatal, and nothing is written.
//! 2. Curation ([`mod@curation`]). Normalises and de-duplicates raw purchase events, and zeroes the revenue of
//!    charged-back receipts.
//! 3. Reconciliation ([`mod@reconciliation`]). Matches curated purchases to confirmed purchases by identity and nearest
//!    timestamp within a tolerance window.
//! 4. Metrics ([`mod@metrics`]). Revenue by day and campaign, ROAS against ad spend, D-1 anomaly scoring and ARPDAU.
//! 5. Reports ([`mod@reports`]). Each stage's artifacts are handed to a [`ReportSink`] as soon as the stage completes.
//!
//! [`PipelineApi`] drives stages 2-5 over an in-memory [`InputBatch`]. [`run_pipeline`] wires the whole thing up
//! against a data directory and a reports directory.
pub mod config;
pub mod curation;
pub mod data_types;
pub mod errors;
pub mod helpers;
pub mod ingest;
pub mod metrics;
mod pipeline_api;
pub mod reconciliation;
pub mod reports;

pub use config::{PipelineConfig, PipelineOptions};
pub use data_types::InputBatch;
pub use errors::{IngestError, MetricsError, PipelineError, ReportError, Stage, StageError};
pub use ingest::load_inputs;
pub use pipeline_api::{run_pipeline, PipelineApi, PipelineSummary};
pub use reports::{Artifact, FileReportWriter, MemoryReportSink, ReportSink};
