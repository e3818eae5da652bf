use std::path::PathBuf;

use chrono::Duration;
use gbp_common::helpers::env_or_default;
use log::*;

use crate::{
    metrics::{
        anomaly::{DEFAULT_ANOMALY_RATIO, DEFAULT_ANOMALY_WINDOW_DAYS},
        AnomalyConfig,
    },
    reconciliation::DEFAULT_MATCH_TOLERANCE,
};

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_REPORTS_DIR: &str = "reports";

/// The tunable parts of a pipeline run that do not concern where files live.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    /// The widest gap between a purchase event and its confirmation that still counts as a match
    pub match_tolerance: Duration,
    pub anomaly: AnomalyConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { match_tolerance: DEFAULT_MATCH_TOLERANCE, anomaly: AnomalyConfig::default() }
    }
}

impl PipelineOptions {
    /// Sets the match tolerance. A negative or out-of-range number of minutes is logged and the current tolerance is
    /// kept.
    pub fn with_tolerance_mins(mut self, minutes: i64) -> Self {
        match Duration::try_minutes(minutes).filter(|d| *d >= Duration::zero()) {
            Some(tolerance) => self.match_tolerance = tolerance,
            None => warn!(
                "🪛️ {minutes} minutes is not a usable match tolerance. Keeping {} minutes.",
                self.match_tolerance.num_minutes()
            ),
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub options: PipelineOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            reports_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
            options: PipelineOptions::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(data_dir: P, reports_dir: Q) -> Self {
        Self { data_dir: data_dir.into(), reports_dir: reports_dir.into(), options: PipelineOptions::default() }
    }

    /// Reads the `GBP_*` environment variables. Anything missing or invalid falls back to its default.
    pub fn from_env_or_default() -> Self {
        let data_dir = PathBuf::from(env_or_default("GBP_DATA_DIR", DEFAULT_DATA_DIR.to_string()));
        let reports_dir = PathBuf::from(env_or_default("GBP_REPORTS_DIR", DEFAULT_REPORTS_DIR.to_string()));
        let tolerance_mins = env_or_default("GBP_MATCH_TOLERANCE_MINS", DEFAULT_MATCH_TOLERANCE.num_minutes());
        let mut window_days = env_or_default("GBP_ANOMALY_WINDOW_DAYS", DEFAULT_ANOMALY_WINDOW_DAYS);
        if window_days == 0 {
            warn!("🪛️ GBP_ANOMALY_WINDOW_DAYS must be at least 1. Using the default instead.");
            window_days = DEFAULT_ANOMALY_WINDOW_DAYS;
        }
        let mut ratio = env_or_default("GBP_ANOMALY_RATIO", DEFAULT_ANOMALY_RATIO);
        if !(ratio.is_finite() && ratio > 0.0) {
            warn!("🪛️ GBP_ANOMALY_RATIO must be a positive number, not {ratio}. Using the default instead.");
            ratio = DEFAULT_ANOMALY_RATIO;
        }
        let options = PipelineOptions::default().with_tolerance_mins(tolerance_mins);
        let options = PipelineOptions { anomaly: AnomalyConfig { window_days, ratio }, ..options };
        debug!(
            "🪛️ Pipeline configured. Data: {}, reports: {}, tolerance: {} mins",
            data_dir.display(),
            reports_dir.display(),
            options.match_tolerance.num_minutes()
        );
        Self { data_dir, reports_dir, options }
    }
}
