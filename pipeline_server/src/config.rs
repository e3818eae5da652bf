use std::{env, path::PathBuf, time::Duration};

use gbp_common::helpers::env_or_default;
use log::*;

use crate::errors::ServerError;

const DEFAULT_GBP_HOST: &str = "127.0.0.1";
const DEFAULT_GBP_PORT: u16 = 8370;
const DEFAULT_PIPELINE_COMMAND: &str = "gbptools run";
const DEFAULT_PIPELINE_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_OUTPUT_TAIL_CHARS: usize = 2000;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub pipeline: PipelineCommand,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: DEFAULT_GBP_HOST.to_string(), port: DEFAULT_GBP_PORT, pipeline: PipelineCommand::default() }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("GBP_HOST").ok().unwrap_or_else(|| DEFAULT_GBP_HOST.into());
        let port = env_or_default("GBP_PORT", DEFAULT_GBP_PORT);
        let pipeline = PipelineCommand::from_env_or_default();
        Self { host, port, pipeline }
    }
}

/// How the pipeline is launched. The server never runs the pipeline in-process; it spawns `program` with `args` as a
/// child process and waits for it, up to `timeout`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineCommand {
    pub program: String,
    pub args: Vec<String>,
    /// The working directory of the child process. Defaults to the server's own.
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
    /// stdout and stderr are truncated to their last `tail_chars` characters in the response
    pub tail_chars: usize,
}

impl Default for PipelineCommand {
    fn default() -> Self {
        Self {
            program: "gbptools".to_string(),
            args: vec!["run".to_string()],
            working_dir: None,
            timeout: DEFAULT_PIPELINE_TIMEOUT,
            tail_chars: DEFAULT_OUTPUT_TAIL_CHARS,
        }
    }
}

impl PipelineCommand {
    /// Splits a command line on whitespace into a program and its arguments.
    pub fn from_command_line(command: &str) -> Result<Self, ServerError> {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts
            .next()
            .ok_or_else(|| ServerError::ConfigurationError("The pipeline command is empty".to_string()))?;
        Ok(Self { program, args: parts.collect(), ..Default::default() })
    }

    pub fn from_env_or_default() -> Self {
        let command = env_or_default("GBP_PIPELINE_COMMAND", DEFAULT_PIPELINE_COMMAND.to_string());
        let mut result = Self::from_command_line(&command).unwrap_or_else(|e| {
            error!("🪛️ {e}. Using the default pipeline command, {DEFAULT_PIPELINE_COMMAND}, instead.");
            Self::default()
        });
        let timeout_secs = env_or_default("GBP_PIPELINE_TIMEOUT_SECS", DEFAULT_PIPELINE_TIMEOUT.as_secs());
        if timeout_secs == 0 {
            warn!("🪛️ GBP_PIPELINE_TIMEOUT_SECS must be positive. Using the default instead.");
        } else {
            result.timeout = Duration::from_secs(timeout_secs);
        }
        result.tail_chars = env_or_default("GBP_OUTPUT_TAIL_CHARS", DEFAULT_OUTPUT_TAIL_CHARS);
        result.working_dir = env::var("GBP_PIPELINE_WORKDIR").ok().map(PathBuf::from);
        info!(
            "🪛️ Pipeline command: {} {}. Timeout: {}s",
            result.program,
            result.args.join(" "),
            result.timeout.as_secs()
        );
        result
    }
}
