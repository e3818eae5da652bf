//! Runs the pipeline as a child process.
//!
//! Only one pipeline runs at a time. Requests that arrive while a run is in progress wait for it to finish before
//! starting their own, so two runs never write to the reports directory at once.
use std::process::{Output, Stdio};

use log::*;
use serde::Serialize;
use tokio::{process::Command, sync::Mutex, time::timeout};

use crate::{config::PipelineCommand, errors::ServerError};

/// The response body of a pipeline run that completed, successfully or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineRunResult {
    pub ok: bool,
    /// `None` if the process was terminated by a signal
    pub returncode: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug)]
pub struct PipelineRunner {
    command: PipelineCommand,
    lock: Mutex<()>,
}

impl PipelineRunner {
    pub fn new(command: PipelineCommand) -> Self {
        Self { command, lock: Mutex::new(()) }
    }

    pub fn command(&self) -> &PipelineCommand {
        &self.command
    }

    pub async fn run(&self) -> Result<PipelineRunResult, ServerError> {
        let _guard = self.lock.lock().await;
        let cmd = &self.command;
        let mut process = Command::new(&cmd.program);
        process.args(&cmd.args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
        if let Some(dir) = &cmd.working_dir {
            process.current_dir(dir);
        }
        info!("🚀️ Starting pipeline: {} {}", cmd.program, cmd.args.join(" "));
        let child = process.spawn().map_err(|e| {
            error!("🚀️ Could not start {}. {e}", cmd.program);
            ServerError::SpawnFailed(format!("{}: {e}", cmd.program))
        })?;
        // Dropping the child on timeout kills it
        let output = match timeout(cmd.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!("🚀️ Pipeline timed out after {:?} and was killed", cmd.timeout);
                return Err(ServerError::PipelineTimeout(cmd.timeout));
            },
        };
        let result = self.summarize(output);
        if result.ok {
            info!("🚀️ Pipeline completed successfully");
        } else {
            warn!("🚀️ Pipeline failed with exit code {:?}", result.returncode);
        }
        Ok(result)
    }

    fn summarize(&self, output: Output) -> PipelineRunResult {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        PipelineRunResult {
            ok: output.status.success(),
            returncode: output.status.code(),
            stdout: tail(&stdout, self.command.tail_chars).to_string(),
            stderr: tail(&stderr, self.command.tail_chars).to_string(),
        }
    }
}

/// The last `n` characters of `s`.
pub fn tail(s: &str, n: usize) -> &str {
    let len = s.chars().count();
    if len <= n {
        return s;
    }
    match s.char_indices().nth(len - n) {
        Some((i, _)) => &s[i..],
        None => "",
    }
}
