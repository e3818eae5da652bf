//! Request handler definitions
//!
//! The pipeline runs for minutes, so the handler awaits the child process asynchronously instead of blocking the
//! worker thread.
use actix_web::{get, post, web, HttpResponse, Responder};
use log::*;

use crate::{errors::ServerError, runner::PipelineRunner};

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

/// Route handler for the pipeline trigger.
///
/// Runs the pipeline to completion and returns `{ok, returncode, stdout, stderr}`. A pipeline that exits with a
/// non-zero code is still a 200 response, with `ok` set to false. A run that exceeds the configured timeout is killed
/// and reported as a 504.
#[post("/run-pipeline")]
pub async fn run_pipeline(runner: web::Data<PipelineRunner>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ Received pipeline run request");
    let result = runner.run().await?;
    Ok(HttpResponse::Ok().json(result))
}
