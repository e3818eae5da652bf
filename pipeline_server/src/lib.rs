//! # Pipeline server
//! A small HTTP front for the purchase reconciliation and metrics pipeline. It is responsible for:
//! Launching the pipeline on request, as a child process.
//! Enforcing a wall-clock timeout on each run.
//! Reporting the exit status and the tail of the pipeline's output.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/run-pipeline` (POST): Runs the pipeline and returns `{ok, returncode, stdout, stderr}`.
pub mod cli;
pub mod config;
pub mod errors;
pub mod routes;
pub mod runner;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
