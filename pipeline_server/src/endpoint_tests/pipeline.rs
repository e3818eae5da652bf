use std::time::Duration;

use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::helpers::{post_run, request, shell_pipeline};

const TIMEOUT: Duration = Duration::from_secs(10);

#[actix_web::test]
async fn health() {
    let (status, body) = request(TestRequest::get().uri("/health"), shell_pipeline("true", TIMEOUT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn successful_run() {
    let script = "echo 'Pipeline OK - reports written to reports'";
    let (status, body) = post_run(shell_pipeline(script, TIMEOUT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"ok": true, "returncode": 0, "stdout": "Pipeline OK - reports written to reports\n", "stderr": ""})
    );
}

#[actix_web::test]
async fn failed_run_is_not_an_http_error() {
    let script = "echo 'Pipeline failed at stage load' >&2; exit 2";
    let (status, body) = post_run(shell_pipeline(script, TIMEOUT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], false);
    assert_eq!(body["returncode"], 2);
    assert_eq!(body["stderr"], "Pipeline failed at stage load\n");
}

#[actix_web::test]
async fn long_output_is_truncated() {
    let script = "i=0; while [ $i -lt 500 ]; do printf '0123456789'; i=$((i+1)); done";
    let (status, body) = post_run(shell_pipeline(script, TIMEOUT)).await;
    assert_eq!(status, StatusCode::OK);
    let stdout = body["stdout"].as_str().unwrap();
    assert_eq!(stdout.chars().count(), 2000);
    assert!(stdout.ends_with("0123456789"));
}

#[actix_web::test]
async fn timeout() {
    let (status, body) = post_run(shell_pipeline("sleep 5", Duration::from_millis(200))).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"], "The pipeline did not finish within 200ms and was stopped");
}

#[actix_web::test]
async fn spawn_failure() {
    let mut pipeline = shell_pipeline("", TIMEOUT);
    pipeline.program = "/definitely/not/a/real/program".into();
    let (status, body) = post_run(pipeline).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("Could not start the pipeline"), "{body}");
}
