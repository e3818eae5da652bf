use std::time::Duration;

use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use log::debug;

use crate::{
    config::PipelineCommand,
    routes::{health, run_pipeline},
    runner::PipelineRunner,
};

/// A pipeline command that runs `script` in a shell.
pub fn shell_pipeline(script: &str, timeout: Duration) -> PipelineCommand {
    PipelineCommand {
        program: "sh".into(),
        args: vec!["-c".into(), script.into()],
        working_dir: None,
        timeout,
        tail_chars: 2000,
    }
}

pub async fn request(req: TestRequest, pipeline: PipelineCommand) -> (StatusCode, String) {
    let runner = web::Data::new(PipelineRunner::new(pipeline));
    let app = App::new().app_data(runner).service(health).service(run_pipeline);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = res.into_body().try_into_bytes().map(|b| String::from_utf8_lossy(&b).into_owned()).unwrap_or_default();
    (status, body)
}

pub async fn post_run(pipeline: PipelineCommand) -> (StatusCode, serde_json::Value) {
    let (status, body) = request(TestRequest::post().uri("/run-pipeline"), pipeline).await;
    let json = serde_json::from_str(&body).unwrap_or_else(|e| panic!("Response is not JSON: {e}. {body}"));
    (status, json)
}
