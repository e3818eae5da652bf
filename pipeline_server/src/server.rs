use std::sync::Arc;

use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{health, run_pipeline},
    runner::PipelineRunner,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let srv = create_server_instance(config)?;
    srv.await.map_err(ServerError::from)
}

pub fn create_server_instance(config: ServerConfig) -> Result<Server, ServerError> {
    // One runner for all workers, so that runs are serialized across the whole server
    let runner = web::Data::from(Arc::new(PipelineRunner::new(config.pipeline.clone())));
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("gbp::access_log"))
            .app_data(runner.clone())
            .service(health)
            .service(run_pipeline)
    })
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
