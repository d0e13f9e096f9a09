use actix_web::{web, App, HttpServer};
use log::info;

use pigeonhole::api::configure_routes;
use pigeonhole::app_state::AppState;
use pigeonhole::config::AppConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::load().expect("Failed to load configuration");
    log4rs::init_file(&config.logging.config_file, Default::default())
        .expect("Failed to initialize logging");

    let host = config.server.host.clone();
    let port = config.server.port;
    let workers = config.server.workers;
    let max_payload_size = config.server.max_payload_size;

    let state = AppState::from_config(config).expect("Failed to initialize application state");
    info!("Starting server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(web::PayloadConfig::default().limit(max_payload_size))
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes)
    })
    .workers(workers)
    .bind((host.as_str(), port))?
    .run()
    .await
}
