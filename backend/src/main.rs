mod annotate;
mod classifier;
mod config;
mod pipeline;
mod preprocess;
mod routes;
mod storage;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use config::ServiceConfig;
use pipeline::InferenceOrchestrator;
use routes::{UploadLimits, configure_routes};
use std::env;
use storage::artifact_store::ArtifactStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = ServiceConfig::load().map_err(|e| {
        log::error!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let store = ArtifactStore::new(&config.artifacts.dir, &config.artifacts.url_path)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    log::info!(
        "Static files will be served from {}",
        std::fs::canonicalize(store.dir())
            .unwrap_or_else(|_| store.dir().to_path_buf())
            .display()
    );

    let classifier = classifier::load_or_simulate(&config.model.path);
    let orchestrator = web::Data::new(InferenceOrchestrator::new(classifier, store.clone()));
    if !orchestrator.model_loaded() {
        log::warn!("Serving simulated predictions; responses report model_loaded=false");
    }
    let limits = web::Data::new(UploadLimits {
        max_bytes: config.server.max_upload_bytes,
    });

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(orchestrator.clone())
            .app_data(limits.clone())
            .configure(|cfg| configure_routes(cfg, &store))
    })
    .bind(&bind_address)?
    .run()
    .await
}
