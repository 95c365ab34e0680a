use crate::pipeline::{InferenceOrchestrator, PipelineError};
use crate::storage::artifact_store::{ArtifactStore, RequestOrigin};
use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::http::{StatusCode, header};
use actix_web::{HttpRequest, HttpResponse, ResponseError, web};
use chrono::{SecondsFormat, Utc};
use futures::TryStreamExt;
use log::{error, info, warn};
use shared::{HealthResponse, InferenceResponse, ServiceInfo};
use std::collections::BTreeMap;

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_bytes: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No file uploaded")]
    NoFileUploaded,
    #[error("File too large: limit is {0} bytes")]
    FileTooLarge(usize),
    #[error("Malformed upload: {0}")]
    Multipart(#[from] actix_multipart::MultipartError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Inference worker failed: {0}")]
    Worker(#[from] actix_web::error::BlockingError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoFileUploaded | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::FileTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Pipeline(PipelineError::Decode(_)) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(_) | ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Error in predict endpoint: {}", self);
        } else {
            warn!("Rejected prediction request: {}", self);
        }
        HttpResponse::build(status).json(InferenceResponse::failed(self.to_string()))
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, store: &ArtifactStore) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/health").route(web::get().to(health_check)))
        .service(web::resource("/predict").route(web::post().to(handle_predict)))
        .service(Files::new(store.url_path(), store.dir()));
}

async fn home(orchestrator: web::Data<InferenceOrchestrator>) -> HttpResponse {
    let endpoints = BTreeMap::from([
        (
            "predict".to_string(),
            "/predict [POST] - Send MRI image for analysis".to_string(),
        ),
        (
            "health".to_string(),
            "/health [GET] - Check API health status".to_string(),
        ),
    ]);
    HttpResponse::Ok().json(ServiceInfo {
        message: "Alzheimer's Stage Prediction API is running.".to_string(),
        endpoints,
        model_loaded: orchestrator.model_loaded(),
    })
}

async fn health_check(orchestrator: web::Data<InferenceOrchestrator>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: orchestrator.model_loaded(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    })
}

async fn handle_predict(
    req: HttpRequest,
    orchestrator: web::Data<InferenceOrchestrator>,
    limits: web::Data<UploadLimits>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().starts_with("multipart/"));
    if !is_multipart {
        return Err(ApiError::NoFileUploaded);
    }

    let image_data = read_upload(payload, limits.max_bytes)
        .await?
        .ok_or(ApiError::NoFileUploaded)?;

    let origin = {
        let conn = req.connection_info();
        RequestOrigin::new(conn.scheme(), conn.host())
    };
    info!(
        "Received {} byte upload from {}",
        image_data.len(),
        origin.host
    );

    let worker = orchestrator.clone();
    let response = web::block(move || worker.run(&image_data, &origin)).await??;
    Ok(HttpResponse::Ok().json(response))
}

/// Collects the `file` field, skipping any other form fields.
async fn read_upload(mut payload: Multipart, max_bytes: usize) -> Result<Option<Vec<u8>>, ApiError> {
    let mut upload = None;
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            while field.try_next().await?.is_some() {}
            continue;
        }
        let mut image_data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if image_data.len() + chunk.len() > max_bytes {
                return Err(ApiError::FileTooLarge(max_bytes));
            }
            image_data.extend_from_slice(&chunk);
        }
        upload = Some(image_data);
    }
    Ok(upload)
}
