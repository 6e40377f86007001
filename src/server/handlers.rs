use super::types::{ErrorResponse, PredictionResponse, StatusResponse};
use crate::{
    Error, Result,
    engine::{ImageUpload, PredictionRequest, Predictor},
};
use axum::{
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const STATUS_MESSAGE: &str = "Healer API (MedGemma) is running";
pub const INVALID_IMAGE_DETAIL: &str = "Uploaded file is not a valid image";

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
}

/// Request failure converted to `{"detail": ...}` at the route boundary.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

/// Status code for a per-request failure.
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::InvalidImage(_) => StatusCode::BAD_REQUEST,
        Error::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let detail = match &self.0 {
            Error::InvalidImage(_) => INVALID_IMAGE_DETAIL.to_string(),
            Error::InvalidRequest(msg) | Error::PayloadTooLarge(msg) => msg.clone(),
            other => format!("Prediction failed: {}", other),
        };
        (status, Json(ErrorResponse { detail })).into_response()
    }
}

pub async fn home() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: STATUS_MESSAGE.to_string(),
    })
}

pub async fn predict(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<PredictionResponse>, ApiError> {
    let multipart = multipart.map_err(|e| Error::invalid_request(e.body_text()))?;
    let request = read_prediction_form(multipart).await?;

    info!(
        "Received prediction request (image: {})",
        request.image.is_some()
    );

    match state.predictor.predict(request).await {
        Ok(prediction) => Ok(Json(PredictionResponse { prediction })),
        Err(e) => {
            match status_for(&e) {
                StatusCode::INTERNAL_SERVER_ERROR => error!("Prediction failed: {}", e),
                _ => warn!("Rejected prediction request: {}", e),
            }
            Err(e.into())
        }
    }
}

/// Collects `question` and the optional `image_file` from the form.
///
/// A zero-length file part counts as no image. Unknown fields are ignored.
async fn read_prediction_form(mut multipart: Multipart) -> Result<PredictionRequest> {
    let mut question = None;
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| form_error("Malformed multipart body", e))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("question") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| form_error("Unreadable question field", e))?;
                question = Some(text);
            }
            Some("image_file") => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| form_error("Unreadable image_file field", e))?;
                if !bytes.is_empty() {
                    image = Some(ImageUpload {
                        bytes: bytes.to_vec(),
                        content_type,
                    });
                }
            }
            _ => {}
        }
    }

    let question = question.ok_or_else(|| Error::invalid_request("question field is required"))?;

    Ok(PredictionRequest { question, image })
}

/// Body-limit overruns keep their 413; anything else is a malformed form.
fn form_error(context: &str, e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge(e.body_text())
    } else {
        Error::invalid_request(format!("{}: {}", context, e))
    }
}
