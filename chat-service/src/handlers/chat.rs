use crate::models::{ChatResponse, ClientSession, ImageUpload, TextTurnPayload};
use crate::AppState;
use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::JsonRejection,
        State,
    },
    Extension, Json,
};
use service_core::error::AppError;
use service_core::middleware::tracing::RequestId;

/// Multipart field carrying the uploaded image.
pub const IMAGE_FIELD: &str = "image";

/// `POST /api/chat`: one text turn, optionally with a base64 image.
pub async fn chat_handler(
    State(state): State<AppState>,
    ClientSession(session_id): ClientSession,
    request_id: Option<Extension<RequestId>>,
    payload: Result<Json<TextTurnPayload>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(payload) = payload?;

    tracing::info!(
        session_id = %session_id,
        request_id = request_id.as_ref().map(|Extension(id)| id.as_str()).unwrap_or("-"),
        "Text turn received"
    );

    let response = state
        .orchestrator
        .handle_text_turn(payload, session_id)
        .await?;

    Ok(Json(response))
}

/// `POST /api/process-image`: one image turn uploaded as multipart.
pub async fn process_image_handler(
    State(state): State<AppState>,
    ClientSession(session_id): ClientSession,
    request_id: Option<Extension<RequestId>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let upload = match multipart {
        Ok(multipart) => read_image_field(multipart).await,
        Err(rejection) => Err(rejection.body_text()),
    };

    tracing::info!(
        session_id = %session_id,
        request_id = request_id.as_ref().map(|Extension(id)| id.as_str()).unwrap_or("-"),
        received = matches!(upload, Ok(Some(_))),
        "Image turn received"
    );

    let response = state
        .orchestrator
        .handle_image_turn(upload, session_id)
        .await?;

    Ok(Json(response))
}

/// First `image` field of the form; other fields are skipped.
async fn read_image_field(mut multipart: Multipart) -> Result<Option<ImageUpload>, String> {
    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = field.bytes().await.map_err(|e| {
            tracing::error!("Failed to read uploaded image {}: {}", file_name, e);
            e.body_text()
        })?;

        return Ok(Some(ImageUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }

    Ok(None)
}
