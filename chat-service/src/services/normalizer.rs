//! Validation and sanitization of inbound turns.
//!
//! Sanitization here is string hygiene before text leaves the service; it is
//! not an injection defence for anything downstream.

use crate::models::{ChatTurn, ImageUpload, SessionId, TextTurnPayload, TurnImage, TurnKind};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use service_core::error::AppError;
use thiserror::Error;

static MARKUP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("markup pattern is valid"));

/// Tokens removed from chat text after markup stripping.
const STRIPPED_TOKENS: [&str; 4] = ["'", "\"", ";", "--"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Missing {0} parameter")]
    MissingField(&'static str),

    #[error("Message is empty")]
    EmptyTurn,

    #[error("Image is not valid base64")]
    InvalidImage,

    #[error("No image uploaded or upload error")]
    Upload(String),
}

impl From<NormalizeError> for AppError {
    fn from(err: NormalizeError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

/// Strip markup and a handful of quoting/comment tokens from chat text.
pub fn sanitize_input(input: &str) -> String {
    let mut sanitized = MARKUP_TAG.replace_all(input, "").into_owned();
    for token in STRIPPED_TOKENS {
        sanitized = sanitized.replace(token, "");
    }
    sanitized.trim().to_string()
}

/// Validate a JSON text turn.
pub fn normalize_text_turn(
    payload: TextTurnPayload,
    session_id: SessionId,
) -> Result<ChatTurn, NormalizeError> {
    let message = payload
        .message
        .ok_or(NormalizeError::MissingField("message"))?;
    let text = sanitize_input(&message);

    let image = match payload.image.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(TurnImage::Encoded(decode_check(raw)?)),
        _ => None,
    };

    if text.is_empty() && image.is_none() {
        return Err(NormalizeError::EmptyTurn);
    }

    Ok(ChatTurn {
        kind: TurnKind::Text,
        text: (!text.is_empty()).then_some(text),
        image,
        session_id,
    })
}

/// Validate a multipart image turn. `None` means no file arrived.
pub fn normalize_image_turn(
    upload: Result<Option<ImageUpload>, String>,
    session_id: SessionId,
) -> Result<ChatTurn, NormalizeError> {
    let upload = upload
        .map_err(NormalizeError::Upload)?
        .ok_or_else(|| NormalizeError::Upload("no file in field `image`".to_string()))?;

    if upload.bytes.is_empty() {
        return Err(NormalizeError::Upload(format!(
            "{} is empty",
            upload.file_name
        )));
    }

    Ok(ChatTurn {
        kind: TurnKind::Image,
        text: None,
        image: Some(TurnImage::Upload(upload)),
        session_id,
    })
}

/// Drop an optional `data:<mime>;base64,` prefix and check the rest decodes.
fn decode_check(raw: &str) -> Result<String, NormalizeError> {
    let encoded = match raw.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or(NormalizeError::InvalidImage)?,
        None => raw,
    };

    STANDARD
        .decode(encoded)
        .map_err(|_| NormalizeError::InvalidImage)?;

    Ok(encoded.to_string())
}
