//! Client for the external language/vision understanding service.
//!
//! Text turns are posted as JSON to `{base}/process-text`; image turns are
//! posted as multipart to `{base}/process-image` so the raw bytes are not
//! inflated through a JSON envelope. Each call is a single attempt bounded by
//! the configured timeout.

use crate::models::{TurnImage, TurnKind, UnderstandingReply, UnderstandingRequest};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Serialize;
use service_core::observability::TracedClientExt;
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;

/// Multipart field name expected by `process-image`.
const IMAGE_FIELD: &str = "image";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Understanding service timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Understanding service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unparseable reply: {0}")]
    Decode(String),

    #[error("Cannot encode request: {0}")]
    Encode(String),
}

impl GatewayError {
    /// Failures where another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Timeout | GatewayError::Transport(_))
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            GatewayError::Timeout => "timeout",
            GatewayError::Transport(_) => "transport",
            GatewayError::Status { .. } => "status",
            GatewayError::Decode(_) => "decode",
            GatewayError::Encode(_) => "encode",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

#[async_trait]
pub trait UnderstandingGateway: Send + Sync {
    async fn send(
        &self,
        request: &UnderstandingRequest,
        kind: TurnKind,
    ) -> Result<UnderstandingReply, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub base_url: String,
    pub timeout: Duration,
}

/// JSON body of `process-text`. `conversation_id` is sent as `null` when unknown.
#[derive(Serialize)]
struct ProcessTextBody<'a> {
    message: &'a str,
    conversation_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<Cow<'a, str>>,
}

pub struct HttpUnderstandingGateway {
    client: Client,
    base_url: String,
}

impl HttpUnderstandingGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, kind: TurnKind) -> String {
        format!("{}/{}", self.base_url, kind.endpoint())
    }

    async fn post_text(
        &self,
        request: &UnderstandingRequest,
    ) -> Result<reqwest::Response, GatewayError> {
        let image = match &request.image {
            Some(TurnImage::Encoded(data)) => Some(Cow::Borrowed(data.as_str())),
            Some(TurnImage::Upload(upload)) => Some(Cow::Owned(STANDARD.encode(&upload.bytes))),
            None => None,
        };

        let body = ProcessTextBody {
            message: request.message.as_deref().unwrap_or_default(),
            conversation_id: request.conversation_id.as_deref(),
            image,
        };

        Ok(self
            .client
            .traced_post(&self.url(TurnKind::Text))
            .json(&body)
            .send()
            .await?)
    }

    async fn post_image(
        &self,
        request: &UnderstandingRequest,
    ) -> Result<reqwest::Response, GatewayError> {
        let part = match &request.image {
            Some(TurnImage::Upload(upload)) => {
                file_part(upload.bytes.clone(), &upload.file_name, &upload.content_type)
            }
            Some(TurnImage::Encoded(data)) => {
                let bytes = STANDARD
                    .decode(data)
                    .map_err(|e| GatewayError::Encode(e.to_string()))?;
                file_part(bytes, "image.jpg", "image/jpeg")
            }
            None => {
                return Err(GatewayError::Encode(
                    "image turn without an image".to_string(),
                ))
            }
        };

        Ok(self
            .client
            .traced_post(&self.url(TurnKind::Image))
            .multipart(Form::new().part(IMAGE_FIELD, part))
            .send()
            .await?)
    }
}

fn file_part(bytes: Vec<u8>, file_name: &str, content_type: &str) -> Part {
    let part = Part::bytes(bytes.clone()).file_name(file_name.to_string());
    match part.mime_str(content_type) {
        Ok(part) => part,
        Err(_) => {
            tracing::debug!(content_type = %content_type, "Dropping unparseable upload content type");
            Part::bytes(bytes).file_name(file_name.to_string())
        }
    }
}

#[async_trait]
impl UnderstandingGateway for HttpUnderstandingGateway {
    async fn send(
        &self,
        request: &UnderstandingRequest,
        kind: TurnKind,
    ) -> Result<UnderstandingReply, GatewayError> {
        tracing::debug!(
            kind = %kind,
            has_text = request.message.is_some(),
            has_image = request.image.is_some(),
            has_conversation = request.conversation_id.is_some(),
            "Sending turn to understanding service"
        );

        let response = match kind {
            TurnKind::Text => self.post_text(request).await?,
            TurnKind::Image => self.post_image(request).await?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice::<UnderstandingReply>(&bytes)
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let gateway = HttpUnderstandingGateway::new(GatewaySettings {
            base_url: "http://llm:5100/".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(gateway.url(TurnKind::Text), "http://llm:5100/process-text");
        assert_eq!(gateway.url(TurnKind::Image), "http://llm:5100/process-image");
    }

    #[test]
    fn text_body_sends_null_conversation_id() {
        let body = ProcessTextBody {
            message: "hello",
            conversation_id: None,
            image: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"message": "hello", "conversation_id": null})
        );
    }

    #[test]
    fn transient_errors() {
        assert!(GatewayError::Timeout.is_transient());
        assert!(GatewayError::Transport("refused".into()).is_transient());
        assert!(!GatewayError::Decode("bad".into()).is_transient());
        assert!(!GatewayError::Status {
            status: 500,
            body: String::new()
        }
        .is_transient());
    }
}
