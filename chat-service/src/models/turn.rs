use super::SessionId;
use serde::Deserialize;
use std::fmt;

/// Which kind of inbound turn is being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnKind {
    Text,
    Image,
}

impl TurnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnKind::Text => "text",
            TurnKind::Image => "image",
        }
    }

    /// Operation name on the understanding service.
    pub fn endpoint(&self) -> &'static str {
        match self {
            TurnKind::Text => "process-text",
            TurnKind::Image => "process-image",
        }
    }
}

impl fmt::Display for TurnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON body posted by the widget to `/api/chat`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextTurnPayload {
    pub message: Option<String>,
    /// Base64 image, with or without a `data:` URL prefix.
    #[serde(default, alias = "images")]
    pub image: Option<String>,
}

/// A file received through the multipart `image` field.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnImage {
    /// Standard base64 text, already validated.
    Encoded(String),
    Upload(ImageUpload),
}

/// A validated, sanitized inbound turn.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub kind: TurnKind,
    pub text: Option<String>,
    pub image: Option<TurnImage>,
    pub session_id: SessionId,
}
