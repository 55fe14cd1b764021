use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tower_sessions::Session;
use uuid::Uuid;

/// Cookie-session key holding the chat session token.
const CHAT_SESSION_KEY: &str = "chat_session_id";

/// Opaque client session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Conversation continuity for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    pub session_id: SessionId,
    pub conversation_id: Option<String>,
}

/// Chat session of the caller, created on first use.
#[derive(Debug, Clone)]
pub struct ClientSession(pub SessionId);

#[async_trait]
impl<S> FromRequestParts<S> for ClientSession
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to extract session",
                )
                    .into_response()
            })?;

        let existing: Option<String> = session.get(CHAT_SESSION_KEY).await.unwrap_or(None);
        if let Some(id) = existing {
            return Ok(ClientSession(SessionId::new(id)));
        }

        let session_id = SessionId::generate();
        if let Err(e) = session.insert(CHAT_SESSION_KEY, session_id.as_str()).await {
            // The turn still gets answered; it just won't be linked to the next one.
            tracing::warn!(error = %e, "Failed to persist chat session id");
        }

        Ok(ClientSession(session_id))
    }
}
