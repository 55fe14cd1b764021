//! Per-turn orchestration: normalize, call the understanding service, and
//! always come back with a reply the widget can render.
//!
//! Only validation failures reach the caller. Every downstream failure is
//! absorbed into the fallback reply for the turn kind.

use crate::models::{
    ChatResponse, ChatTurn, ImageUpload, SessionId, TextTurnPayload, TurnKind,
    UnderstandingReply, UnderstandingRequest,
};
use crate::services::catalog::Catalog;
use crate::services::fallback::FallbackComposer;
use crate::services::gateway::{GatewayError, UnderstandingGateway};
use crate::services::metrics::{record_turn, record_understanding_call, TurnOutcome};
use crate::services::normalizer::{normalize_image_turn, normalize_text_turn, NormalizeError};
use crate::services::session_store::SessionStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Upper bound on a single gateway attempt, independent of the gateway's own timeout.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(35);

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Validation(#[from] NormalizeError),

    #[error("Understanding gateway failed: {0}")]
    Gateway(#[from] GatewayError),
}

/// Retries around the gateway call. Only transient failures are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retry attempts after the first call.
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::no_retry()
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::from_millis(250),
        }
    }

    pub fn with_max_retries(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }
}

pub struct Orchestrator {
    gateway: Arc<dyn UnderstandingGateway>,
    sessions: Arc<dyn SessionStore>,
    catalog: Arc<dyn Catalog>,
    fallback: FallbackComposer,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn UnderstandingGateway>,
        sessions: Arc<dyn SessionStore>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        Self {
            gateway,
            sessions,
            catalog,
            fallback: FallbackComposer,
            retry: RetryPolicy::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    pub async fn handle_text_turn(
        &self,
        payload: TextTurnPayload,
        session_id: SessionId,
    ) -> Result<ChatResponse, NormalizeError> {
        let result = match normalize_text_turn(payload, session_id) {
            Ok(turn) => self.process_turn(&turn).await,
            Err(e) => Err(e.into()),
        };
        self.conclude(TurnKind::Text, result).await
    }

    pub async fn handle_image_turn(
        &self,
        upload: Result<Option<ImageUpload>, String>,
        session_id: SessionId,
    ) -> Result<ChatResponse, NormalizeError> {
        let result = match normalize_image_turn(upload, session_id) {
            Ok(turn) => self.process_turn(&turn).await,
            Err(e) => Err(e.into()),
        };
        self.conclude(TurnKind::Image, result).await
    }

    async fn process_turn(&self, turn: &ChatTurn) -> Result<ChatResponse, OrchestratorError> {
        // Image turns carry no conversation continuity.
        let conversation_id = match turn.kind {
            TurnKind::Text => self.lookup_conversation(&turn.session_id).await,
            TurnKind::Image => None,
        };

        let request = UnderstandingRequest {
            message: turn.text.clone(),
            image: turn.image.clone(),
            conversation_id,
        };

        let reply = self.call_gateway(&request, turn.kind).await?;

        if turn.kind == TurnKind::Text {
            if let Some(conversation_id) = reply.conversation_id.clone() {
                self.remember_conversation(&turn.session_id, conversation_id)
                    .await;
            }
        }

        Ok(assemble(reply))
    }

    async fn conclude(
        &self,
        kind: TurnKind,
        result: Result<ChatResponse, OrchestratorError>,
    ) -> Result<ChatResponse, NormalizeError> {
        match result {
            Ok(response) => {
                record_turn(kind.as_str(), TurnOutcome::Answered);
                Ok(response)
            }
            Err(OrchestratorError::Validation(e)) => {
                tracing::debug!(kind = %kind, error = %e, "Rejected chat turn");
                record_turn(kind.as_str(), TurnOutcome::Rejected);
                Err(e)
            }
            Err(OrchestratorError::Gateway(e)) => {
                tracing::warn!(kind = %kind, error = %e, "Understanding service failed, sending fallback reply");
                record_turn(kind.as_str(), TurnOutcome::Fallback);
                Ok(self.fallback.compose(kind, self.catalog.as_ref()).await)
            }
        }
    }

    async fn call_gateway(
        &self,
        request: &UnderstandingRequest,
        kind: TurnKind,
    ) -> Result<UnderstandingReply, GatewayError> {
        let mut attempt = 0;

        loop {
            let started = Instant::now();
            let result =
                match tokio::time::timeout(self.call_timeout, self.gateway.send(request, kind))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(GatewayError::Timeout),
                };

            let status = match &result {
                Ok(_) => "ok",
                Err(e) => e.label(),
            };
            record_understanding_call(kind.as_str(), status, started.elapsed());

            match result {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    tracing::info!(
                        kind = %kind,
                        attempt,
                        error = %e,
                        "Retrying understanding service call"
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn lookup_conversation(&self, session_id: &SessionId) -> Option<String> {
        match self.sessions.get_conversation_id(session_id).await {
            Ok(conversation_id) => conversation_id,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Conversation lookup failed");
                None
            }
        }
    }

    async fn remember_conversation(&self, session_id: &SessionId, conversation_id: String) {
        if let Err(e) = self
            .sessions
            .set_conversation_id(session_id, conversation_id)
            .await
        {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to store conversation id");
        }
    }
}

/// Map a gateway reply onto the canonical shape, defaulting absent fields.
pub fn assemble(reply: UnderstandingReply) -> ChatResponse {
    ChatResponse {
        message: reply.response.unwrap_or_default(),
        products: reply.products.unwrap_or_default(),
        faqs: reply.faqs.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductRef;
    use serde_json::json;

    #[test]
    fn assemble_defaults_missing_fields() {
        let response = assemble(UnderstandingReply::default());
        assert_eq!(response, ChatResponse::default());
    }

    #[test]
    fn assemble_copies_fields() {
        let response = assemble(UnderstandingReply {
            response: Some("Here you go".to_string()),
            products: Some(vec![ProductRef(json!({"name": "Mug"}))]),
            faqs: None,
            conversation_id: Some("c-1".to_string()),
        });
        assert_eq!(response.message, "Here you go");
        assert_eq!(response.products.len(), 1);
        assert!(response.faqs.is_empty());
    }

    #[test]
    fn default_policy_does_not_retry() {
        assert_eq!(RetryPolicy::default().max_retries, 0);
    }
}
