#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chat_service::models::{
    FaqRef, ProductRef, TurnKind, UnderstandingReply, UnderstandingRequest,
};
use chat_service::services::{
    Catalog, CatalogError, GatewayError, InMemorySessionStore, JsonCatalog, Orchestrator,
    SessionStore, UnderstandingGateway,
};
use chat_service::startup::{build_router, RouterSettings};
use chat_service::AppState;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Gateway double that replays scripted outcomes and records every call.
#[derive(Default)]
pub struct StubGateway {
    script: Mutex<VecDeque<Result<UnderstandingReply, GatewayError>>>,
    calls: Mutex<Vec<(UnderstandingRequest, TurnKind)>>,
}

impl StubGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, outcome: Result<UnderstandingReply, GatewayError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn reply(&self, message: &str, conversation_id: Option<&str>) {
        self.push(Ok(UnderstandingReply {
            response: Some(message.to_string()),
            products: Some(vec![ProductRef(json!({"id": 42, "name": "Blue Mug"}))]),
            faqs: Some(Vec::new()),
            conversation_id: conversation_id.map(str::to_string),
        }));
    }

    pub fn calls(&self) -> Vec<(UnderstandingRequest, TurnKind)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl UnderstandingGateway for StubGateway {
    async fn send(
        &self,
        request: &UnderstandingRequest,
        kind: TurnKind,
    ) -> Result<UnderstandingReply, GatewayError> {
        self.calls.lock().unwrap().push((request.clone(), kind));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GatewayError::Transport("no scripted reply".to_string())))
    }
}

/// Gateway that never answers.
pub struct HangingGateway;

#[async_trait]
impl UnderstandingGateway for HangingGateway {
    async fn send(
        &self,
        _request: &UnderstandingRequest,
        _kind: TurnKind,
    ) -> Result<UnderstandingReply, GatewayError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(GatewayError::Timeout)
    }
}

/// Catalog whose backend is always down.
pub struct FailingCatalog;

#[async_trait]
impl Catalog for FailingCatalog {
    async fn search_products(
        &self,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<ProductRef>, CatalogError> {
        Err(CatalogError::Unavailable("down".to_string()))
    }

    async fn products_by_category(
        &self,
        _category: &str,
        _limit: usize,
    ) -> Result<Vec<ProductRef>, CatalogError> {
        Err(CatalogError::Unavailable("down".to_string()))
    }

    async fn featured_products(&self, _limit: usize) -> Result<Vec<ProductRef>, CatalogError> {
        Err(CatalogError::Unavailable("down".to_string()))
    }

    async fn faqs(&self, _query: &str) -> Result<Vec<FaqRef>, CatalogError> {
        Err(CatalogError::Unavailable("down".to_string()))
    }

    async fn refresh(&self) -> Result<bool, CatalogError> {
        Err(CatalogError::Unavailable("down".to_string()))
    }
}

pub fn sample_catalog() -> Arc<JsonCatalog> {
    Arc::new(JsonCatalog::from_records(
        vec![
            json!({"id": 1, "name": "Desk Lamp", "category": "Lighting"}),
            json!({"id": 2, "name": "Oak Desk", "category": "Furniture", "featured": true}),
            json!({"id": 3, "name": "Floor Lamp", "category": "Lighting"}),
            json!({"id": 4, "name": "Office Chair", "category": "Furniture", "featured": true}),
            json!({"id": 5, "name": "Blue Mug", "category": "Kitchen"}),
        ],
        vec![
            json!({"question": "How long does shipping take?", "answer": "3 to 5 business days."}),
            json!({"question": "Can I return an item?", "answer": "Within 30 days of delivery."}),
        ],
    ))
}

pub struct TestContext {
    pub orchestrator: Arc<Orchestrator>,
    pub gateway: Arc<StubGateway>,
    pub sessions: Arc<InMemorySessionStore>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_catalog(sample_catalog())
    }

    pub fn with_catalog(catalog: Arc<dyn Catalog>) -> Self {
        let gateway = StubGateway::new();
        let sessions = Arc::new(InMemorySessionStore::new());
        let orchestrator = Orchestrator::new(
            gateway.clone() as Arc<dyn UnderstandingGateway>,
            sessions.clone() as Arc<dyn SessionStore>,
            catalog,
        );

        Self {
            orchestrator: Arc::new(orchestrator),
            gateway,
            sessions,
        }
    }

    pub fn router(&self) -> Router {
        build_router(
            AppState::new(self.orchestrator.clone()),
            &RouterSettings::default(),
        )
    }
}
