pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use services::{Catalog, Orchestrator};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub catalog: Arc<dyn Catalog>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        let catalog = orchestrator.catalog().clone();
        Self {
            orchestrator,
            catalog,
        }
    }
}
