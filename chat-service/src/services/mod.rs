pub mod catalog;
pub mod fallback;
pub mod gateway;
pub mod metrics;
pub mod normalizer;
pub mod orchestrator;
pub mod session_store;

pub use catalog::{Catalog, CatalogError, JsonCatalog};
pub use fallback::FallbackComposer;
pub use gateway::{GatewayError, GatewaySettings, HttpUnderstandingGateway, UnderstandingGateway};
pub use metrics::{get_metrics, init_metrics};
pub use normalizer::NormalizeError;
pub use orchestrator::{Orchestrator, OrchestratorError, RetryPolicy};
pub use session_store::{InMemorySessionStore, SessionStore, SessionStoreError};
