//! Direct catalog lookups used by the widget sidebar.

use crate::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use service_core::error::AppError;

const DEFAULT_SEARCH_LIMIT: usize = 4;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub category: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct FaqParams {
    #[serde(default)]
    pub q: String,
}

/// `GET /api/search`: by free text, or by category when `q` is empty.
pub async fn search_handler(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = params.map_err(|e| AppError::bad_request(e.body_text()))?;
    let query = params.q.trim();
    let category = params.category.trim();
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

    if query.is_empty() && category.is_empty() {
        return Err(AppError::bad_request("Missing search parameters"));
    }

    let products = if query.is_empty() {
        state.catalog.products_by_category(category, limit).await
    } else {
        state.catalog.search_products(query, limit).await
    }
    .map_err(|e| {
        tracing::error!(error = %e, "Catalog search failed");
        AppError::BadGateway(e.to_string())
    })?;

    Ok(Json(json!({
        "query": query,
        "category": category,
        "count": products.len(),
        "products": products,
    })))
}

/// `GET /api/faq`
pub async fn faq_handler(
    State(state): State<AppState>,
    params: Result<Query<FaqParams>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = params.map_err(|e| AppError::bad_request(e.body_text()))?;

    let faqs = state.catalog.faqs(&params.q).await.map_err(|e| {
        tracing::error!(error = %e, "FAQ lookup failed");
        AppError::BadGateway(e.to_string())
    })?;

    Ok(Json(json!({
        "query": params.q,
        "count": faqs.len(),
        "faqs": faqs,
    })))
}

/// `GET|POST /api/refresh`: reload the catalog.
pub async fn refresh_handler(State(state): State<AppState>) -> Json<Value> {
    let success = match state.catalog.refresh().await {
        Ok(success) => success,
        Err(e) => {
            tracing::error!(error = %e, "Catalog refresh failed");
            false
        }
    };

    tracing::info!(success, "Catalog refresh requested");
    Json(json!({ "success": success }))
}
