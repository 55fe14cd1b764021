//! Product and FAQ lookup used by the fallback path and the search endpoints.
//!
//! `JsonCatalog` serves a snapshot of two JSON files. Matching is plain
//! case-insensitive substring lookup in file order.

use crate::models::{FaqRef, ProductRef};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to read {path}: {reason}")]
    Load { path: String, reason: String },
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn search_products(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ProductRef>, CatalogError>;

    async fn products_by_category(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<ProductRef>, CatalogError>;

    /// Same catalog, same limit, same sequence.
    async fn featured_products(&self, limit: usize) -> Result<Vec<ProductRef>, CatalogError>;

    async fn faqs(&self, query: &str) -> Result<Vec<FaqRef>, CatalogError>;

    /// Reload the backing data. `Ok(false)` keeps the previous snapshot.
    async fn refresh(&self) -> Result<bool, CatalogError>;
}

#[derive(Debug, Default)]
struct Snapshot {
    products: Vec<Value>,
    faqs: Vec<Value>,
}

pub struct JsonCatalog {
    products_path: PathBuf,
    faqs_path: PathBuf,
    snapshot: RwLock<Snapshot>,
}

impl JsonCatalog {
    /// Load both files. Missing or malformed files yield an empty catalog.
    pub async fn load(products_path: impl Into<PathBuf>, faqs_path: impl Into<PathBuf>) -> Self {
        let catalog = Self {
            products_path: products_path.into(),
            faqs_path: faqs_path.into(),
            snapshot: RwLock::new(Snapshot::default()),
        };

        if let Err(e) = catalog.reload().await {
            tracing::warn!(error = %e, "Starting with an empty product catalog");
        }

        catalog
    }

    /// Catalog over in-memory records, without backing files.
    pub fn from_records(products: Vec<Value>, faqs: Vec<Value>) -> Self {
        Self {
            products_path: PathBuf::new(),
            faqs_path: PathBuf::new(),
            snapshot: RwLock::new(Snapshot { products, faqs }),
        }
    }

    pub async fn product_count(&self) -> usize {
        self.snapshot.read().await.products.len()
    }

    async fn reload(&self) -> Result<(), CatalogError> {
        let products = read_records(&self.products_path, "products").await?;
        let faqs = match read_records(&self.faqs_path, "faqs").await {
            Ok(faqs) => faqs,
            Err(e) => {
                tracing::warn!(error = %e, "FAQ file not loaded");
                Vec::new()
            }
        };

        tracing::info!(
            products = products.len(),
            faqs = faqs.len(),
            path = %self.products_path.display(),
            "Catalog loaded"
        );

        let mut snapshot = self.snapshot.write().await;
        snapshot.products = products;
        snapshot.faqs = faqs;
        Ok(())
    }
}

/// Accepts either a bare array or an object wrapping the array under `key`.
async fn read_records(path: &Path, key: &str) -> Result<Vec<Value>, CatalogError> {
    let load_error = |reason: String| CatalogError::Load {
        path: path.display().to_string(),
        reason,
    };

    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| load_error(e.to_string()))?;
    let value: Value = serde_json::from_slice(&raw).map_err(|e| load_error(e.to_string()))?;

    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(load_error(format!("expected an array under `{}`", key))),
        },
        _ => Err(load_error("unexpected JSON structure".to_string())),
    }
}

fn field<'a>(record: &'a Value, name: &str) -> &'a str {
    record.get(name).and_then(Value::as_str).unwrap_or_default()
}

fn is_featured(product: &Value) -> bool {
    product
        .get("featured")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn product_text(product: &Value) -> String {
    format!(
        "{} {} {}",
        field(product, "name"),
        field(product, "description"),
        field(product, "category")
    )
    .to_lowercase()
}

#[async_trait]
impl Catalog for JsonCatalog {
    async fn search_products(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ProductRef>, CatalogError> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .products
            .iter()
            .filter(|p| {
                let text = product_text(p);
                terms.iter().all(|term| text.contains(term.as_str()))
            })
            .take(limit)
            .cloned()
            .map(ProductRef)
            .collect())
    }

    async fn products_by_category(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<ProductRef>, CatalogError> {
        let needle = category.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .products
            .iter()
            .filter(|p| field(p, "category").to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .map(ProductRef)
            .collect())
    }

    async fn featured_products(&self, limit: usize) -> Result<Vec<ProductRef>, CatalogError> {
        let snapshot = self.snapshot.read().await;
        let flagged = snapshot.products.iter().filter(|p| is_featured(p));
        let rest = snapshot.products.iter().filter(|p| !is_featured(p));

        Ok(flagged
            .chain(rest)
            .take(limit)
            .cloned()
            .map(ProductRef)
            .collect())
    }

    async fn faqs(&self, query: &str) -> Result<Vec<FaqRef>, CatalogError> {
        let needle = query.trim().to_lowercase();
        let snapshot = self.snapshot.read().await;

        Ok(snapshot
            .faqs
            .iter()
            .filter(|faq| {
                needle.is_empty()
                    || field(faq, "question").to_lowercase().contains(&needle)
                    || field(faq, "answer").to_lowercase().contains(&needle)
            })
            .cloned()
            .map(FaqRef)
            .collect())
    }

    async fn refresh(&self) -> Result<bool, CatalogError> {
        match self.reload().await {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::warn!(error = %e, "Catalog refresh failed, keeping previous data");
                Ok(false)
            }
        }
    }
}
