use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Product record as produced by the catalog; passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductRef(pub Value);

/// FAQ record as produced by the catalog; passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaqRef(pub Value);

/// Canonical reply rendered by the widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub products: Vec<ProductRef>,
    pub faqs: Vec<FaqRef>,
}
