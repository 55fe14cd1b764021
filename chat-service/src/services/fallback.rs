//! Degraded replies used when the understanding service cannot answer.

use crate::models::{ChatResponse, TurnKind};
use crate::services::catalog::Catalog;

pub const TEXT_APOLOGY: &str =
    "I'm sorry, I'm having trouble processing your request. Please try again later.";
pub const IMAGE_APOLOGY: &str =
    "I'm having trouble analyzing this image. Could you tell me what you're looking for?";

const TEXT_FEATURED_COUNT: usize = 2;
const IMAGE_FEATURED_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackComposer;

impl FallbackComposer {
    pub fn apology(kind: TurnKind) -> &'static str {
        match kind {
            TurnKind::Text => TEXT_APOLOGY,
            TurnKind::Image => IMAGE_APOLOGY,
        }
    }

    pub fn featured_count(kind: TurnKind) -> usize {
        match kind {
            TurnKind::Text => TEXT_FEATURED_COUNT,
            TurnKind::Image => IMAGE_FEATURED_COUNT,
        }
    }

    /// Fixed apology plus a few featured products. Never fails.
    pub async fn compose(&self, kind: TurnKind, catalog: &dyn Catalog) -> ChatResponse {
        let products = match catalog.featured_products(Self::featured_count(kind)).await {
            Ok(products) => products,
            Err(e) => {
                tracing::warn!(
                    kind = %kind,
                    error = %e,
                    "Featured products unavailable for fallback reply"
                );
                Vec::new()
            }
        };

        ChatResponse {
            message: Self::apology(kind).to_string(),
            products,
            faqs: Vec::new(),
        }
    }
}
