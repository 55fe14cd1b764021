//! Request and reply shapes exchanged with the understanding service.

use super::{FaqRef, ProductRef, TurnImage};
use serde::{Deserialize, Deserializer};

/// What the orchestrator asks the understanding service about one turn.
///
/// The wire encoding depends on the turn kind and is chosen by the gateway.
#[derive(Debug, Clone, Default)]
pub struct UnderstandingRequest {
    pub message: Option<String>,
    pub image: Option<TurnImage>,
    pub conversation_id: Option<String>,
}

/// Reply from `process-text` / `process-image`.
///
/// Every field may be missing or `null`; unknown fields such as
/// `quotation_data` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnderstandingReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub products: Option<Vec<ProductRef>>,
    #[serde(default)]
    pub faqs: Option<Vec<FaqRef>>,
    /// Numeric ids are kept as their decimal text.
    #[serde(default, deserialize_with = "conversation_id_as_text")]
    pub conversation_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConversationIdWire {
    Text(String),
    Number(serde_json::Number),
}

fn conversation_id_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<ConversationIdWire>::deserialize(deserializer)?.map(|id| match id {
            ConversationIdWire::Text(text) => text,
            ConversationIdWire::Number(number) => number.to_string(),
        }),
    )
}
