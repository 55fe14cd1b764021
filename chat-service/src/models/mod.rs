pub mod response;
pub mod session;
pub mod turn;
pub mod understanding;

pub use response::{ChatResponse, FaqRef, ProductRef};
pub use session::{ClientSession, ConversationState, SessionId};
pub use turn::{ChatTurn, ImageUpload, TextTurnPayload, TurnImage, TurnKind};
pub use understanding::{UnderstandingReply, UnderstandingRequest};
