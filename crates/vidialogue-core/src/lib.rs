pub mod context;
pub mod llm;

pub use context::{
    Conversation, ConversationConfig, VDConversationError,
    message::{Message, Summary},
};
pub use llm::{MockModel, ModelClient, VDModelError, WireMessage};
