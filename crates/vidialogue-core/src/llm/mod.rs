pub mod mock;

pub use mock::MockModel;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VDModelError {
    #[error("model transport failed: {0}")]
    Transport(String),
    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("could not decode model response: {0}")]
    Decode(String),
    #[error("model response contained no text")]
    EmptyResponse,
    #[error("model client misconfigured: {0}")]
    Config(String),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One item of a chat-completions prompt.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: WireContent,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

impl WireMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: WireContent::Text(text.into()),
        }
    }

    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: WireContent::Parts(vec![ContentPart::Text { text: text.into() }]),
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: WireContent::Parts(vec![ContentPart::ImageUrl {
                image_url: ImageUrl { url: url.into() },
            }]),
        }
    }
}

/// A vision-language model that turns a prompt into a single reply.
///
/// Calls block the current thread and are never retried; the conversation
/// buffer holds its lock for the duration of a call.
pub trait ModelClient: Send + Sync {
    fn id(&self) -> &str;
    fn query(&self, prompt: &[WireMessage]) -> Result<String, VDModelError>;
}
