use super::blob::FrameBlob;
use crate::llm::{Role, WireMessage};
use std::fmt::{self, Display};

pub const SUMMARY_PREFIX: &str = "Image summary: ";

/// Textual stand-in for a run of frames. Always carries [`SUMMARY_PREFIX`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Summary(String);

impl Summary {
    pub fn new(summary: impl AsRef<str>) -> Self {
        Self(format!("{SUMMARY_PREFIX}{}", summary.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Message {
    Frame(FrameBlob),
    System(String),
    User(String),
    Assistant(String),
    FrameSummary(Summary),
}

impl Message {
    pub fn frame(bytes: impl Into<std::sync::Arc<[u8]>>) -> Self {
        Message::Frame(FrameBlob::jpeg(bytes))
    }

    pub fn frame_summary(summary: impl AsRef<str>) -> Self {
        Message::FrameSummary(Summary::new(summary))
    }

    pub fn is_frame(&self) -> bool {
        matches!(self, Message::Frame(_))
    }

    pub fn to_wire(&self) -> WireMessage {
        match self {
            Message::Frame(blob) => WireMessage::image(blob.data_uri()),
            Message::System(text) => WireMessage::system(text.as_str()),
            Message::User(text) => WireMessage::text(Role::User, text.as_str()),
            Message::Assistant(text) => WireMessage::text(Role::Assistant, text.as_str()),
            Message::FrameSummary(summary) => WireMessage::text(Role::User, summary.as_str()),
        }
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Frame(blob) => write!(f, "[frame {} bytes]", blob.len()),
            Message::System(text) => write!(f, "system: {}", text),
            Message::User(text) => write!(f, "user: {}", text),
            Message::Assistant(text) => write!(f, "assistant: {}", text),
            Message::FrameSummary(summary) => write!(f, "{}", summary.as_str()),
        }
    }
}
