pub mod blob;
pub mod compaction;
pub mod message;
pub mod prompts;

use crate::llm::{ModelClient, VDModelError, WireMessage};
use message::Message;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub const DEFAULT_BUFFER_SIZE: usize = 4;
pub const DEFAULT_RECAP_LIMIT: usize = 3;

#[derive(Debug, Error)]
pub enum VDConversationError {
    #[error(transparent)]
    Model(#[from] VDModelError),
    #[error("invalid conversation config: {0}")]
    InvalidConfig(String),
    #[error("conversation invariant violated: {0}")]
    InvariantViolated(String),
    #[error("conversation lock poisoned by a panicking thread")]
    LockPoisoned,
}

#[derive(Clone, Debug)]
pub struct ConversationConfig {
    /// Frame count at which the oldest frames get summarized.
    pub buffer_size: usize,
    /// Upper bound on the span summarized in one pass.
    pub recap_limit: usize,
    pub persona: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            recap_limit: DEFAULT_RECAP_LIMIT,
            persona: prompts::PERSONA_PROMPT.to_string(),
        }
    }
}

impl ConversationConfig {
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_recap_limit(mut self, recap_limit: usize) -> Self {
        self.recap_limit = recap_limit;
        self
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    // Compaction relies on buffer_size > recap_limit >= 1 to always find a stopping point.
    pub fn validate(&self) -> Result<(), VDConversationError> {
        if self.recap_limit == 0 {
            return Err(VDConversationError::InvalidConfig(
                "recap limit must be at least 1".to_string(),
            ));
        }
        if self.buffer_size <= self.recap_limit {
            return Err(VDConversationError::InvalidConfig(format!(
                "buffer size ({}) must be greater than recap limit ({})",
                self.buffer_size, self.recap_limit
            )));
        }
        Ok(())
    }
}

#[derive(Default)]
struct History {
    messages: Vec<Message>,
    frame_count: usize,
}

/// The running dialogue shared by the frame feed and the text feed.
///
/// Every mutation holds one lock for its whole duration, model call included, so
/// frame producers stall while a reply or a summary is being generated.
pub struct Conversation {
    client: Arc<dyn ModelClient>,
    config: ConversationConfig,
    history: Mutex<History>,
}

impl Conversation {
    pub fn new(
        client: Arc<dyn ModelClient>,
        config: ConversationConfig,
    ) -> Result<Self, VDConversationError> {
        config.validate()?;
        Ok(Self {
            client,
            config,
            history: Mutex::new(History::default()),
        })
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, History>, VDConversationError> {
        self.history
            .lock()
            .map_err(|_| VDConversationError::LockPoisoned)
    }

    /// Records a user turn and returns the model's reply.
    ///
    /// On failure the user message stays in the history and no assistant turn is added.
    pub fn add_text(&self, text: impl Into<String>) -> Result<String, VDConversationError> {
        let mut history = self.lock()?;
        history.messages.push(Message::User(text.into()));
        tracing::debug!(len = history.messages.len(), "user turn appended");

        let prompt: Vec<WireMessage> = std::iter::once(WireMessage::system(&self.config.persona))
            .chain(history.messages.iter().map(Message::to_wire))
            .collect();
        let answer = self.client.query(&prompt).inspect_err(|e| {
            tracing::warn!(client = self.client.id(), error = %e, "reply generation failed");
        })?;

        history.messages.push(Message::Assistant(answer.clone()));
        Ok(answer)
    }

    /// Appends a frame and compacts the oldest frames once the buffer is full.
    ///
    /// If summarization fails the frame stays appended and the history is otherwise
    /// untouched; the next frame retries the compaction.
    pub fn add_frame(&self, image: impl Into<Arc<[u8]>>) -> Result<(), VDConversationError> {
        let mut history = self.lock()?;
        history.messages.push(Message::frame(image));
        history.frame_count += 1;
        tracing::debug!(frames = history.frame_count, "frame appended");

        if history.frame_count >= self.config.buffer_size {
            self.compact(&mut history)?;
        }
        Ok(())
    }

    fn compact(&self, history: &mut History) -> Result<(), VDConversationError> {
        let plan = compaction::plan(&history.messages, self.config.recap_limit)?;
        let prompt = compaction::summary_prompt(&history.messages, &plan);
        let summary = self.client.query(&prompt).inspect_err(|e| {
            tracing::warn!(client = self.client.id(), error = %e, "frame summarization failed");
        })?;

        let messages = std::mem::take(&mut history.messages);
        history.messages = compaction::apply(messages, &plan, &summary);
        history.frame_count -= plan.frames_removed;
        tracing::info!(
            removed = plan.frames_removed,
            frames = history.frame_count,
            len = history.messages.len(),
            "frames compacted into summary"
        );
        Ok(())
    }

    pub fn frame_count(&self) -> Result<usize, VDConversationError> {
        Ok(self.lock()?.frame_count)
    }

    pub fn len(&self) -> Result<usize, VDConversationError> {
        Ok(self.lock()?.messages.len())
    }

    pub fn is_empty(&self) -> Result<bool, VDConversationError> {
        Ok(self.lock()?.messages.is_empty())
    }

    pub fn history(&self) -> Result<Vec<Message>, VDConversationError> {
        Ok(self.lock()?.messages.clone())
    }

    pub fn transcript(&self) -> Result<String, VDConversationError> {
        let history = self.lock()?;
        Ok(history
            .messages
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
