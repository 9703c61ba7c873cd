use super::{ModelClient, VDModelError, WireMessage};
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::Duration,
};

pub const DEFAULT_MOCK_ANSWER: &str = "This is a mock answer.";

/// Deterministic stand-in for a real model. Always answers with the same text.
#[derive(Debug)]
pub struct MockModel {
    answer: String,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            answer: DEFAULT_MOCK_ANSWER.to_string(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = answer.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelClient for MockModel {
    fn id(&self) -> &str {
        "mock"
    }

    fn query(&self, prompt: &[WireMessage]) -> Result<String, VDModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(items = prompt.len(), "mock model queried");
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        Ok(self.answer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn test_mock_answers_and_counts_calls() {
        let model = MockModel::new();
        let prompt = [WireMessage::text(Role::User, "hi")];
        assert_eq!(model.query(&prompt).unwrap(), DEFAULT_MOCK_ANSWER);
        assert_eq!(model.query(&[]).unwrap(), DEFAULT_MOCK_ANSWER);
        assert_eq!(model.calls(), 2);
    }

    #[test]
    fn test_mock_custom_answer() {
        let model = MockModel::new().with_answer("a red mug on a desk");
        assert_eq!(model.query(&[]).unwrap(), "a red mug on a desk");
    }
}
