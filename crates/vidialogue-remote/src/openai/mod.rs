use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vidialogue_core::llm::{ModelClient, VDModelError, WireMessage};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 200;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const MODEL_VAR: &str = "VIDIALOGUE_MODEL";

#[derive(Clone, Debug)]
pub struct OpenAIConfig {
    pub api_key: String,
    /// Always ends with `/`.
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_env() -> Result<Self, VDModelError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, VDModelError> {
        let api_key = lookup(API_KEY_VAR)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| VDModelError::Config(format!("{API_KEY_VAR} is not set")))?;
        let mut config = Self::new(api_key);
        if let Some(url) = lookup(BASE_URL_VAR) {
            config = config.with_base_url(url);
        }
        if let Some(model) = lookup(MODEL_VAR) {
            config = config.with_model(model);
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut url = base_url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        self.base_url = url;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Blocking chat-completions client for OpenAI-compatible vision models.
pub struct OpenAIClient {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Result<Self, VDModelError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VDModelError::Config(format!("could not build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

fn extract_answer(body: &str) -> Result<String, VDModelError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| VDModelError::Decode(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .ok_or(VDModelError::EmptyResponse)
}

impl ModelClient for OpenAIClient {
    fn id(&self) -> &str {
        &self.config.model
    }

    fn query(&self, prompt: &[WireMessage]) -> Result<String, VDModelError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: prompt,
            max_tokens: self.config.max_tokens,
        };
        tracing::debug!(model = %self.config.model, items = prompt.len(), "querying model");

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .map_err(|e| VDModelError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| VDModelError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(VDModelError::Api {
                status: status.as_u16(),
                body,
            });
        }
        extract_answer(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use vidialogue_core::llm::Role;

    fn client_for(server: &mockito::Server) -> OpenAIClient {
        let config = OpenAIConfig::new("test-key")
            .with_base_url(server.url())
            .with_model("test-vision");
        OpenAIClient::new(config).unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = OpenAIConfig::new("k").with_base_url("http://localhost:8080/v1");
        assert_eq!(config.completions_url(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_config_from_lookup() {
        let config = OpenAIConfig::from_lookup(|key| match key {
            API_KEY_VAR => Some("sk-123".to_string()),
            MODEL_VAR => Some("gpt-4.1-mini".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.api_key, "sk-123");
        assert_eq!(config.model, "gpt-4.1-mini");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);

        let missing = OpenAIConfig::from_lookup(|_| None);
        assert!(matches!(missing, Err(VDModelError::Config(_))));
    }

    #[test]
    fn test_query_success() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "test-vision",
                "max_tokens": 200,
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": [{"type": "text", "text": "hi"}]}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Nice hat!"}}]}"#)
            .create();

        let client = client_for(&server);
        let prompt = [
            WireMessage::system("be brief"),
            WireMessage::text(Role::User, "hi"),
        ];
        assert_eq!(client.query(&prompt).unwrap(), "Nice hat!");
        mock.assert();
    }

    #[test]
    fn test_query_api_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create();

        let err = client_for(&server).query(&[]).unwrap_err();
        match err {
            VDModelError::Api { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_extract_answer_errors() {
        assert!(matches!(
            extract_answer("not json"),
            Err(VDModelError::Decode(_))
        ));
        assert!(matches!(
            extract_answer(r#"{"choices":[]}"#),
            Err(VDModelError::EmptyResponse)
        ));
        assert!(matches!(
            extract_answer(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(VDModelError::EmptyResponse)
        ));
    }

    #[test]
    fn test_transport_error() {
        let config = OpenAIConfig::new("k")
            .with_base_url("http://127.0.0.1:1/")
            .with_timeout(Duration::from_secs(2));
        let client = OpenAIClient::new(config).unwrap();
        assert!(matches!(
            client.query(&[]),
            Err(VDModelError::Transport(_))
        ));
    }
}
