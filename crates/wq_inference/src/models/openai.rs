use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wq_core::{Error, Result, TextGenerator};

use super::{format_instructions, map_request_error, parse_structured, truncate_body};
use crate::{Config, GENERATION_TEMPERATURE};

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// Any endpoint speaking the OpenAI chat-completions protocol (OpenAI,
/// DeepSeek, a local Ollama, ...).
pub struct OpenAiModel {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model_name: String,
    label: &'static str,
}

impl fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OpenAiModel {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_defaults(config, "OpenAI", "https://api.openai.com/v1", "gpt-4o-mini")
    }

    pub fn deepseek(config: &Config) -> Result<Self> {
        Self::with_defaults(config, "DeepSeek", "https://api.deepseek.com/v1", "deepseek-chat")
    }

    fn with_defaults(
        config: &Config,
        label: &'static str,
        base_url: &str,
        model_name: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Generation(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
            base_url: config
                .model_url
                .as_deref()
                .unwrap_or(base_url)
                .trim_end_matches('/')
                .to_string(),
            model_name: config
                .model_name
                .clone()
                .unwrap_or_else(|| model_name.to_string()),
            label,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiModel {
    fn name(&self) -> &str {
        self.label
    }

    async fn generate(&self, prompt: &str, schema: &Value) -> Result<Value> {
        let request = ChatRequest {
            model: self.model_name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: format_instructions(schema),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: GENERATION_TEMPERATURE,
            response_format: json!({ "type": "json_object" }),
        };

        tracing::debug!(backend = self.label, model = %self.model_name, "Sending chat completion request");
        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_request_error(self.label, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "{} returned HTTP {}: {}",
                self.label,
                status,
                truncate_body(&body)
            )));
        }

        let response = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| map_request_error(self.label, e))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Generation(format!("{} returned no choices", self.label)))?;

        parse_structured(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mock_server;
    use axum::http::StatusCode;

    fn local_model(base: &str, api_key: Option<&str>) -> OpenAiModel {
        OpenAiModel::new(&Config {
            backend: "openai".to_string(),
            api_key: api_key.map(str::to_string),
            model_name: Some("llama3".to_string()),
            model_url: Some(base.to_string()),
            ..Config::default()
        })
        .unwrap()
    }

    fn choice_reply(content: &str) -> Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    #[test]
    fn test_deepseek_defaults() {
        let model = OpenAiModel::deepseek(&Config::default()).unwrap();
        assert_eq!(model.name(), "DeepSeek");
        assert_eq!(model.base_url, "https://api.deepseek.com/v1");
        assert_eq!(model.model_name, "deepseek-chat");
    }

    #[test]
    fn test_overrides_and_redaction() {
        let config = Config {
            api_key: Some("sk-secret".to_string()),
            model_name: Some("llama3".to_string()),
            model_url: Some("http://localhost:11434/v1/".to_string()),
            ..Config::default()
        };
        let model = OpenAiModel::new(&config).unwrap();
        assert_eq!(model.base_url, "http://localhost:11434/v1");
        assert_eq!(model.model_name, "llama3");
        assert!(!format!("{:?}", model).contains("sk-secret"));
    }

    #[tokio::test]
    async fn test_generate_sends_chat_request() {
        let (base, recorded) =
            mock_server::serve(StatusCode::OK, choice_reply(r#"{"related_topics": ["x"]}"#)).await;
        let model = local_model(&base, Some("sk-test"));

        let value = model
            .generate("Write a quiz", &json!({ "type": "object" }))
            .await
            .unwrap();
        assert_eq!(value, json!({"related_topics": ["x"]}));

        let requests = recorded.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.path, "/chat/completions");
        assert_eq!(request.headers["authorization"], "Bearer sk-test");
        assert_eq!(request.body["model"], "llama3");
        assert_eq!(request.body["response_format"]["type"], "json_object");
        assert_eq!(request.body["messages"][0]["role"], "system");
        assert_eq!(request.body["messages"][1]["role"], "user");
        assert_eq!(request.body["messages"][1]["content"], "Write a quiz");
    }

    #[tokio::test]
    async fn test_generate_without_key_skips_auth_and_strips_fence() {
        let (base, recorded) =
            mock_server::serve(StatusCode::OK, choice_reply("```json\n{\"quiz\": []}\n```")).await;

        let value = local_model(&base, None)
            .generate("p", &json!({}))
            .await
            .unwrap();
        assert_eq!(value, json!({"quiz": []}));
        assert!(recorded.lock().unwrap()[0]
            .headers
            .get("authorization")
            .is_none());
    }

    #[tokio::test]
    async fn test_generate_server_error_is_generation_error() {
        let (base, _) = mock_server::serve(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "overloaded" }),
        )
        .await;

        let err = local_model(&base, None)
            .generate("p", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "generation");
        assert!(err.to_string().contains("OpenAI returned HTTP 500"));
    }

    #[tokio::test]
    async fn test_generate_without_choices_is_generation_error() {
        let (base, _) = mock_server::serve(StatusCode::OK, json!({ "choices": [] })).await;

        let err = local_model(&base, None)
            .generate("p", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Quiz generation failed: OpenAI returned no choices");
    }
}
