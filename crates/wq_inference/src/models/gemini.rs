use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wq_core::{Error, Result, TextGenerator};

use super::{format_instructions, map_request_error, parse_structured, truncate_body};
use crate::{Config, GENERATION_TEMPERATURE};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-pro";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

/// Google Generative Language API (`models/*:generateContent`).
pub struct GeminiModel {
    client: Client,
    api_key: String,
    base_url: String,
    model_name: String,
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl GeminiModel {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Generation("Gemini API key is required".to_string()))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Generation(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config
                .model_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model_name: config
                .model_name
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model_name)
    }
}

#[async_trait]
impl TextGenerator for GeminiModel {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn generate(&self, prompt: &str, schema: &Value) -> Result<Value> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: format_instructions(schema),
                }],
            },
            generation_config: GenerationConfig {
                temperature: GENERATION_TEMPERATURE,
                response_mime_type: "application/json".to_string(),
            },
        };

        tracing::debug!(model = %self.model_name, "Sending generateContent request");
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_request_error("Gemini", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "Gemini returned HTTP {}: {}",
                status,
                truncate_body(&body)
            )));
        }

        let response = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| map_request_error("Gemini", e))?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| Error::Generation("Gemini returned no candidates".to_string()))?;

        parse_structured(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mock_server;
    use axum::http::StatusCode;
    use serde_json::json;

    fn local_model(base: &str) -> GeminiModel {
        GeminiModel::new(&Config {
            api_key: Some("test-key".to_string()),
            model_name: Some("gemini-test".to_string()),
            model_url: Some(base.to_string()),
            ..Config::default()
        })
        .unwrap()
    }

    fn candidate_reply(text: &str) -> Value {
        json!({
            "candidates": [
                { "content": { "role": "model", "parts": [{ "text": text }] } }
            ]
        })
    }

    #[test]
    fn test_model_requires_api_key() {
        let result = GeminiModel::new(&Config::default());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Quiz generation failed: Gemini API key is required"
        );
    }

    #[test]
    fn test_defaults_and_endpoint() {
        let config = Config {
            api_key: Some("test-key".to_string()),
            ..Config::default()
        };
        let model = GeminiModel::new(&config).unwrap();
        assert_eq!(
            model.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent"
        );
        assert!(!format!("{:?}", model).contains("test-key"));
    }

    #[test]
    fn test_request_uses_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![],
            system_instruction: Content::default(),
            generation_config: GenerationConfig {
                temperature: GENERATION_TEMPERATURE,
                response_mime_type: "application/json".to_string(),
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert!(json.get("systemInstruction").is_some());
    }

    #[tokio::test]
    async fn test_generate_sends_request_and_reads_candidate() {
        let reply = candidate_reply(r#"{"quiz": [], "related_topics": ["a"]}"#);
        let (base, recorded) = mock_server::serve(StatusCode::OK, reply).await;
        let model = local_model(&base);

        let schema = json!({ "type": "object" });
        let value = model.generate("Write a quiz", &schema).await.unwrap();
        assert_eq!(value, json!({"quiz": [], "related_topics": ["a"]}));

        let requests = recorded.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.path, "/models/gemini-test:generateContent");
        assert_eq!(request.headers["x-goog-api-key"], "test-key");
        assert_eq!(request.body["contents"][0]["role"], "user");
        assert_eq!(request.body["contents"][0]["parts"][0]["text"], "Write a quiz");
        assert!(request.body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("\"type\": \"object\""));
        assert_eq!(
            request.body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_generate_joins_parts_and_strips_fence() {
        let reply = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "```json\n{\"quiz\": " }, { "text": "[1]}\n```" }] }
            }]
        });
        let (base, _) = mock_server::serve(StatusCode::OK, reply).await;

        let value = local_model(&base).generate("p", &json!({})).await.unwrap();
        assert_eq!(value, json!({"quiz": [1]}));
    }

    #[tokio::test]
    async fn test_generate_server_error_is_generation_error() {
        let (base, _) = mock_server::serve(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": { "message": "backend exploded" } }),
        )
        .await;

        let err = local_model(&base).generate("p", &json!({})).await.unwrap_err();
        assert_eq!(err.kind(), "generation");
        assert!(err.to_string().contains("HTTP 500"));
        assert!(err.to_string().contains("backend exploded"));
    }

    #[tokio::test]
    async fn test_generate_without_candidates_is_generation_error() {
        let (base, _) = mock_server::serve(StatusCode::OK, json!({ "candidates": [] })).await;

        let err = local_model(&base).generate("p", &json!({})).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Quiz generation failed: Gemini returned no candidates"
        );
    }
}
