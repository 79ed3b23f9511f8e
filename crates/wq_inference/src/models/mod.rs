use std::sync::Arc;

use serde_json::Value;
use wq_core::{Error, Result, TextGenerator};

use crate::Config;

pub mod dummy;
pub mod gemini;
pub mod openai;

/// Build the backend named in `config.backend`. Called once at startup; the
/// result is shared by every request.
pub fn create_model(config: &Config) -> Result<Arc<dyn TextGenerator>> {
    let model: Arc<dyn TextGenerator> = match config.backend.to_ascii_lowercase().as_str() {
        "gemini" => Arc::new(gemini::GeminiModel::new(config)?),
        "openai" => Arc::new(openai::OpenAiModel::new(config)?),
        "deepseek" => Arc::new(openai::OpenAiModel::deepseek(config)?),
        "dummy" => Arc::new(dummy::DummyModel::new()),
        other => {
            return Err(Error::Generation(format!(
                "Unknown model backend '{}'. Available backends: gemini, openai, deepseek, dummy",
                other
            )))
        }
    };
    tracing::info!(backend = model.name(), "Inference backend ready");
    Ok(model)
}

/// Instructions appended to the prompt so the model answers with JSON shaped
/// like `schema`.
pub fn format_instructions(schema: &Value) -> String {
    let rendered = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "Return the output as a single JSON object that conforms to the JSON schema below. \
         Do not wrap it in prose.\n```json\n{}\n```",
        rendered
    )
}

/// Parse raw model text into a JSON tree. Tolerates Markdown code fences and
/// leading/trailing chatter around the outermost object.
pub fn parse_structured(raw: &str) -> Result<Value> {
    let text = strip_code_fence(raw.trim());
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&text[start..=end])
            .map_err(|e| Error::Generation(format!("Model output is not valid JSON: {}", e))),
        _ => Err(Error::Generation(
            "Model output does not contain a JSON object".to_string(),
        )),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Shorten a response body before it goes into an error message.
pub(crate) fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 300;
    if body.chars().count() <= LIMIT {
        body.to_string()
    } else {
        format!("{}...", body.chars().take(LIMIT).collect::<String>())
    }
}

pub(crate) fn map_request_error(backend: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Generation(format!("{} request timed out", backend))
    } else {
        Error::Generation(format!("{} request failed: {}", backend, err))
    }
}
