use std::time::Duration;

pub mod models;
pub mod synthesizer;
pub mod validation;

/// Sampling temperature for every backend. Kept low so repeated runs over the
/// same article stay close to each other.
pub const GENERATION_TEMPERATURE: f32 = 0.3;

pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct Config {
    /// Backend selector: `gemini`, `openai`, `deepseek` or `dummy`
    pub backend: String,
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub model_url: Option<String>,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: "gemini".to_string(),
            api_key: None,
            model_name: None,
            model_url: None,
            timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }
}

pub mod prelude {
    pub use super::models::create_model;
    pub use super::synthesizer::QuizSynthesizer;
    pub use super::Config;
    pub use wq_core::{Error, GeneratedQuiz, Result, TextGenerator};
}

pub use models::create_model;
pub use synthesizer::QuizSynthesizer;
