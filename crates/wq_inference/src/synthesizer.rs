use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};
use wq_core::{Error, GeneratedQuiz, Result, TextGenerator};

use crate::validation::{self, MAX_QUESTIONS, MAX_RELATED_TOPICS, MIN_QUESTIONS, MIN_RELATED_TOPICS};

pub(crate) const ARTICLE_DELIMITER: &str = "---";
pub(crate) const TOPIC_LABEL: &str = "**QUIZ TOPIC:**";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Render the instruction template around the article text.
pub fn build_prompt(article_text: &str, title: &str) -> String {
    format!(
        r#"You are an expert educational content generator. Your task is to analyze the provided Wikipedia article text
and generate a comprehensive, factual quiz and relevant metadata.

**INSTRUCTIONS:**
1. Generate exactly {min_q} to {max_q} multiple-choice questions (MCQs).
2. Each question MUST have exactly four options (A, B, C, D).
3. The correct 'answer' field MUST match one of the option texts exactly.
4. The 'explanation' must be grounded ONLY in the provided article text.
5. Extract 3-5 key entities organized by categories like 'people', 'organizations', and 'locations'.
6. Suggest {min_t}-{max_t} 'related_topics' for further reading based on the main subject.
7. Set 'difficulty' to one of 'easy', 'medium' or 'hard'.

**ARTICLE TEXT:**
{delim}
{article_text}
{delim}

{topic_label} {title}
"#,
        min_q = MIN_QUESTIONS,
        max_q = MAX_QUESTIONS,
        min_t = MIN_RELATED_TOPICS,
        max_t = MAX_RELATED_TOPICS,
        delim = ARTICLE_DELIMITER,
        article_text = article_text,
        topic_label = TOPIC_LABEL,
        title = title,
    )
}

/// JSON schema the model output must follow.
pub fn quiz_schema() -> Value {
    json!({
        "type": "object",
        "required": ["quiz", "related_topics", "key_entities"],
        "properties": {
            "quiz": {
                "type": "array",
                "description": "A list of 5 to 10 generated quiz questions.",
                "minItems": MIN_QUESTIONS,
                "maxItems": MAX_QUESTIONS,
                "items": {
                    "type": "object",
                    "required": ["question", "options", "answer", "difficulty", "explanation"],
                    "properties": {
                        "question": { "type": "string", "description": "The question text." },
                        "options": {
                            "type": "array",
                            "description": "Exactly four distinct answer options.",
                            "items": { "type": "string" },
                            "minItems": 4,
                            "maxItems": 4
                        },
                        "answer": {
                            "type": "string",
                            "description": "The correct answer text, must exactly match one of the options."
                        },
                        "difficulty": { "type": "string", "enum": ["easy", "medium", "hard"] },
                        "explanation": {
                            "type": "string",
                            "description": "A short explanation justifying the answer based on the article content."
                        }
                    }
                }
            },
            "related_topics": {
                "type": "array",
                "description": "3 to 5 suggested Wikipedia topics for further reading.",
                "items": { "type": "string" },
                "minItems": MIN_RELATED_TOPICS,
                "maxItems": MAX_RELATED_TOPICS
            },
            "key_entities": {
                "type": "object",
                "description": "Key entities from the text grouped by type, e.g. 'people', 'organizations', 'locations'.",
                "additionalProperties": { "type": "array", "items": { "type": "string" } }
            }
        }
    })
}

/// Turns article text into a validated quiz through an injected model.
pub struct QuizSynthesizer {
    generator: Arc<dyn TextGenerator>,
    max_attempts: u32,
}

impl QuizSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Total number of model calls per article, including the first. Zero is
    /// treated as one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn synthesize(&self, body_text: &str, title: &str) -> Result<GeneratedQuiz> {
        let prompt = build_prompt(body_text, title);
        let schema = quiz_schema();

        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            info!(
                title,
                attempt,
                backend = self.generator.name(),
                "🤖 Generating quiz"
            );
            let result = self
                .generator
                .generate(&prompt, &schema)
                .await
                .and_then(|value| validation::validate_quiz(&value));

            match result {
                Ok(quiz) => {
                    info!(title, questions = quiz.quiz.len(), "✨ Quiz generated");
                    return Ok(quiz);
                }
                Err(Error::Generation(message)) => {
                    warn!(title, attempt, error = %message, "Quiz generation attempt failed");
                    last_error = Some(Error::Generation(message));
                }
                Err(other) => return Err(other),
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Generation("No generation attempt was made".to_string())))
    }
}
