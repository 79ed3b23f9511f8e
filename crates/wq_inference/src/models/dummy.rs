use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use serde_json::{json, Value};
use wq_core::{Error, Result, TextGenerator};

use crate::synthesizer::{ARTICLE_DELIMITER, TOPIC_LABEL};

const QUESTION_COUNT: usize = 5;
const DIFFICULTIES: [&str; 3] = ["easy", "medium", "hard"];

/// Offline backend. Builds a deterministic quiz from the sentences of the
/// article embedded in the prompt; useful for local runs without an API key.
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

fn article_text(prompt: &str) -> &str {
    let mut parts = prompt.splitn(3, ARTICLE_DELIMITER);
    parts.next();
    parts.next().unwrap_or_default().trim()
}

fn topic(prompt: &str) -> String {
    prompt
        .lines()
        .find_map(|line| line.trim().strip_prefix(TOPIC_LABEL))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| "this article".to_string())
}

fn sentences(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    text.split(|c| c == '.' || c == '!' || c == '?')
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| s.split_whitespace().count() >= 3)
        .filter(|s| seen.insert(s.clone()))
        .map(|s| format!("{}.", s))
        .collect()
}

#[async_trait]
impl TextGenerator for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate(&self, prompt: &str, _schema: &Value) -> Result<Value> {
        let title = topic(prompt);
        let facts = sentences(article_text(prompt));
        if facts.is_empty() {
            return Err(Error::Generation(
                "Dummy model found no article text in the prompt".to_string(),
            ));
        }

        let distractors = [
            format!("{} is not discussed in the article.", title),
            format!("The article describes {} as fictional.", title),
            "None of the above.".to_string(),
        ];

        let quiz: Vec<Value> = (0..QUESTION_COUNT)
            .map(|i| {
                let fact = &facts[i % facts.len()];
                let mut options = vec![fact.clone()];
                options.extend(distractors.iter().cloned());
                let len = options.len();
                options.rotate_right(i % len);
                json!({
                    "question": format!("Question {}: which statement about {} is made in the article?", i + 1, title),
                    "options": options,
                    "answer": fact,
                    "difficulty": DIFFICULTIES[i % DIFFICULTIES.len()],
                    "explanation": format!("The article states: \"{}\"", fact),
                })
            })
            .collect();

        tracing::debug!(title = %title, facts = facts.len(), "Dummy model built quiz");
        Ok(json!({
            "quiz": quiz,
            "related_topics": [
                format!("History of {}", title),
                format!("{} (disambiguation)", title),
                "Outline of knowledge",
            ],
            "key_entities": { "topics": [title] },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesizer::build_prompt;
    use crate::validation::validate_quiz;

    #[tokio::test]
    async fn test_dummy_model_output_validates() {
        let model = DummyModel::new();
        let prompt = build_prompt(
            "Rust is a systems programming language. It was first released in 2015. \
             Cargo is its package manager.",
            "Rust (programming language)",
        );

        let value = model.generate(&prompt, &json!({})).await.unwrap();
        let quiz = validate_quiz(&value).unwrap();
        assert_eq!(quiz.quiz.len(), QUESTION_COUNT);
        assert!(quiz.quiz[0].question.contains("Rust (programming language)"));
        assert_eq!(quiz.quiz[1].answer, "It was first released in 2015.");
    }

    #[tokio::test]
    async fn test_dummy_model_needs_text() {
        let model = DummyModel::new();
        let prompt = build_prompt("", "Empty");
        let err = model.generate(&prompt, &json!({})).await.unwrap_err();
        assert_eq!(err.kind(), "generation");
    }

    #[test]
    fn test_sentences_skip_fragments_and_duplicates() {
        let facts = sentences("Hi. The sky is blue. The sky is blue. It rains often!");
        assert_eq!(facts, vec!["The sky is blue.", "It rains often."]);
    }
}
