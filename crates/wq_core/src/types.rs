use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Text pulled out of a single Wikipedia page. Lives only for the duration of
/// one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub sections: Vec<String>,
    pub body_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub difficulty: Difficulty,
    pub explanation: String,
}

pub type KeyEntities = BTreeMap<String, Vec<String>>;

/// Validated model output, before it is merged with the article metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuiz {
    pub quiz: Vec<QuizQuestion>,
    pub related_topics: Vec<String>,
    pub key_entities: KeyEntities,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizArtifact {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub key_entities: KeyEntities,
    pub sections: Vec<String>,
    pub quiz: Vec<QuizQuestion>,
    pub related_topics: Vec<String>,
}

impl QuizArtifact {
    pub fn from_parts(article: Article, generated: GeneratedQuiz) -> Self {
        Self {
            url: article.url,
            title: article.title,
            summary: article.summary,
            key_entities: generated.key_entities,
            sections: article.sections,
            quiz: generated.quiz,
            related_topics: generated.related_topics,
        }
    }
}

/// A persisted artifact together with the identity assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredQuiz {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub artifact: QuizArtifact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl From<&StoredQuiz> for QuizSummary {
    fn from(stored: &StoredQuiz) -> Self {
        Self {
            id: stored.id,
            url: stored.artifact.url.clone(),
            title: stored.artifact.title.clone(),
            created_at: stored.created_at,
        }
    }
}
