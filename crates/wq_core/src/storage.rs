use async_trait::async_trait;

use crate::types::{QuizArtifact, QuizSummary, StoredQuiz};
use crate::Result;

#[async_trait]
pub trait QuizStorage: Send + Sync {
    /// Persist an artifact, assigning it an id and creation time
    async fn save(&self, artifact: &QuizArtifact) -> Result<StoredQuiz>;

    /// Fetch a stored quiz, `None` when the id is unknown
    async fn get(&self, id: i64) -> Result<Option<StoredQuiz>>;

    /// List all stored quizzes, oldest first
    async fn list(&self) -> Result<Vec<QuizSummary>>;
}
