use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use wq_core::{QuizArtifact, QuizStorage, QuizSummary, Result, StoredQuiz};

#[derive(Default)]
struct MemoryStore {
    next_id: i64,
    quizzes: Vec<StoredQuiz>,
}

/// Process-local store; contents are lost on exit.
#[derive(Default)]
pub struct MemoryStorage {
    store: RwLock<MemoryStore>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizStorage for MemoryStorage {
    async fn save(&self, artifact: &QuizArtifact) -> Result<StoredQuiz> {
        let mut store = self.store.write().await;
        store.next_id += 1;
        let stored = StoredQuiz {
            id: store.next_id,
            created_at: Utc::now(),
            artifact: artifact.clone(),
        };
        store.quizzes.push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: i64) -> Result<Option<StoredQuiz>> {
        let store = self.store.read().await;
        Ok(store.quizzes.iter().find(|quiz| quiz.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<QuizSummary>> {
        let store = self.store.read().await;
        Ok(store.quizzes.iter().map(QuizSummary::from).collect())
    }
}
