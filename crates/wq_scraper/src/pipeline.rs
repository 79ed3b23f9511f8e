use tracing::info;
use wq_core::{QuizArtifact, QuizStorage, Result, StoredQuiz};
use wq_inference::QuizSynthesizer;

use crate::extractor::WikipediaExtractor;

/// Extract then synthesize, strictly in that order. Any stage failure aborts
/// the run; there are no partial artifacts.
pub struct QuizPipeline {
    extractor: WikipediaExtractor,
    synthesizer: QuizSynthesizer,
}

impl QuizPipeline {
    pub fn new(extractor: WikipediaExtractor, synthesizer: QuizSynthesizer) -> Self {
        Self {
            extractor,
            synthesizer,
        }
    }

    pub async fn build_quiz(&self, url: &str) -> Result<QuizArtifact> {
        info!(url, "🦗 Building quiz");
        let article = self.extractor.extract(url).await?;
        let generated = self
            .synthesizer
            .synthesize(&article.body_text, &article.title)
            .await?;
        Ok(QuizArtifact::from_parts(article, generated))
    }

    /// Run the pipeline and persist the result. Nothing is written when the
    /// pipeline fails.
    pub async fn build_and_save(&self, url: &str, storage: &dyn QuizStorage) -> Result<StoredQuiz> {
        let artifact = self.build_quiz(url).await?;
        let stored = storage.save(&artifact).await?;
        info!(id = stored.id, title = %stored.artifact.title, "💾 Quiz stored");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ExtractorConfig;
    use async_trait::async_trait;
    use axum::{response::Html, routing::get, Router};
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use wq_core::{Error, QuizSummary, TextGenerator};

    const PAGE: &str = r#"<html><body>
        <h1 id="firstHeading">Ferris</h1>
        <div id="mw-content-text"><div class="mw-parser-output">
            <p>Ferris is a crab[1].</p>
            <h2>Habitat[edit]</h2>
            <p>Lives in the Rust community.</p>
            <h2>References</h2>
            <p>Citation list.</p>
        </div></div>
    </body></html>"#;

    const EMPTY_PAGE: &str = r#"<html><body>
        <h1 id="firstHeading">Stub</h1>
        <div id="mw-content-text"><div class="mw-parser-output"><table></table></div></div>
    </body></html>"#;

    struct FixedGenerator {
        response: Value,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        fn name(&self) -> &str {
            "Fixed"
        }

        async fn generate(&self, _prompt: &str, _schema: &Value) -> wq_core::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    #[derive(Default)]
    struct RecordingStorage {
        saved: Mutex<Vec<StoredQuiz>>,
    }

    #[async_trait]
    impl QuizStorage for RecordingStorage {
        async fn save(&self, artifact: &QuizArtifact) -> wq_core::Result<StoredQuiz> {
            let mut saved = self.saved.lock().unwrap();
            let stored = StoredQuiz {
                id: saved.len() as i64 + 1,
                created_at: Utc::now(),
                artifact: artifact.clone(),
            };
            saved.push(stored.clone());
            Ok(stored)
        }

        async fn get(&self, id: i64) -> wq_core::Result<Option<StoredQuiz>> {
            Ok(self.saved.lock().unwrap().iter().find(|q| q.id == id).cloned())
        }

        async fn list(&self) -> wq_core::Result<Vec<QuizSummary>> {
            Ok(self.saved.lock().unwrap().iter().map(QuizSummary::from).collect())
        }
    }

    fn payload(count: usize) -> Value {
        let quiz: Vec<Value> = (0..count)
            .map(|i| {
                json!({
                    "question": format!("What is fact {}?", i),
                    "options": ["Crab", "Lobster", "Shrimp", "Snail"],
                    "answer": "Crab",
                    "difficulty": "easy",
                    "explanation": "Ferris is a crab."
                })
            })
            .collect();
        json!({
            "quiz": quiz,
            "related_topics": ["Rust", "Crustacean", "Mascot"],
            "key_entities": { "organizations": ["Rust community"] }
        })
    }

    async fn serve() -> String {
        let router = Router::new()
            .route("/wiki/Ferris", get(|| async { Html(PAGE) }))
            .route("/wiki/Stub", get(|| async { Html(EMPTY_PAGE) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn pipeline(response: Value) -> (QuizPipeline, Arc<FixedGenerator>) {
        let generator = Arc::new(FixedGenerator {
            response,
            calls: AtomicUsize::new(0),
        });
        let extractor = WikipediaExtractor::new(ExtractorConfig {
            retries: 0,
            retry_delay: Duration::from_millis(1),
            ..ExtractorConfig::default()
        })
        .unwrap();
        let synthesizer = QuizSynthesizer::new(generator.clone());
        (QuizPipeline::new(extractor, synthesizer), generator)
    }

    #[tokio::test]
    async fn test_build_quiz_merges_article_and_quiz() {
        let base = serve().await;
        let (pipeline, generator) = pipeline(payload(5));
        let url = format!("{}/wiki/Ferris", base);

        let artifact = pipeline.build_quiz(&url).await.unwrap();
        assert_eq!(artifact.url, url);
        assert_eq!(artifact.title, "Ferris");
        assert_eq!(artifact.summary, "Ferris is a crab.\nLives in the Rust community.\nCitation list.");
        assert_eq!(artifact.sections, vec!["Habitat"]);
        assert_eq!(artifact.quiz.len(), 5);
        assert_eq!(artifact.related_topics, vec!["Rust", "Crustacean", "Mascot"]);
        assert_eq!(artifact.key_entities["organizations"], vec!["Rust community"]);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_found_aborts_before_generation() {
        let base = serve().await;
        let (pipeline, generator) = pipeline(payload(5));
        let storage = RecordingStorage::default();

        let err = pipeline
            .build_and_save(&format!("{}/wiki/Nowhere", base), &storage)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert!(storage.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_article_is_extraction_error() {
        let base = serve().await;
        let (pipeline, generator) = pipeline(payload(5));

        let err = pipeline
            .build_quiz(&format!("{}/wiki/Stub", base))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_quiz_is_generation_error_and_not_saved() {
        let base = serve().await;
        let (pipeline, _generator) = pipeline(payload(3));
        let storage = RecordingStorage::default();

        let err = pipeline
            .build_and_save(&format!("{}/wiki/Ferris", base), &storage)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
        assert!(storage.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_build_and_save_persists() {
        let base = serve().await;
        let (pipeline, _generator) = pipeline(payload(10));
        let storage = RecordingStorage::default();

        let stored = pipeline
            .build_and_save(&format!("{}/wiki/Ferris", base), &storage)
            .await
            .unwrap();
        assert_eq!(stored.id, 1);
        assert_eq!(storage.get(1).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let (pipeline, _generator) = pipeline(payload(5));
        let err = pipeline.build_quiz("en.wikipedia.org/wiki/Rust").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_url");
    }
}
