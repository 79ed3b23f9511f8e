use std::sync::Arc;

use wq_core::QuizStorage;
use wq_scraper::QuizPipeline;

pub struct AppState {
    pub pipeline: Arc<QuizPipeline>,
    pub storage: Arc<dyn QuizStorage>,
}
