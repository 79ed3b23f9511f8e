pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::TextGenerator;
pub use storage::QuizStorage;
pub use types::{
    Article, Difficulty, GeneratedQuiz, KeyEntities, QuizArtifact, QuizQuestion, QuizSummary,
    StoredQuiz,
};
