pub mod extractor;
pub mod pipeline;
pub mod wikipedia;

pub use extractor::{ExtractorConfig, WikipediaExtractor};
pub use pipeline::QuizPipeline;
pub use wikipedia::parse_article;

pub mod prelude {
    pub use super::extractor::{ExtractorConfig, WikipediaExtractor};
    pub use super::pipeline::QuizPipeline;
    pub use wq_core::{Article, Error, QuizArtifact, Result};
}
