use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// A generative text model that answers in structured JSON.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Run `prompt` and return the model output parsed as an untyped JSON
    /// tree. `schema` describes the expected shape; callers still validate.
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<Value>;
}
