//! Language model seam
//!
//! The orchestrator talks to a `ChatModel`; `GeminiClient` is the production
//! implementation.

use crate::models::{CompletionRequest, ModelResponse};
use crate::Result;
use async_trait::async_trait;

pub mod gemini;
pub use gemini::GeminiClient;

/// Trait for chat completion with tool calling
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logs and health output
    fn model_name(&self) -> &str;

    /// Run one completion round
    async fn complete(&self, request: &CompletionRequest) -> Result<ModelResponse>;
}
