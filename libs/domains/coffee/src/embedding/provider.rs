use async_trait::async_trait;

use crate::error::CoffeeResult;

/// Turns a flavor description into a fixed-length vector.
///
/// Failures are recoverable: the orchestrator falls back to lexical matching.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Length of every vector this provider returns
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> CoffeeResult<Vec<f32>>;
}
