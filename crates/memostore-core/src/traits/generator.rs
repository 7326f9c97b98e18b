//! Generator trait for producing values on a cache miss.

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::result::AppResult;
use crate::types::entry::GenerationContext;

/// Produces the value for a key the backend does not hold yet.
///
/// Errors are handed to the waiting caller verbatim and nothing is
/// persisted, so the key stays eligible for the next request.
#[async_trait]
pub trait Generator: Send + Sync + 'static {
    /// Generate the value for `key`.
    async fn generate(&self, key: Value, context: GenerationContext) -> AppResult<Value>;
}

#[async_trait]
impl<F, Fut> Generator for F
where
    F: Fn(Value, GenerationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<Value>> + Send + 'static,
{
    async fn generate(&self, key: Value, context: GenerationContext) -> AppResult<Value> {
        (self)(key, context).await
    }
}
