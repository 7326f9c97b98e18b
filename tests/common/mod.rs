//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use memostore::{AppResult, Generator, GenerationContext};

/// Generator that counts its invocations and sleeps before answering.
///
/// The produced value is `{"generated": <key>, "call": <n>}` so tests can
/// tell which invocation produced a stored value.
#[derive(Debug, Clone, Default)]
pub struct CountingGenerator {
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl CountingGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: Arc::default(),
            delay,
        }
    }

    /// Number of times `generate` has been entered.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for CountingGenerator {
    async fn generate(&self, key: Value, _context: GenerationContext) -> AppResult<Value> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(json!({ "generated": key, "call": call }))
    }
}
