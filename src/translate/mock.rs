//! Deterministic, network-free translator for offline runs and tests.

use crate::error::{JsonTranslatorError, Result};
use crate::translate::Translator;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum MockMode {
    /// Append the target code: "hello" → "hello_de".
    Suffix,
    /// Uppercase the whole text, separators included.
    Uppercase,
    /// Return the input unchanged.
    NoOp,
    /// Fail every call with the given message.
    Error(String),
}

#[derive(Debug, Clone)]
pub struct MockTranslator {
    mode: MockMode,
    delay: Duration,
}

impl MockTranslator {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            delay: Duration::ZERO,
        }
    }

    /// Simulate network latency on every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, _source_lang: &str, target_lang: &str) -> Result<String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.mode {
            MockMode::Suffix => Ok(format!("{}_{}", text, target_lang)),
            MockMode::Uppercase => Ok(text.to_uppercase()),
            MockMode::NoOp => Ok(text.to_string()),
            MockMode::Error(msg) => Err(JsonTranslatorError::Api(msg.clone())),
        }
    }

    fn name(&self) -> &'static str {
        "Mock Translator"
    }
}
