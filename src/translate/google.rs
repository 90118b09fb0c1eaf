//! Google Translate web API adapter.

use crate::config::DEFAULT_ENDPOINT;
use crate::error::{JsonTranslatorError, Result};
use crate::translate::Translator;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest text the endpoint accepts in one request.
pub const MAX_CHARS: usize = 5000;

/// How much of an error body is kept in the error message.
const ERROR_EXCERPT_CHARS: usize = 200;

/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 1000;

/// Translator backed by the public `translate_a/single` endpoint.
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
    max_retries: u32,
}

impl GoogleTranslator {
    pub fn new() -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_retries: 3,
        })
    }

    /// Point the translator at a different endpoint (proxies, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Number of attempts for throttled or failing requests. Zero is treated as one.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn call_api(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source_lang),
                ("tl", target_lang),
                ("dt", "t"),
            ])
            .form(&[("q", text)])
            .send()
            .await?;

        let status = response.status();
        debug!("Translate API response status: {}", status);

        let body = response.text().await?;
        if !status.is_success() {
            return Err(JsonTranslatorError::Api(format!(
                "Translate API error ({}): {}",
                status,
                excerpt(&body)
            )));
        }

        let parsed: Value = serde_json::from_str(&body)?;
        parse_response(&parsed)
    }

    async fn translate_with_retry(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String> {
        let attempts = self.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = BASE_DELAY_MS * 2u64.pow(attempt - 1);
                debug!("Retry attempt {} after {}ms delay", attempt, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.call_api(text, source_lang, target_lang).await {
                Ok(translated) => return Ok(translated),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => {
                    warn!("Attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| JsonTranslatorError::Api("Unknown translate error".to_string())))
    }
}

impl std::fmt::Debug for GoogleTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTranslator")
            .field("endpoint", &self.endpoint)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let chars = text.chars().count();
        if chars > MAX_CHARS {
            return Err(JsonTranslatorError::Translation(format!(
                "Text exceeds maximum length of {} characters ({})",
                MAX_CHARS, chars
            )));
        }

        debug!("Translating {} chars {} -> {}", chars, source_lang, target_lang);
        self.translate_with_retry(text, source_lang, target_lang).await
    }

    fn name(&self) -> &'static str {
        "Google Translate"
    }
}

/// Throttling, server errors and transport failures are worth another attempt.
fn is_retryable(error: &JsonTranslatorError) -> bool {
    match error {
        JsonTranslatorError::Http(_) => true,
        JsonTranslatorError::Api(msg) => {
            msg.contains(&format!("({})", StatusCode::TOO_MANY_REQUESTS))
                || msg.contains("API error (5")
        }
        _ => false,
    }
}

/// First characters of an error body, cut on a character boundary.
fn excerpt(body: &str) -> String {
    body.chars().take(ERROR_EXCERPT_CHARS).collect()
}

/// Concatenate the translated segments of a `[[["text", "source", ...], ...], ...]` response.
fn parse_response(value: &Value) -> Result<String> {
    let segments = value
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            JsonTranslatorError::Api("Invalid translate response: missing segments".to_string())
        })?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    Ok(translated)
}
