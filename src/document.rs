//! Uploaded documents and the translation request built from them.

use crate::error::{JsonTranslatorError, Result};
use crate::languages::Language;
use serde_json::{Map, Value};

/// One key-value pair of the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    /// Original value as uploaded.
    pub value: Value,
    /// Value coerced to the text that gets translated.
    pub text: String,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        let text = coerce_text(&value);
        Self {
            key: key.into(),
            value,
            text,
        }
    }

    /// Empty and whitespace-only values are never sent to the translator.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A flat document plus the language it should be translated into.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub entries: Vec<Entry>,
    pub language: Language,
}

impl TranslationRequest {
    /// Build a request from a parsed JSON object. Key order is preserved.
    pub fn new(document: Map<String, Value>, language: Language) -> Self {
        let entries = document
            .into_iter()
            .map(|(key, value)| Entry::new(key, value))
            .collect();
        Self { entries, language }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validate and parse an uploaded file into a flat JSON object.
pub fn parse_document(bytes: &[u8], max_bytes: usize) -> Result<Map<String, Value>> {
    if bytes.len() > max_bytes {
        return Err(JsonTranslatorError::FileTooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| JsonTranslatorError::InvalidDocument(format!("malformed JSON: {}", e)))?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(JsonTranslatorError::InvalidDocument(
            "JSON must be a key-value object".to_string(),
        )),
    }
}

fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
