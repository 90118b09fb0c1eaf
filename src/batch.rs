//! Packing several values into one translation request and unpacking the reply.
//!
//! Values are joined with a separator token that ordinary text does not
//! contain. Providers occasionally drop, merge or rewrite that token, so the
//! decoder reports a mismatch instead of guessing which part belongs where.

use crate::document::Entry;
use serde_json::Value;

/// A contiguous slice of the request, in original order.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// Zero-based position of this batch in the run.
    pub index: usize,
    pub entries: &'a [Entry],
}

/// How a batch should be sent to the translator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedBatch {
    /// Nothing to translate; every value is blank.
    Passthrough,
    /// Exactly one translatable value, sent as-is.
    Single { position: usize, text: String },
    /// Several translatable values joined with the separator.
    Combined { positions: Vec<usize>, text: String },
    /// The joined text would exceed the request limit; translate each value alone.
    Oversized { positions: Vec<usize> },
}

/// Outcome of splitting a translated combined string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Parts(Vec<String>),
    Mismatch { expected: usize, actual: usize },
}

/// Cut entries into fixed-size batches. The last batch may be shorter.
pub fn partition(entries: &[Entry], batch_size: usize) -> Vec<Batch<'_>> {
    entries
        .chunks(batch_size.max(1))
        .enumerate()
        .map(|(index, entries)| Batch { index, entries })
        .collect()
}

impl<'a> Batch<'a> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Positions (within the batch) of values that need translation.
    pub fn translatable(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_blank())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn encode(&self, separator: &str, max_chars: usize) -> EncodedBatch {
        let positions = self.translatable();

        match positions.len() {
            0 => EncodedBatch::Passthrough,
            1 => EncodedBatch::Single {
                position: positions[0],
                text: self.entries[positions[0]].text.clone(),
            },
            _ => {
                let text = positions
                    .iter()
                    .map(|&i| self.entries[i].text.as_str())
                    .collect::<Vec<_>>()
                    .join(separator);

                if text.chars().count() > max_chars {
                    EncodedBatch::Oversized { positions }
                } else {
                    EncodedBatch::Combined { positions, text }
                }
            }
        }
    }
}

/// Split a translated combined string on the trimmed separator.
pub fn decode_combined(translated: &str, expected: usize, separator: &str) -> Decoded {
    let token = separator.trim();
    let parts: Vec<String> = translated
        .split(token)
        .map(|part| part.trim().to_string())
        .collect();

    if parts.len() == expected {
        Decoded::Parts(parts)
    } else {
        Decoded::Mismatch {
            expected,
            actual: parts.len(),
        }
    }
}

/// Value stored for an entry given its translated text.
///
/// An empty translation falls back to the original value.
pub fn resolve(entry: &Entry, translated: &str) -> Value {
    let trimmed = translated.trim();
    if trimmed.is_empty() {
        entry.value.clone()
    } else {
        Value::String(trimmed.to_string())
    }
}
