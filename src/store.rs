//! Short-lived storage of finished translations, addressed by a generated id.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// A finished translation waiting to be downloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArtifact {
    pub id: String,
    pub payload: Map<String, Value>,
    pub lang_tag: String,
    pub created_at: DateTime<Utc>,
    pub consumed: bool,
}

impl StoredArtifact {
    pub fn file_name(&self) -> String {
        format!("TranslationFile_{}.json", self.lang_tag)
    }

    /// Pretty JSON with 4-space indentation and unescaped non-ASCII text.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        serde::Serialize::serialize(&self.payload, &mut serializer)?;
        Ok(out)
    }

    fn is_expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        if self.consumed {
            return true;
        }
        match chrono::Duration::from_std(retention) {
            Ok(retention) => now - self.created_at > retention,
            Err(_) => false,
        }
    }
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Store a new artifact. An existing id is left untouched.
    async fn put(&self, id: &str, payload: Map<String, Value>, lang_tag: &str) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<StoredArtifact>>;

    /// Flag an artifact as downloaded. Returns `true` only for the call that flipped the flag.
    async fn mark_consumed(&self, id: &str) -> Result<bool>;

    /// Remove consumed artifacts and those older than `retention`. Returns the number removed.
    async fn delete_expired(&self, retention: Duration) -> Result<usize>;

    async fn len(&self) -> Result<usize>;
}

/// Process-local store backed by a map behind an async lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    artifacts: RwLock<HashMap<String, StoredArtifact>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expiry pass against an explicit clock.
    pub async fn purge(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let mut artifacts = self.artifacts.write().await;
        let before = artifacts.len();
        artifacts.retain(|id, artifact| {
            let expired = artifact.is_expired(now, retention);
            if expired {
                debug!("Expiring artifact {} (consumed: {})", id, artifact.consumed);
            }
            !expired
        });
        before - artifacts.len()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn put(&self, id: &str, payload: Map<String, Value>, lang_tag: &str) -> Result<()> {
        let mut artifacts = self.artifacts.write().await;
        artifacts
            .entry(id.to_string())
            .or_insert_with(|| StoredArtifact {
                id: id.to_string(),
                payload,
                lang_tag: lang_tag.to_string(),
                created_at: Utc::now(),
                consumed: false,
            });
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<StoredArtifact>> {
        Ok(self.artifacts.read().await.get(id).cloned())
    }

    async fn mark_consumed(&self, id: &str) -> Result<bool> {
        let mut artifacts = self.artifacts.write().await;
        Ok(match artifacts.get_mut(id) {
            Some(artifact) if !artifact.consumed => {
                artifact.consumed = true;
                true
            }
            _ => false,
        })
    }

    async fn delete_expired(&self, retention: Duration) -> Result<usize> {
        Ok(self.purge(Utc::now(), retention).await)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.artifacts.read().await.len())
    }
}
