//! Global count of completed translations, optionally persisted to disk.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct CounterFile {
    count: u64,
    #[serde(default)]
    last_updated: Option<String>,
}

#[derive(Debug)]
pub struct TranslationCounter {
    count: Mutex<u64>,
    path: Option<PathBuf>,
}

impl TranslationCounter {
    /// A counter that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            count: Mutex::new(0),
            path: None,
        }
    }

    /// Load the counter from `path`. A missing or unreadable file starts at zero.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let count = read_count(&path);
        debug!("Loaded translation counter {} from {:?}", count, path);
        Self {
            count: Mutex::new(count),
            path: Some(path),
        }
    }

    pub async fn get(&self) -> u64 {
        *self.count.lock().await
    }

    /// Bump the count and persist it. Persistence failures are logged only.
    pub async fn increment(&self) -> u64 {
        let mut count = self.count.lock().await;
        *count += 1;

        if let Some(ref path) = self.path {
            let file = CounterFile {
                count: *count,
                last_updated: Some(Utc::now().to_rfc3339()),
            };
            match serde_json::to_vec(&file) {
                Ok(bytes) => {
                    if let Err(e) = tokio::fs::write(path, bytes).await {
                        warn!("Counter save error: {}", e);
                    }
                }
                Err(e) => warn!("Counter save error: {}", e),
            }
        }

        *count
    }
}

fn read_count(path: &Path) -> u64 {
    if !path.exists() {
        return 0;
    }
    match std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|s| serde_json::from_str::<CounterFile>(&s).map_err(|e| e.to_string()))
    {
        Ok(file) => file.count,
        Err(e) => {
            warn!("Counter load error: {}", e);
            0
        }
    }
}
