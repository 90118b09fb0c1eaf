//! Progress events streamed to the client while a run is in flight.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    Info { message: String },
    Warning { message: String },
    Error { message: String },
    Success { message: String },
    Progress { message: String },
    Percentage { value: u8 },
    /// Terminal: the run finished and its artifact can be downloaded.
    Complete { file_id: String, lang_code: String },
    /// Terminal: the run ended without producing an artifact.
    #[serde(rename = "error")]
    Failed { message: String },
}

impl ProgressEvent {
    pub fn info(text: impl AsRef<str>) -> Self {
        ProgressEvent::Info {
            message: stamp(text.as_ref()),
        }
    }

    pub fn warning(text: impl AsRef<str>) -> Self {
        ProgressEvent::Warning {
            message: stamp(text.as_ref()),
        }
    }

    pub fn error(text: impl AsRef<str>) -> Self {
        ProgressEvent::Error {
            message: stamp(text.as_ref()),
        }
    }

    pub fn success(text: impl AsRef<str>) -> Self {
        ProgressEvent::Success {
            message: stamp(text.as_ref()),
        }
    }

    pub fn progress(text: impl AsRef<str>) -> Self {
        ProgressEvent::Progress {
            message: stamp(text.as_ref()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Complete { .. } | ProgressEvent::Failed { .. }
        )
    }

    /// JSON payload carried in the SSE `data:` field.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","message":"event serialization failed"}"#.to_string()
        })
    }
}

fn stamp(text: &str) -> String {
    format!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), text)
}
