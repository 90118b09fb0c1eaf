use thiserror::Error;

#[derive(Error, Debug)]
pub enum JsonTranslatorError {
    #[error("No file selected")]
    MissingFile,

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("File too large: {size} bytes (max {limit} bytes)")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Invalid JSON document: {0}")]
    InvalidDocument(String),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Result store error: {0}")]
    Store(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Progress consumer disconnected")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl JsonTranslatorError {
    /// Whether the error was caused by the uploaded input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            JsonTranslatorError::MissingFile
                | JsonTranslatorError::UnknownLanguage(_)
                | JsonTranslatorError::FileTooLarge { .. }
                | JsonTranslatorError::InvalidDocument(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, JsonTranslatorError>;
