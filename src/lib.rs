pub mod batch;
pub mod config;
pub mod counter;
pub mod document;
pub mod error;
pub mod events;
pub mod languages;
pub mod notify;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod sweeper;
pub mod translate;

pub use config::Config;
pub use error::{JsonTranslatorError, Result};
pub use events::ProgressEvent;
pub use pipeline::{EventSink, PipelineConfig, RunOutcome, TranslationPipeline};
