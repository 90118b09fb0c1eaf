pub mod google;
pub mod mock;

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub use google::GoogleTranslator;
pub use mock::{MockMode, MockTranslator};

/// Source language value that asks the provider to detect the language.
pub const AUTO_DETECT: &str = "auto";

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// Build the translator the service runs with.
pub fn create_translator(config: &Config, mock: bool) -> Result<Arc<dyn Translator>> {
    if mock {
        return Ok(Arc::new(MockTranslator::new(MockMode::Suffix)));
    }
    let translator = GoogleTranslator::new()?
        .with_endpoint(config.endpoint.clone())
        .with_max_retries(config.max_retries);
    Ok(Arc::new(translator))
}
