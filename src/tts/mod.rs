pub mod google;
pub mod tokenizer;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;

pub use google::GoogleTts;

/// A backend that turns plain text into encoded audio.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AppError>;
}

/// Validates text before it reaches the engine. Failures are not retried.
#[derive(Clone)]
pub struct TtsService {
    engine: Arc<dyn SpeechEngine>,
}

impl TtsService {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self { engine }
    }

    pub async fn speak(&self, text: &str) -> Result<Vec<u8>, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Synthesis("No text to speak".into()));
        }

        let audio = self.engine.synthesize(text).await?;
        tracing::debug!("Synthesized {} chars into {} bytes", text.len(), audio.len());
        Ok(audio)
    }
}
