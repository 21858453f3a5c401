//! Text, PDF or image in; stored MP3 and a history record out.
//!
//! A request that fails before the audio is written leaves nothing behind.
//! If the record insert fails after the write, the file stays on disk as an
//! orphan and is logged, not removed.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::AppError;
use crate::extract::{self, TextExtractor};
use crate::storage::AudioStorage;
use crate::store::AudioRecordStore;
use crate::tts::TtsService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Text,
    Pdf,
    Image,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Text => write!(f, "text"),
            SourceKind::Pdf => write!(f, "pdf"),
            SourceKind::Image => write!(f, "image"),
        }
    }
}

/// A conversion request. `None` means the request carried no payload.
#[derive(Debug)]
pub enum ConversionInput {
    Text(Option<String>),
    Pdf(Option<Vec<u8>>),
    Image(Option<Vec<u8>>),
}

impl ConversionInput {
    pub fn kind(&self) -> SourceKind {
        match self {
            ConversionInput::Text(_) => SourceKind::Text,
            ConversionInput::Pdf(_) => SourceKind::Pdf,
            ConversionInput::Image(_) => SourceKind::Image,
        }
    }
}

/// Where a converted clip can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioReference {
    pub filename: String,
}

impl AudioReference {
    pub fn audio_path(&self) -> String {
        AudioStorage::public_path(&self.filename)
    }
}

#[derive(Clone)]
pub struct ConversionPipeline {
    pdf: Arc<dyn TextExtractor>,
    image: Arc<dyn TextExtractor>,
    tts: TtsService,
    storage: AudioStorage,
    records: AudioRecordStore,
}

impl ConversionPipeline {
    pub fn new(
        pdf: Arc<dyn TextExtractor>,
        image: Arc<dyn TextExtractor>,
        tts: TtsService,
        storage: AudioStorage,
        records: AudioRecordStore,
    ) -> Self {
        Self {
            pdf,
            image,
            tts,
            storage,
            records,
        }
    }

    pub async fn convert(&self, input: ConversionInput) -> Result<AudioReference, AppError> {
        let kind = input.kind();

        let text = match input {
            ConversionInput::Text(text) => extract::from_plain_text(text)?,
            ConversionInput::Pdf(data) => extract_blocking(&self.pdf, require_upload(data)?).await?,
            ConversionInput::Image(data) => {
                extract_blocking(&self.image, require_upload(data)?).await?
            }
        };

        let audio = self.tts.speak(&text).await?;

        let filename = AudioStorage::generate_filename();
        self.storage.write(&filename, &audio).await?;

        if let Err(e) = self.records.insert(&filename).await {
            warn!("Audio file {} is orphaned: record insert failed: {}", filename, e);
            return Err(e);
        }

        info!("Converted {} input into {}", kind, filename);
        Ok(AudioReference { filename })
    }
}

fn require_upload(data: Option<Vec<u8>>) -> Result<Vec<u8>, AppError> {
    match data {
        Some(data) if !data.is_empty() => Ok(data),
        Some(_) => Err(AppError::InvalidRequest("Uploaded file is empty".into())),
        None => Err(AppError::InvalidRequest("Missing 'file' upload".into())),
    }
}

async fn extract_blocking(
    extractor: &Arc<dyn TextExtractor>,
    data: Vec<u8>,
) -> Result<String, AppError> {
    let extractor = Arc::clone(extractor);
    // A panicking parser surfaces as a JoinError.
    tokio::task::spawn_blocking(move || extractor.extract(&data))
        .await
        .map_err(|e| AppError::Extraction(format!("extraction task failed: {}", e)))?
}
