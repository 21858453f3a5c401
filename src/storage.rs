use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::AppError;

pub const AUDIO_EXTENSION: &str = "mp3";
pub const AUDIO_URL_PREFIX: &str = "/static/audio";

/// Directory of generated audio files, addressed by filename.
#[derive(Debug, Clone)]
pub struct AudioStorage {
    root: PathBuf,
}

impl AudioStorage {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A fresh random filename (UUIDv4, 122 random bits).
    pub fn generate_filename() -> String {
        format!("{}.{}", uuid::Uuid::new_v4(), AUDIO_EXTENSION)
    }

    pub fn public_path(filename: &str) -> String {
        format!("{}/{}", AUDIO_URL_PREFIX, filename)
    }

    /// Write `audio` under `filename`. An existing file is overwritten.
    pub async fn write(&self, filename: &str, audio: &[u8]) -> Result<(), AppError> {
        let path = self.root.join(filename);
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(audio).await?;
        file.sync_all().await?;
        tracing::debug!("Wrote {} bytes to {}", audio.len(), path.display());
        Ok(())
    }
}
