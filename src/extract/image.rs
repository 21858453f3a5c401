use std::io::{Cursor, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};

use super::TextExtractor;
use crate::config::OcrConfig;
use crate::error::AppError;

/// Optical character recognition over an already decoded image.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<String, AppError>;
}

/// Decodes an uploaded image and hands it to an [`OcrEngine`].
#[derive(Clone)]
pub struct ImageExtractor {
    engine: Arc<dyn OcrEngine>,
}

impl ImageExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self { engine }
    }
}

impl TextExtractor for ImageExtractor {
    fn extract(&self, data: &[u8]) -> Result<String, AppError> {
        let image = image::load_from_memory(data)
            .map_err(|e| AppError::Extraction(format!("Failed to decode image: {}", e)))?;

        tracing::debug!("Decoded {}x{} image", image.width(), image.height());
        self.engine.recognize(&image)
    }
}

/// Runs the `tesseract` command line tool.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
    lang: String,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            lang: config.lang.clone(),
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &DynamicImage) -> Result<String, AppError> {
        let png = to_grayscale_png(image)?;

        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", &self.lang])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AppError::Extraction(format!(
                    "Failed to run {} (is it installed?): {}",
                    self.binary, e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .map_err(|e| AppError::Extraction(format!("Failed to feed tesseract: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| AppError::Extraction(format!("tesseract did not finish: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Extraction(format!("tesseract failed: {}", stderr)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn to_grayscale_png(image: &DynamicImage) -> Result<Vec<u8>, AppError> {
    let mut buffer = Vec::new();
    DynamicImage::ImageLuma8(image.to_luma8())
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| AppError::Extraction(format!("Failed to encode image: {}", e)))?;
    Ok(buffer)
}

/// A small blank PNG for tests.
#[cfg(test)]
pub(crate) fn sample_png() -> Vec<u8> {
    let img = image::GrayImage::from_pixel(8, 8, image::Luma([255]));
    let mut buffer = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

/// OCR stub that always "recognizes" the same text.
#[cfg(test)]
pub(crate) struct FixedOcr(pub &'static str);

#[cfg(test)]
impl OcrEngine for FixedOcr {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, AppError> {
        Ok(self.0.to_string())
    }
}
