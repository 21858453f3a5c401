use async_trait::async_trait;
use base64::Engine as _;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

use super::tokenizer::{self, MAX_CHUNK_CHARS};
use super::SpeechEngine;
use crate::config::TtsConfig;
use crate::error::AppError;

const RPC_ID: &str = "jQ1olc";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

lazy_static! {
    static ref AUDIO_REGEX: Regex = Regex::new(r#"jQ1olc","\[\\"(.*?)\\"\]"#).unwrap();
}

/// Google Translate's speech endpoint. Produces MP3.
pub struct GoogleTts {
    client: reqwest::Client,
    endpoint: String,
    lang: String,
    slow: bool,
}

impl GoogleTts {
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!(
                "https://translate.google.{}/_/TranslateWebserverUi/data/batchexecute",
                config.tld
            ),
            lang: config.lang.clone(),
            slow: config.slow,
        }
    }

    async fn synthesize_chunk(&self, chunk: &str) -> Result<Vec<u8>, AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::REFERER, "http://translate.google.com/")
            .form(&[("f.req", rpc_payload(chunk, &self.lang, self.slow))])
            .send()
            .await
            .map_err(|e| AppError::Synthesis(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Synthesis(format!("endpoint returned {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Synthesis(format!("failed to read response: {}", e)))?;

        decode_audio(&body)
    }
}

#[async_trait]
impl SpeechEngine for GoogleTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AppError> {
        let chunks = tokenizer::chunk(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(AppError::Synthesis("no speakable text".into()));
        }

        let mut audio = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            tracing::debug!("Synthesizing chunk {}/{}", i + 1, chunks.len());
            audio.extend(self.synthesize_chunk(chunk).await?);
        }

        Ok(audio)
    }
}

/// The `f.req` form value for one chunk.
fn rpc_payload(text: &str, lang: &str, slow: bool) -> String {
    let speed = if slow { Value::Bool(true) } else { Value::Null };
    let parameter = json!([text, lang, speed, "null"]).to_string();
    json!([[[RPC_ID, parameter, null, "generic"]]]).to_string()
}

/// Concatenate the base64 MP3 fragments found in a batchexecute response.
fn decode_audio(body: &str) -> Result<Vec<u8>, AppError> {
    let mut audio = Vec::new();

    for line in body.lines().filter(|l| l.contains(RPC_ID)) {
        if let Some(cap) = AUDIO_REGEX.captures(line) {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(&cap[1])
                .map_err(|e| AppError::Synthesis(format!("invalid audio payload: {}", e)))?;
            audio.extend(bytes);
        }
    }

    if audio.is_empty() {
        return Err(AppError::Synthesis("response contained no audio".into()));
    }

    Ok(audio)
}
