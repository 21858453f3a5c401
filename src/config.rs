use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("Invalid password hashing parameters: {0}")]
    Hashing(String),
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub audio_dir: PathBuf,
    pub tts: TtsConfig,
    pub ocr: OcrConfig,
    pub hashing: HashingConfig,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub lang: String,
    pub tld: String,
    pub slow: bool,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub binary: String,
    pub lang: String,
}

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        let hashing = HashingConfig::default();

        Ok(Self {
            host: var("HOST", "0.0.0.0"),
            port: parse(&lookup, "PORT", 5000)?,
            database_url: var("DATABASE_URL", "sqlite:textcast.db"),
            database_max_connections: parse(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            audio_dir: PathBuf::from(var("AUDIO_DIR", "static/audio")),
            tts: TtsConfig {
                lang: var("TTS_LANG", "en"),
                tld: var("TTS_TLD", "com"),
                slow: parse(&lookup, "TTS_SLOW", false)?,
            },
            ocr: OcrConfig {
                binary: var("TESSERACT_BIN", "tesseract"),
                lang: var("OCR_LANG", "eng"),
            },
            hashing: HashingConfig {
                memory_kib: parse(&lookup, "HASH_MEMORY_KIB", hashing.memory_kib)?,
                iterations: parse(&lookup, "HASH_ITERATIONS", hashing.iterations)?,
                parallelism: parse(&lookup, "HASH_PARALLELISM", hashing.parallelism)?,
            },
            max_upload_bytes: parse(&lookup, "MAX_UPLOAD_BYTES", 25 * 1024 * 1024)?,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::Invalid {
            name: "HOST",
            value: self.host.clone(),
        })
    }
}

fn parse<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.audio_dir, PathBuf::from("static/audio"));
        assert_eq!(config.tts.lang, "en");
        assert!(!config.tts.slow);
        assert_eq!(config.hashing.memory_kib, argon2::Params::DEFAULT_M_COST);
        assert_eq!(config.bind_addr().unwrap().to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn overrides_from_environment() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("TTS_TLD", "co.uk"),
            ("TTS_SLOW", "true"),
            ("HASH_ITERATIONS", "4"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.tts.tld, "co.uk");
        assert!(config.tts.slow);
        assert_eq!(config.hashing.iterations, 4);
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
