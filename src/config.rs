use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// When the recognizer considers an utterance finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Trailing silence that ends an utterance.
    pub silence_ms: u64,
    /// Hard cap on a single utterance.
    pub max_utterance_secs: u64,
    /// Give up with "no speech" if nothing was heard this long.
    pub no_speech_secs: u64,
    /// RMS level above which a frame counts as speech.
    pub level_threshold: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            silence_ms: 1200,
            max_utterance_secs: 15,
            no_speech_secs: 6,
            level_threshold: 0.02,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Recognition language (whisper language code).
    pub language: String,
    /// Whisper model file; defaults to the data directory copy.
    pub model_path: Option<PathBuf>,
    /// Where backups are written; defaults to the download directory.
    pub export_dir: Option<PathBuf>,
    /// Overrides where the task blob is stored.
    pub storage_dir: Option<PathBuf>,
    pub speech: SpeechConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: "en".into(),
            model_path: None,
            export_dir: None,
            storage_dir: None,
            speech: SpeechConfig::default(),
        }
    }
}

impl Config {
    /// ~/.config/voice-todo/config.json
    fn path() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("voice-todo");
        p.push("config.json");
        p
    }

    /// Load from disk, returning defaults if file doesn't exist or is invalid.
    pub fn load() -> Self {
        let path = Self::path();
        match fs::read_to_string(&path) {
            Ok(data) => Self::parse(&data),
            Err(_) => Self::default(),
        }
    }

    fn parse(data: &str) -> Self {
        serde_json::from_str(data).unwrap_or_else(|e| {
            log::warn!("Ignoring invalid config: {e}");
            Self::default()
        })
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_path.clone().unwrap_or_else(|| {
            let mut p = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
            p.push("voice-todo");
            p.push("models");
            p.push("ggml-base.en.bin");
            p
        })
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(crate::storage::FileStore::default_dir)
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(crate::storage::FileStore::default_dir)
    }
}
