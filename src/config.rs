use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::retry::{RetryPolicy, DEFAULT_INITIAL_DELAY, DEFAULT_RETRIES};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Kore";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// API key handle shared by every client built from one config.
/// `replace` swaps it at runtime (personal key override).
#[derive(Clone, Default)]
pub struct SharedCredential {
    inner: Arc<RwLock<String>>,
}

impl SharedCredential {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(key.into())),
        }
    }

    pub fn get(&self) -> String {
        match self.inner.read() {
            Ok(key) => key.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, key: impl Into<String>) {
        let key = key.into();
        match self.inner.write() {
            Ok(mut slot) => *slot = key,
            Err(poisoned) => *poisoned.into_inner() = key,
        }
    }

    pub fn is_set(&self) -> bool {
        !self.get().trim().is_empty()
    }
}

// Never print the key itself
impl std::fmt::Debug for SharedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCredential")
            .field("set", &self.is_set())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioOutput {
    Device,
    Wav(PathBuf),
    Muted,
}

impl std::str::FromStr for AudioOutput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(dir) = s.strip_prefix("wav:") {
            if dir.is_empty() {
                return Err(anyhow!("wav output needs a directory, e.g. wav:./out"));
            }
            return Ok(AudioOutput::Wav(PathBuf::from(dir)));
        }
        match s.to_ascii_lowercase().as_str() {
            "device" | "" => Ok(AudioOutput::Device),
            "none" | "off" | "mute" => Ok(AudioOutput::Muted),
            other => Err(anyhow!("Unknown audio output '{}'", other)),
        }
    }
}

/// Built once at startup and passed to every client explicitly.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub credential: SharedCredential,
    pub base_url: String,
    pub chat_model: String,
    pub tts_model: String,
    pub voice: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub audio: AudioOutput,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            credential: SharedCredential::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            audio: AudioOutput::Device,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, with the variable source injected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("API_KEY")) {
            cfg.credential = SharedCredential::new(key.trim());
        }
        if let Some(url) = get("STEPSIM_BASE_URL") {
            cfg.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(model) = get("STEPSIM_CHAT_MODEL") {
            cfg.chat_model = model;
        }
        if let Some(model) = get("STEPSIM_TTS_MODEL") {
            cfg.tts_model = model;
        }
        if let Some(voice) = get("STEPSIM_VOICE") {
            cfg.voice = voice;
        }
        if let Some(secs) = get("STEPSIM_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("STEPSIM_TIMEOUT_SECS is not a number: {}", secs))?;
            cfg.timeout = Duration::from_secs(secs);
        }

        let retries = match get("STEPSIM_RETRIES") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("STEPSIM_RETRIES is not a number: {}", v))?,
            None => DEFAULT_RETRIES,
        };
        let initial_delay = match get("STEPSIM_RETRY_DELAY_MS") {
            Some(v) => Duration::from_millis(
                v.trim()
                    .parse()
                    .with_context(|| format!("STEPSIM_RETRY_DELAY_MS is not a number: {}", v))?,
            ),
            None => DEFAULT_INITIAL_DELAY,
        };
        cfg.retry = RetryPolicy::new(retries, initial_delay);

        if let Some(audio) = get("STEPSIM_AUDIO") {
            cfg.audio = audio.parse()?;
        }

        Ok(cfg)
    }
}
