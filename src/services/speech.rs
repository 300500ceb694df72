use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use super::llm::{Content, GenerateRequest, GenerationConfig, GenerativeTransport, SpeechConfig};
use crate::audio::{decode_base64, AudioSink, PcmClip};
use crate::config::ServiceConfig;
use crate::error::{ErrorKind, ServiceError};
use crate::telemetry::SpeechOutcomeKind;

#[derive(Debug, Clone, PartialEq)]
pub enum SpeechOutcome {
    Played { duration: Duration },
    /// Blank text; nothing requested.
    Skipped,
    Failed { kind: ErrorKind },
}

impl SpeechOutcome {
    pub fn kind(&self) -> SpeechOutcomeKind {
        match self {
            SpeechOutcome::Played { .. } => SpeechOutcomeKind::Played,
            SpeechOutcome::Skipped => SpeechOutcomeKind::Skipped,
            SpeechOutcome::Failed { .. } => SpeechOutcomeKind::Failed,
        }
    }
}

/// Text-to-speech. Fresh synthesis on every call, no retries.
#[derive(Clone)]
pub struct SpeechClient {
    transport: Arc<dyn GenerativeTransport>,
    sink: Arc<dyn AudioSink>,
    model: String,
    voice: String,
}

impl SpeechClient {
    pub fn new(
        transport: Arc<dyn GenerativeTransport>,
        sink: Arc<dyn AudioSink>,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            transport,
            sink,
            model: config.tts_model.clone(),
            voice: config.voice.clone(),
        }
    }

    pub async fn synthesize(&self, text: &str) -> Result<PcmClip, ServiceError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            system_instruction: None,
            contents: vec![Content::text(text)],
            generation_config: GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig::prebuilt(self.voice.clone())),
                ..Default::default()
            },
        };

        let response = self.transport.generate(&request).await?;
        let audio = response.first_inline_data()?;
        decode_base64(&audio.data)
    }

    /// Best effort: failures are logged and reported, never returned as errors.
    pub async fn speak(&self, text: &str) -> SpeechOutcome {
        if text.trim().is_empty() {
            return SpeechOutcome::Skipped;
        }

        let clip = match self.synthesize(text).await {
            Ok(clip) => clip,
            Err(e) => {
                error!("TTS Error: {}", e);
                return SpeechOutcome::Failed { kind: e.kind };
            }
        };
        let duration = clip.duration();

        let sink = self.sink.clone();
        match tokio::task::spawn_blocking(move || sink.play(&clip)).await {
            Ok(Ok(())) => {
                debug!("Speech handed to sink ({}ms)", duration.as_millis());
                SpeechOutcome::Played { duration }
            }
            Ok(Err(e)) => {
                error!("Audio playback failed: {}", e);
                SpeechOutcome::Failed { kind: ErrorKind::Unknown }
            }
            Err(e) => {
                error!("Audio playback task failed: {}", e);
                SpeechOutcome::Failed { kind: ErrorKind::Unknown }
            }
        }
    }
}
