#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stepsim::audio::{AudioSink, PcmClip};
use stepsim::services::llm::{GenerateRequest, GenerateResponse, GenerativeTransport};
use stepsim::services::{ConversationClient, SpeechClient};
use stepsim::{RetryPolicy, ServiceConfig, ServiceError};

pub type Reply = Result<GenerateResponse, ServiceError>;

/// Replays canned replies in order; records every request it sees.
/// A reply can be held back for a while to simulate a slow endpoint.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<(Duration, Reply)>>,
    requests: Mutex<Vec<GenerateRequest>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, reply: Reply) {
        self.push_delayed(reply, Duration::ZERO);
    }

    pub fn push_delayed(&self, reply: Reply, delay: Duration) {
        self.replies.lock().unwrap().push_back((delay, reply));
    }

    pub fn push_state(&self, state: serde_json::Value) {
        self.push(Ok(text_response(&state.to_string())));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> GenerateRequest {
        self.requests.lock().unwrap().last().cloned().expect("no request sent")
    }
}

#[async_trait]
impl GenerativeTransport for ScriptedTransport {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some((delay, reply)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                reply
            }
            None => Err(ServiceError::unknown("script exhausted")),
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub clips: Mutex<Vec<PcmClip>>,
}

impl RecordingSink {
    pub fn played(&self) -> usize {
        self.clips.lock().unwrap().len()
    }
}

impl AudioSink for RecordingSink {
    fn play(&self, clip: &PcmClip) -> anyhow::Result<()> {
        self.clips.lock().unwrap().push(clip.clone());
        Ok(())
    }
}

pub fn text_response(text: &str) -> GenerateResponse {
    serde_json::from_value(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    }))
    .unwrap()
}

pub fn audio_response(b64: &str) -> GenerateResponse {
    serde_json::from_value(json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "inlineData": { "mimeType": "audio/L16;codec=pcm;rate=24000", "data": b64 } }]
            }
        }]
    }))
    .unwrap()
}

pub fn cafe_state(first: &str, second: &str) -> serde_json::Value {
    json!({
        "characterVoice": "שלום! מה תרצה להזמין?",
        "screenText": "שלום! מה תרצה להזמין? (Hello! What would you like to order?)",
        "goalStatus": [
            { "id": "greet", "label": "Greet the barista", "emoji": "👋", "status": first },
            { "id": "order", "label": "Order a coffee", "emoji": "☕", "status": second }
        ]
    })
}

pub fn test_config(retries: u32) -> ServiceConfig {
    ServiceConfig {
        retry: RetryPolicy::new(retries, Duration::from_millis(1500)),
        ..ServiceConfig::default()
    }
}

pub fn clients(
    transport: Arc<ScriptedTransport>,
    sink: Arc<RecordingSink>,
    retries: u32,
) -> (ConversationClient, SpeechClient) {
    let config = test_config(retries);
    let conversation = ConversationClient::new(transport.clone(), &config);
    let speech = SpeechClient::new(transport, sink, &config);
    (conversation, speech)
}
