use std::sync::Arc;
use tracing::{debug, info};

use super::llm::{Content, GenerateRequest, GenerationConfig, GenerativeTransport};
use super::prompt;
use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::retry::RetryPolicy;
use crate::simulation::{Goal, SimulationState};

/// Start / message / hint exchanges. All three share one response schema
/// and all three run under the retry policy.
#[derive(Clone)]
pub struct ConversationClient {
    transport: Arc<dyn GenerativeTransport>,
    model: String,
    retry: RetryPolicy,
}

impl ConversationClient {
    pub fn new(transport: Arc<dyn GenerativeTransport>, config: &ServiceConfig) -> Self {
        Self {
            transport,
            model: config.chat_model.clone(),
            retry: config.retry,
        }
    }

    pub async fn start_simulation(&self, scenario: &str) -> Result<SimulationState, ServiceError> {
        info!("Starting simulation");
        let request = self.request(scenario, prompt::start_content(scenario));
        self.exchange(request).await
    }

    /// `None` for a blank utterance; no request is made in that case.
    pub async fn send_message(
        &self,
        utterance: &str,
        scenario: &str,
        goals: &[Goal],
    ) -> Result<Option<SimulationState>, ServiceError> {
        if utterance.trim().is_empty() {
            debug!("Blank utterance, nothing sent");
            return Ok(None);
        }
        let request = self.request(scenario, prompt::message_content(utterance, goals)?);
        self.exchange(request).await.map(Some)
    }

    pub async fn get_hint(
        &self,
        screen_text: &str,
        scenario: &str,
        goals: &[Goal],
    ) -> Result<SimulationState, ServiceError> {
        let request = self.request(scenario, prompt::hint_content(screen_text, goals)?);
        self.exchange(request).await
    }

    fn request(&self, scenario: &str, content: String) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            system_instruction: Some(Content::text(prompt::system_instruction(scenario))),
            contents: vec![Content::user(content)],
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(prompt::response_schema()),
                ..Default::default()
            },
        }
    }

    async fn exchange(&self, request: GenerateRequest) -> Result<SimulationState, ServiceError> {
        let request = &request;
        let transport = &self.transport;
        self.retry
            .run(move || async move {
                let response = transport.generate(request).await?;
                SimulationState::from_json(&response.first_text()?)
            })
            .await
    }
}
