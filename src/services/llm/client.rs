use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::wire::{ErrorEnvelope, GenerateRequest, GenerateResponse};
use crate::config::{ServiceConfig, SharedCredential};
use crate::error::ServiceError;

/// One request/response exchange with the generative service.
/// Errors leave this boundary already classified.
#[async_trait]
pub trait GenerativeTransport: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ServiceError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    credential: SharedCredential,
}

impl HttpTransport {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.timeout)
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credential: config.credential.clone(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl GenerativeTransport for HttpTransport {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ServiceError> {
        debug!("POST generateContent model={}", request.model);

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", self.credential.get())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        Ok(parsed)
    }
}

/// Maps a non-success HTTP answer to an error kind.
pub fn classify_failure(status: StatusCode, body: &str) -> ServiceError {
    let envelope: Option<ErrorEnvelope> = serde_json::from_str(body).ok();
    let (service_status, message) = match &envelope {
        Some(env) => (env.error.status.as_str(), env.error.message.as_str()),
        None => ("", body.trim()),
    };

    if status == StatusCode::TOO_MANY_REQUESTS || service_status == "RESOURCE_EXHAUSTED" {
        return ServiceError::rate_limited(format!("HTTP {}: {}", status.as_u16(), message));
    }
    ServiceError::transport(format!("HTTP {}: {}", status.as_u16(), message))
}
