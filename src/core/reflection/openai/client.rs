//! OpenAI reflection client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::messages::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, OpenAIErrorResponse,
    ResponseFormat,
};
use crate::core::reflection::base::{
    Reflection, ReflectionConfig, ReflectionError, ReflectionGenerator,
};
use crate::core::reflection::prompt::{EMPATHY_PROMPT, user_message};

/// Default OpenAI API base URL.
pub const OPENAI_API_URL: &str = "https://api.openai.com";

/// A reflection is only useful while the caller is still pausing.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct OpenAIReflection {
    config: ReflectionConfig,
    http_client: Client,
}

impl OpenAIReflection {
    /// Create a client that shares the given connection pool.
    pub fn new(config: ReflectionConfig, http_client: Client) -> Result<Self, ReflectionError> {
        if config.api_key.is_empty() {
            return Err(ReflectionError::InvalidConfiguration(
                "API key is required for OpenAI reflection".to_string(),
            ));
        }

        Ok(Self {
            config,
            http_client,
        })
    }

    fn api_url(&self) -> String {
        let base = self.config.endpoint.as_deref().unwrap_or(OPENAI_API_URL);
        format!("{}/v1/chat/completions", base.trim_end_matches('/'))
    }

    fn build_request(&self, window_text: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage::system(EMPATHY_PROMPT),
                ChatMessage::user(user_message(window_text)),
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        }
    }
}

#[async_trait]
impl ReflectionGenerator for OpenAIReflection {
    async fn reflect(&self, window_text: &str) -> Result<Reflection, ReflectionError> {
        let response = self
            .http_client
            .post(self.api_url())
            .bearer_auth(&self.config.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&self.build_request(window_text))
            .send()
            .await
            .map_err(|e| ReflectionError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| ReflectionError::NetworkError(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let error_msg = match serde_json::from_str::<OpenAIErrorResponse>(&response_text) {
                Ok(error_response) => format!("OpenAI API error: {}", error_response.error.message),
                Err(_) => format!("OpenAI API error ({status}): {response_text}"),
            };
            warn!("{}", error_msg);

            return Err(if status.as_u16() == 401 {
                ReflectionError::AuthenticationFailed(error_msg)
            } else {
                ReflectionError::ProviderError(error_msg)
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| ReflectionError::InvalidResponse(format!("Malformed completion: {e}")))?;

        let content = completion
            .content()
            .ok_or_else(|| ReflectionError::InvalidResponse("Completion has no content".into()))?;

        let reflection: Reflection = serde_json::from_str(content.trim()).map_err(|e| {
            ReflectionError::InvalidResponse(format!("Content is not a reflection: {e}"))
        })?;

        debug!(
            intent = ?reflection.intent,
            chars = reflection.text.len(),
            "Reflection generated"
        );

        Ok(reflection)
    }

    fn get_provider_info(&self) -> &'static str {
        "OpenAI Chat Completions"
    }
}
