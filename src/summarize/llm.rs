use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SummarizationConfig;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("summary request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unexpected response from completion service: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

pub struct LlmClient {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl LlmClient {
    /// Create a new LLM client from config.
    pub fn from_config(config: &SummarizationConfig) -> anyhow::Result<Self> {
        let api_key = if config.api_key.is_empty() {
            std::env::var("VOICEBATCH_OPENAI_KEY").map_err(|_| {
                anyhow::anyhow!(
                    "Completion API key not configured. \
                     Set [summarization] api_key or VOICEBATCH_OPENAI_KEY"
                )
            })?
        } else {
            config.api_key.clone()
        };

        if config.model.is_empty() {
            anyhow::bail!("Summarization model not configured. Set [summarization] model");
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            client,
        })
    }

    /// Send one chat completion request and return the response text.
    pub fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String, SummaryError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        tracing::info!("Requesting summary from {} ({})", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(SummaryError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .map_err(|e| SummaryError::InvalidResponse(e.to_string()))?;

        if let Some(usage) = &chat_response.usage {
            tracing::info!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }

        let choice = chat_response
            .choices
            .first()
            .ok_or_else(|| SummaryError::InvalidResponse("no choices in response".to_string()))?;

        if let Some(reason) = &choice.finish_reason {
            if reason != "stop" {
                tracing::warn!("Chat completion finish_reason: {}", reason);
            }
        }

        Ok(choice.message.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SummarizationConfig;

    #[test]
    fn test_from_config_with_key() {
        let config = SummarizationConfig {
            api_key: "test-key".to_string(),
            ..Default::default()
        };
        let client = LlmClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, "https://api.openai.com");
        assert_eq!(client.model, "gpt-4o");
        assert_eq!(client.max_tokens, 2500);
    }

    #[test]
    fn test_from_config_missing_model() {
        let config = SummarizationConfig {
            api_key: "test-key".to_string(),
            model: String::new(),
            ..Default::default()
        };
        let result = LlmClient::from_config(&config);
        assert!(result.is_err());
        assert!(
            result.unwrap_err().to_string().contains("model"),
            "Error should mention the model"
        );
    }

    #[test]
    fn test_from_config_trims_trailing_slash() {
        let config = SummarizationConfig {
            api_key: "test-key".to_string(),
            base_url: "https://llm.example.com/".to_string(),
            ..Default::default()
        };
        let client = LlmClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, "https://llm.example.com");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = SummarizationConfig {
            api_key: "very-secret".to_string(),
            ..Default::default()
        };
        let client = LlmClient::from_config(&config).unwrap();
        let debug_output = format!("{:?}", client);
        assert!(!debug_output.contains("very-secret"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
