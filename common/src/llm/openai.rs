use crate::config::LlmConfig;
use crate::error::{Nl2SqlError, Result};
use crate::llm::model::{LanguageModel, Message};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// client for an openai-compatible `/chat/completions` endpoint
pub struct OpenAiModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiModel {
    pub fn new(client: reqwest::Client, config: &LlmConfig, model: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: model.into(),
            temperature: config.temperature,
        }
    }

    /// shared http client with the configured request timeout
    pub fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Nl2SqlError::Config(format!("failed to build http client: {}", e)))
    }

    /// models for query synthesis and answer rendering, sharing one client
    pub fn pair(config: &LlmConfig) -> Result<(Self, Self)> {
        let client = Self::http_client(config)?;
        Ok((
            Self::new(client.clone(), config, config.synthesis_model.clone()),
            Self::new(client, config, config.rendering_model.clone()),
        ))
    }
}

fn first_choice(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .ok_or_else(|| Nl2SqlError::LanguageModel("completion contained no choices".to_string()))
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.model
    }

    #[tracing::instrument(skip(self, messages), fields(llm.model = %self.model, message_count = messages.len()))]
    async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: &messages,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Nl2SqlError::LanguageModel(format!(
                "completion request failed with {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        let output = first_choice(parsed)?;

        tracing::debug!("generated {} chars", output.len());
        Ok(output)
    }
}
