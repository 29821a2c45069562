use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{FlowError, Result};
use super::Translator;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user<S: Into<String>>(content: S) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl ChatResponse {
    /// Content of the first choice, if any and non-empty
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .filter(|c| !c.is_empty())
    }
}

/// Chat-completion client used for both translation and summaries
pub struct OpenAiTranslator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiTranslator {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
        })
    }

    fn translation_prompt(target_language: &str) -> String {
        format!(
            "Translate the following text to {} and remove all punctuation marks. \
             Respond with only the translated text and nothing else.",
            target_language
        )
    }

    fn summary_prompt(language: &str) -> String {
        format!(
            "Summarize the following text in {}. \
             Respond with only the summary and nothing else.",
            language
        )
    }

    /// Send one system + user exchange and return the first answer.
    ///
    /// Transport and decoding failures stay `FlowError::Http`; provider
    /// refusals and empty answers are built with `failure`.
    async fn complete<F>(&self, system: String, text: &str, failure: F) -> Result<String>
    where
        F: Fn(String) -> FlowError,
    {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(text)],
            max_tokens: self.max_tokens,
        };

        debug!("Sending chat request to: {}", self.endpoint);

        let response = self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(failure(format!("provider error {}: {}", status, error_text)));
        }

        let chat: ChatResponse = response.json().await?;

        chat.first_content()
            .map(|c| c.trim().to_string())
            .ok_or_else(|| failure("no content found in response".to_string()))
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        self.complete(Self::translation_prompt(target_language), text, |e| {
            FlowError::Translation(format!("to {}: {}", target_language, e))
        })
        .await
    }

    async fn summarize(&self, text: &str, language: &str) -> Result<String> {
        self.complete(Self::summary_prompt(language), text, FlowError::Summary).await
    }
}
