// Language model boundary
//
// Translation and summarization go through the same chat-style provider;
// the fan-out engine and the summary flow only see the `Translator` trait.

pub mod openai;

use async_trait::async_trait;

pub use openai::{ChatMessage, ChatRequest, ChatResponse, OpenAiTranslator};

use crate::error::Result;

/// Main trait for language model operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate one text into `target_language`
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;

    /// Produce a short summary of `text` written in `language`
    async fn summarize(&self, text: &str, language: &str) -> Result<String>;
}
