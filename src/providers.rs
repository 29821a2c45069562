use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::error::{FlowError, Result};
use crate::models::UserProfile;
use crate::transcribe::{OpenAiTranscriber, Transcriber};
use crate::translate::{OpenAiTranslator, Translator};

/// Builds provider clients bound to one user's credential and models
#[cfg_attr(test, mockall::automock)]
pub trait ProviderFactory: Send + Sync {
    fn transcriber(&self, profile: &UserProfile) -> Result<Arc<dyn Transcriber>>;

    fn translator(&self, profile: &UserProfile) -> Result<Arc<dyn Translator>>;
}

/// Factory for OpenAI-compatible endpoints
pub struct OpenAiProviders {
    config: ProviderConfig,
}

impl OpenAiProviders {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    fn token<'a>(&self, profile: &'a UserProfile) -> Result<&'a str> {
        let token = profile.ai_token.trim();
        if token.is_empty() {
            return Err(FlowError::Config(format!(
                "profile {} has no provider token",
                profile.id
            )));
        }
        Ok(token)
    }

    fn pick<'a>(preferred: &'a str, fallback: &'a str) -> &'a str {
        if preferred.trim().is_empty() { fallback } else { preferred }
    }
}

impl ProviderFactory for OpenAiProviders {
    fn transcriber(&self, profile: &UserProfile) -> Result<Arc<dyn Transcriber>> {
        let transcriber = OpenAiTranscriber::new(
            &self.config.transcription_url,
            self.token(profile)?,
            Self::pick(&profile.whisper_model, &self.config.default_whisper_model),
            self.config.transcription_timeout(),
        )?;
        Ok(Arc::new(transcriber))
    }

    fn translator(&self, profile: &UserProfile) -> Result<Arc<dyn Translator>> {
        let translator = OpenAiTranslator::new(
            &self.config.chat_url,
            self.token(profile)?,
            Self::pick(&profile.gpt_model, &self.config.default_chat_model),
            self.config.max_tokens,
            self.config.request_timeout(),
        )?;
        Ok(Arc::new(translator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn profile(token: &str) -> UserProfile {
        UserProfile {
            id: 9,
            name: "default".to_string(),
            user_id: 1,
            ai_token: token.to_string(),
            whisper_model: String::new(),
            tts_model: String::new(),
            gpt_model: "gpt-4o-mini".to_string(),
        }
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let providers = OpenAiProviders::new(Config::default().provider);
        assert!(matches!(providers.transcriber(&profile("  ")), Err(FlowError::Config(_))));
        assert!(matches!(providers.translator(&profile("")), Err(FlowError::Config(_))));
    }

    #[test]
    fn test_clients_build_with_token() {
        let providers = OpenAiProviders::new(Config::default().provider);
        assert!(providers.transcriber(&profile("sk-1")).is_ok());
        assert!(providers.translator(&profile("sk-1")).is_ok());
    }

    #[test]
    fn test_model_fallback() {
        assert_eq!(OpenAiProviders::pick("", "whisper-1"), "whisper-1");
        assert_eq!(OpenAiProviders::pick("gpt-4o-mini", "gpt-3.5-turbo"), "gpt-4o-mini");
    }
}
