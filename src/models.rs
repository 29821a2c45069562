use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{FlowError, Result};

/// Language tag of the untranslated track
pub const ORIGINAL_LANG: &str = "original";

/// One timed fragment of a transcript, in original chronological position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A transcript as returned by the speech-to-text provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub language: String,
    pub duration: f64,
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
}

/// Timed text as written to a subtitle file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedText {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TimedText {
    pub fn new<S: Into<String>>(start: f64, end: f64, text: S) -> Self {
        Self { start, end, text: text.into() }
    }
}

impl From<&TranscriptSegment> for TimedText {
    fn from(segment: &TranscriptSegment) -> Self {
        Self::new(segment.start, segment.end, segment.text.clone())
    }
}

/// Ordered timed text per language tag
pub type LanguageResult = BTreeMap<String, Vec<TimedText>>;

/// A persisted subtitle file and its language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub uri: String,
    pub lang: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

/// Persisted AI data of one video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub video_id: u64,
    pub status: JobStatus,
    #[serde(default)]
    pub subtitles: Vec<SubtitleTrack>,
    #[serde(default)]
    pub subtitles_video_url: Option<String>,
    #[serde(default)]
    pub translate_video_url: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(video_id: u64) -> Self {
        Self {
            video_id,
            status: JobStatus::Pending,
            subtitles: Vec::new(),
            subtitles_video_url: None,
            translate_video_url: None,
            summary: None,
            updated_at: Utc::now(),
        }
    }

    pub fn track(&self, lang: &str) -> Option<&SubtitleTrack> {
        self.subtitles.iter().find(|t| t.lang == lang)
    }
}

/// A stored media file owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: u64,
    pub user_id: u64,
    pub filename: String,
    pub filepath: String,
}

/// Provider credentials and model choices of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub name: String,
    pub user_id: u64,
    pub ai_token: String,
    #[serde(default)]
    pub whisper_model: String,
    #[serde(default)]
    pub tts_model: String,
    #[serde(default)]
    pub gpt_model: String,
}

/// Body of the transcription and summary endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub setting_id: u64,
    #[serde(default)]
    pub langs: Vec<String>,
}

impl JobRequest {
    /// Checks a transcription request and returns its target languages
    pub fn validate_transcription(&self) -> Result<Vec<String>> {
        if self.id == 0 {
            return Err(FlowError::Validation("ID video not specified or invalid".to_string()));
        }
        if self.setting_id == 0 {
            return Err(FlowError::Validation("SettingID not specified or invalid".to_string()));
        }
        normalize_languages(&self.langs)
    }

    /// Checks a summary request and returns the summary language
    pub fn validate_summary(&self) -> Result<String> {
        if self.id == 0 {
            return Err(FlowError::Validation("ID video not specified or invalid".to_string()));
        }
        if self.setting_id == 0 {
            return Err(FlowError::Validation("SettingID not specified or invalid".to_string()));
        }
        let langs = normalize_languages(&self.langs)?;
        Ok(langs[0].clone())
    }
}

/// Trims tags, drops duplicates keeping the first occurrence and rejects the reserved tag.
pub fn normalize_languages(langs: &[String]) -> Result<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(langs.len());
    for lang in langs {
        let lang = lang.trim();
        if lang.is_empty() {
            continue;
        }
        if lang == ORIGINAL_LANG {
            return Err(FlowError::Validation(format!(
                "'{}' is reserved and cannot be a target language",
                ORIGINAL_LANG
            )));
        }
        // Tags name the subtitle files
        if lang.contains(['/', '\\']) || lang == "." || lang == ".." {
            return Err(FlowError::Validation(format!("Invalid language '{}'", lang)));
        }
        if !normalized.iter().any(|l| l == lang) {
            normalized.push(lang.to_string());
        }
    }

    if normalized.is_empty() {
        return Err(FlowError::Validation("No languages provided in 'langs'".to_string()));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: u64, setting_id: u64, langs: &[&str]) -> JobRequest {
        JobRequest {
            id,
            setting_id,
            langs: langs.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn test_transcription_request_requires_ids_and_languages() {
        assert!(matches!(
            request(0, 1, &["fr"]).validate_transcription(),
            Err(FlowError::Validation(_))
        ));
        assert!(matches!(
            request(1, 0, &["fr"]).validate_transcription(),
            Err(FlowError::Validation(_))
        ));
        assert!(matches!(
            request(1, 1, &[]).validate_transcription(),
            Err(FlowError::Validation(_))
        ));
        assert_eq!(request(1, 1, &["fr"]).validate_transcription().unwrap(), vec!["fr"]);
    }

    #[test]
    fn test_languages_are_deduplicated_in_order() {
        let langs = request(1, 1, &["de", " fr", "de", "", "es"])
            .validate_transcription()
            .unwrap();
        assert_eq!(langs, vec!["de", "fr", "es"]);
    }

    #[test]
    fn test_reserved_tag_is_rejected() {
        let err = request(1, 1, &["fr", "original"]).validate_transcription().unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_path_like_tags_are_rejected() {
        for tag in ["../de", "fr/ca", "de\\at", ".."] {
            assert!(
                matches!(request(1, 1, &["en", tag]).validate_transcription(), Err(FlowError::Validation(_))),
                "{} accepted",
                tag
            );
        }
        assert!(request(1, 1, &["pt-BR", "zh_Hans"]).validate_transcription().is_ok());
    }

    #[test]
    fn test_summary_uses_first_language() {
        assert_eq!(request(3, 2, &["uk", "en"]).validate_summary().unwrap(), "uk");
        assert!(request(3, 0, &["uk"]).validate_summary().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        assert!(JobStatus::Error.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }
}
