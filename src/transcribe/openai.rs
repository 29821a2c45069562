// OpenAI-compatible transcription endpoint (multipart upload, verbose JSON reply)

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{FlowError, Result};
use crate::models::{Transcript, TranscriptSegment};
use super::Transcriber;

/// Verbose JSON body returned by the transcription endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperResponse {
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub segments: Vec<WhisperSegment>,
}

/// Segment entry of [`WhisperResponse`]; only timing and text are used
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperSegment {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub seek: Option<u64>,
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub avg_logprob: Option<f64>,
    #[serde(default)]
    pub no_speech_prob: Option<f64>,
}

impl From<WhisperResponse> for Transcript {
    fn from(response: WhisperResponse) -> Self {
        // Ordinal position, not the provider id, is the ordering key downstream
        let segments = response
            .segments
            .into_iter()
            .enumerate()
            .map(|(index, seg)| TranscriptSegment {
                index,
                start: seg.start,
                end: seg.end,
                text: seg.text,
            })
            .collect();

        Transcript {
            language: response.language,
            duration: response.duration,
            text: response.text,
            segments,
        }
    }
}

pub struct OpenAiTranscriber {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiTranscriber {
    /// `timeout` of `None` lets the upload block until the provider answers
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    async fn build_form(&self, media_path: &Path) -> Result<Form> {
        let data = tokio::fs::read(media_path).await.map_err(|e| {
            FlowError::Transcription(format!("failed to open {}: {}", media_path.display(), e))
        })?;

        let file_name = media_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "media".to_string());

        Ok(Form::new()
            .part("file", Part::bytes(data).file_name(file_name))
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment"))
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, media_path: &Path) -> Result<Transcript> {
        info!("Uploading {} for transcription", media_path.display());

        let form = self.build_form(media_path).await?;

        let response = self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| FlowError::Transcription(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(FlowError::Transcription(format!(
                "provider error {}: {}", status, error_text
            )));
        }

        let whisper: WhisperResponse = response.json().await
            .map_err(|e| FlowError::Transcription(format!("Failed to parse response: {}", e)))?;

        debug!(
            language = %whisper.language,
            duration = whisper.duration,
            segments = whisper.segments.len(),
            "Transcription received"
        );

        Ok(whisper.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::post};
    use serde_json::json;

    async fn spawn_provider(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1/audio/transcriptions", addr)
    }

    #[test]
    fn test_segments_are_indexed_by_position() {
        let response: WhisperResponse = serde_json::from_value(json!({
            "task": "transcribe",
            "language": "english",
            "duration": 4.0,
            "text": "one two",
            "segments": [
                {"id": 7, "start": 0.0, "end": 2.0, "text": "one", "tokens": [1, 2]},
                {"id": 3, "start": 2.0, "end": 4.0, "text": "two"}
            ]
        }))
        .unwrap();

        let transcript: Transcript = response.into();
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.segments[0].index, 0);
        assert_eq!(transcript.segments[1].index, 1);
        assert_eq!(transcript.segments[1].text, "two");
    }

    #[tokio::test]
    async fn test_uploads_multipart_and_parses_reply() {
        let router = Router::new().route(
            "/v1/audio/transcriptions",
            post(|headers: HeaderMap| async move {
                let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
                let content_type = headers
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth != Some("Bearer sk-test") || !content_type.starts_with("multipart/form-data") {
                    return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad request"})));
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "task": "transcribe",
                        "language": "english",
                        "duration": 1.5,
                        "text": "hello",
                        "segments": [{"start": 0.0, "end": 1.5, "text": "hello"}]
                    })),
                )
            }),
        );
        let endpoint = spawn_provider(router).await;

        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("clip.mp4");
        tokio::fs::write(&media, b"not really a video").await.unwrap();

        let transcriber = OpenAiTranscriber::new(endpoint, "sk-test", "whisper-1", None).unwrap();
        let transcript = transcriber.transcribe(&media).await.unwrap();

        assert_eq!(transcript.language, "english");
        assert_eq!(transcript.segments[0].text, "hello");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let router = Router::new().route(
            "/v1/audio/transcriptions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let endpoint = spawn_provider(router).await;

        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("clip.mp4");
        tokio::fs::write(&media, b"data").await.unwrap();

        let transcriber = OpenAiTranscriber::new(endpoint, "sk-test", "whisper-1", None).unwrap();
        let err = transcriber.transcribe(&media).await.unwrap_err();
        assert!(err.to_string().contains("slow down"));
    }

    #[tokio::test]
    async fn test_missing_media_fails_before_upload() {
        let transcriber =
            OpenAiTranscriber::new("http://127.0.0.1:9/unused", "sk-test", "whisper-1", None).unwrap();
        let err = transcriber.transcribe(Path::new("/nonexistent/clip.mp4")).await.unwrap_err();
        assert!(matches!(err, FlowError::Transcription(_)));
    }
}
