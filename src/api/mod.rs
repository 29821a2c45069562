// HTTP surface
//
// Authentication happens in front of this service; the gateway forwards the
// caller's id in the `X-User-Id` header. Every body is a `{status, message, data}` envelope.

pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::workflow::Workflow;
use state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn reply(status: StatusCode, message: &str, data: Option<T>) -> (StatusCode, Json<Self>) {
        let body = Self {
            status: status.as_u16(),
            message: message.to_string(),
            data,
        };
        (status, Json(body))
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api-ai", get(routes::get_data))
        .route("/api-ai/transcription", post(routes::create_transcription))
        .route("/api-ai/summary", post(routes::create_summary))
        .route(
            "/api-ai/stitching/subtitles",
            get(routes::stitch_subtitles).post(routes::stitch_subtitles),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API until Ctrl-C, then cancel the running jobs and wait for them to finish
pub async fn serve(config: &ServerConfig, workflow: Arc<Workflow>) -> Result<()> {
    let app = build_router(AppState::new(Arc::clone(&workflow)));
    let signal_workflow = Arc::clone(&workflow);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested, cancelling running jobs");
            }
            signal_workflow.shutdown();
        })
        .await?;

    workflow.drain().await;
    info!("All background jobs finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::FanOutEngine;
    use crate::links::LinkMapper;
    use crate::media::MockSubtitleMuxer;
    use crate::models::{JobStatus, MediaFile, SubtitleTrack, Transcript, TranscriptSegment, UserProfile};
    use crate::providers::MockProviderFactory;
    use crate::store::{JobStore, MemoryStore};
    use crate::transcribe::{MockTranscriber, Transcriber};
    use crate::translate::{MockTranslator, Translator};
    use axum::body::Body;
    use axum::http::Request;
    use extractors::USER_HEADER;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        store: Arc<MemoryStore>,
    }

    impl TestApp {
        fn new(providers: MockProviderFactory, muxer: MockSubtitleMuxer) -> Self {
            let store = Arc::new(MemoryStore::new());
            let workflow = Workflow::from_parts(
                store.clone(),
                Arc::new(providers),
                FanOutEngine::new(Some(8)),
                Arc::new(muxer),
                LinkMapper::new("/srv/files/", "https://cdn.example.com/"),
            );
            Self {
                router: build_router(AppState::new(Arc::new(workflow))),
                store,
            }
        }

        fn idle() -> Self {
            Self::new(MockProviderFactory::new(), MockSubtitleMuxer::new())
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
        }
    }

    fn post_json(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header(USER_HEADER, user);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_as(uri: &str, user: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(USER_HEADER, user)
            .body(Body::empty())
            .unwrap()
    }

    async fn seed_media(store: &MemoryStore, id: u64, user_id: u64, dir: &std::path::Path) {
        store.put_media(MediaFile {
            id,
            user_id,
            filename: "clip.mp4".to_string(),
            filepath: dir.join("clip.mp4").to_string_lossy().into_owned(),
        }).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let app = TestApp::idle();
        let (status, body) = app
            .send(post_json("/api-ai/transcription", None, json!({"id": 1, "setting_id": 1, "langs": ["de"]})))
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], 401);
    }

    #[tokio::test]
    async fn test_transcription_request_is_validated() {
        let app = TestApp::idle();

        let (status, body) = app
            .send(post_json("/api-ai/transcription", Some("7"), json!({"id": 0, "setting_id": 1, "langs": ["de"]})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "ID video not specified or invalid");

        let (status, _) = app
            .send(post_json("/api-ai/transcription", Some("7"), json!({"id": 1, "setting_id": 1, "langs": []})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(post_json("/api-ai/transcription", Some("7"), json!("not an object")))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_transcription_runs_in_background() {
        let dir = tempfile::TempDir::new().unwrap();

        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().returning(|_| {
            Ok(Transcript {
                language: "english".to_string(),
                duration: 1.0,
                text: "Hi".to_string(),
                segments: vec![TranscriptSegment { index: 0, start: 0.0, end: 1.0, text: "Hi".to_string() }],
            })
        });
        let mut translator = MockTranslator::new();
        translator.expect_translate().returning(|_, _| Ok("Hallo".to_string()));
        let transcriber: Arc<dyn Transcriber> = Arc::new(transcriber);
        let translator: Arc<dyn Translator> = Arc::new(translator);

        let mut providers = MockProviderFactory::new();
        providers.expect_transcriber().returning(move |_| Ok(Arc::clone(&transcriber)));
        providers.expect_translator().returning(move |_| Ok(Arc::clone(&translator)));

        let app = TestApp::new(providers, MockSubtitleMuxer::new());
        seed_media(&app.store, 1, 7, dir.path()).await;
        app.store.put_profile(UserProfile {
            id: 2,
            name: "default".to_string(),
            user_id: 7,
            ai_token: "sk".to_string(),
            whisper_model: String::new(),
            tts_model: String::new(),
            gpt_model: String::new(),
        }).await.unwrap();

        let (status, body) = app
            .send(post_json("/api-ai/transcription", Some("7"), json!({"id": 1, "setting_id": 2, "langs": ["de"]})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Create transcription in process");

        let mut finished = None;
        for _ in 0..100 {
            if let Some(job) = app.store.job(1).await.unwrap() {
                if job.status.is_terminal() {
                    finished = Some(job);
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let job = finished.expect("job did not finish");
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.subtitles.len(), 2);
    }

    #[tokio::test]
    async fn test_summary_requires_setting_and_language() {
        let app = TestApp::idle();
        let (status, body) = app
            .send(post_json("/api-ai/summary", Some("7"), json!({"id": 1, "setting_id": 0, "langs": ["en"]})))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "SettingID not specified or invalid");
    }

    #[tokio::test]
    async fn test_stitch_failures_are_bad_requests() {
        let app = TestApp::idle();

        let (status, _) = app.send(get_as("/api-ai/stitching/subtitles", "7")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app.send(get_as("/api-ai/stitching/subtitles?id=44", "7")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("Failed to stitch subtitles"));
    }

    #[tokio::test]
    async fn test_stitch_returns_public_url() {
        let mut muxer = MockSubtitleMuxer::new();
        muxer
            .expect_stitch_subtitles()
            .returning(|_, dir, base, _| Ok(dir.join(format!("5_sub_{}", base))));
        let app = TestApp::new(MockProviderFactory::new(), muxer);
        seed_media(&app.store, 3, 7, std::path::Path::new("/srv/files/3")).await;

        let request = Request::builder()
            .method("POST")
            .uri("/api-ai/stitching/subtitles?id=3")
            .header(USER_HEADER, "7")
            .body(Body::empty())
            .unwrap();
        let (status, body) = app.send(request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"], "https://cdn.example.com/3/5_sub_clip.mp4");
    }

    #[tokio::test]
    async fn test_job_data_uses_public_links() {
        let app = TestApp::idle();
        seed_media(&app.store, 4, 7, std::path::Path::new("/srv/files/4")).await;
        seed_media(&app.store, 5, 8, std::path::Path::new("/srv/files/5")).await;
        app.store.save_subtitles(4, &[SubtitleTrack {
            uri: "/srv/files/4/subtitles_original.srt".to_string(),
            lang: "original".to_string(),
        }]).await.unwrap();
        app.store.set_status(4, JobStatus::Done).await.unwrap();
        app.store.set_status(5, JobStatus::Done).await.unwrap();

        let (status, body) = app.send(get_as("/api-ai?id=4", "7")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "done");
        assert_eq!(body["data"]["subtitles"][0]["uri"], "https://cdn.example.com/4/subtitles_original.srt");

        let (status, body) = app.send(get_as("/api-ai", "7")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, _) = app.send(get_as("/api-ai?id=99", "7")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
