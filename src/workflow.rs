use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{FlowError, Result};
use crate::fanout::FanOutEngine;
use crate::links::LinkMapper;
use crate::media::{MediaProcessorFactory, SubtitleMuxer};
use crate::models::{Job, JobStatus, MediaFile, ORIGINAL_LANG, UserProfile};
use crate::providers::{OpenAiProviders, ProviderFactory};
use crate::store::JobStore;
use crate::subtitle::{SrtDirectory, read_srt_text};

/// How an asynchronous flow ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Nothing to work on (no source media or no job), nothing was changed
    Skipped,
    /// Terminal status that was written for the job
    Finished(JobStatus),
}

/// Runs the transcription, summary and stitching flows of a job
pub struct Workflow {
    store: Arc<dyn JobStore>,
    providers: Arc<dyn ProviderFactory>,
    fanout: FanOutEngine,
    muxer: Arc<dyn SubtitleMuxer>,
    links: LinkMapper,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl Workflow {
    pub fn new(config: &Config, store: Arc<dyn JobStore>) -> Self {
        Self::from_parts(
            store,
            Arc::new(OpenAiProviders::new(config.provider.clone())),
            FanOutEngine::new(config.fanout.limit()),
            MediaProcessorFactory::create_muxer(config.media.clone()),
            LinkMapper::from_config(&config.storage),
        )
    }

    pub fn from_parts(
        store: Arc<dyn JobStore>,
        providers: Arc<dyn ProviderFactory>,
        fanout: FanOutEngine,
        muxer: Arc<dyn SubtitleMuxer>,
        links: LinkMapper,
    ) -> Self {
        Self {
            store,
            providers,
            fanout,
            muxer,
            links,
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Stop every running flow; in-flight provider calls report `Cancelled`
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait until every background flow has written its terminal status
    pub async fn drain(&self) {
        self.tasks.close();
        info!(running = self.tasks.len(), "Waiting for background jobs");
        self.tasks.wait().await;
    }

    /// Check that the muxing tool can be started
    pub async fn check_media_tool(&self) -> Result<()> {
        self.muxer.check_availability().await
    }

    /// Start the transcription flow in the background
    pub fn spawn_transcription(
        self: &Arc<Self>,
        video_id: u64,
        user_id: u64,
        setting_id: u64,
        langs: Vec<String>,
    ) -> JoinHandle<Result<FlowOutcome>> {
        let workflow = Arc::clone(self);
        self.tasks.spawn(async move {
            workflow.run_transcription(video_id, user_id, setting_id, &langs).await
        })
    }

    /// Start the summary flow in the background
    pub fn spawn_summary(
        self: &Arc<Self>,
        video_id: u64,
        user_id: u64,
        setting_id: u64,
        lang: String,
    ) -> JoinHandle<Result<FlowOutcome>> {
        let workflow = Arc::clone(self);
        self.tasks.spawn(async move {
            workflow.run_summary(video_id, user_id, setting_id, &lang).await
        })
    }

    /// Transcribe the video, translate it into `langs` and record the subtitle tracks.
    ///
    /// Stage failures end in status `Error`; they are only returned as `Err`
    /// when the terminal status itself cannot be written.
    pub async fn run_transcription(
        &self,
        video_id: u64,
        user_id: u64,
        setting_id: u64,
        langs: &[String],
    ) -> Result<FlowOutcome> {
        let media = match self.store.media(video_id).await {
            Ok(Some(media)) => media,
            Ok(None) => {
                warn!(video_id, "No source media for video, transcription skipped");
                return Ok(FlowOutcome::Skipped);
            }
            Err(e) => {
                error!(video_id, "Failed to look up source media: {}", e);
                return Err(e);
            }
        };

        info!(video_id, languages = ?langs, "Transcription started");
        let result = self.transcription_stages(&media, user_id, setting_id, langs).await;
        self.finish(video_id, "transcription", result).await
    }

    async fn transcription_stages(
        &self,
        media: &MediaFile,
        user_id: u64,
        setting_id: u64,
        langs: &[String],
    ) -> Result<()> {
        self.store.set_status(media.id, JobStatus::Processing).await?;

        let profile = self.profile(user_id, setting_id).await?;
        let transcriber = self.providers.transcriber(&profile)?;
        let translator = self.providers.translator(&profile)?;

        let media_path = Path::new(&media.filepath);
        let transcript = tokio::select! {
            _ = self.cancel.cancelled() => return Err(FlowError::Cancelled),
            transcript = transcriber.transcribe(media_path) => transcript?,
        };
        info!(
            video_id = media.id,
            segments = transcript.segments.len(),
            language = %transcript.language,
            "Transcript received"
        );

        let sink = Arc::new(SrtDirectory::new(media_dir(media_path)?));
        let tracks = self
            .fanout
            .run(translator, sink, &transcript.segments, langs, &self.cancel)
            .await?;

        self.store.save_subtitles(media.id, &tracks).await
    }

    /// Summarize the original subtitle track of the video in `lang`
    pub async fn run_summary(
        &self,
        video_id: u64,
        user_id: u64,
        setting_id: u64,
        lang: &str,
    ) -> Result<FlowOutcome> {
        let job = match self.store.job(video_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(video_id, "No job for video, summary skipped");
                return Ok(FlowOutcome::Skipped);
            }
            Err(e) => {
                error!(video_id, "Failed to look up job: {}", e);
                return Err(e);
            }
        };

        info!(video_id, lang, "Summary started");
        let result = self.summary_stages(&job, user_id, setting_id, lang).await;
        self.finish(video_id, "summary", result).await
    }

    async fn summary_stages(
        &self,
        job: &Job,
        user_id: u64,
        setting_id: u64,
        lang: &str,
    ) -> Result<()> {
        let video_id = job.video_id;
        self.store.set_status(video_id, JobStatus::Processing).await?;

        let profile = self.profile(user_id, setting_id).await?;
        let original = job.track(ORIGINAL_LANG).ok_or_else(|| {
            FlowError::NotFound(format!("video {} has no original subtitles", video_id))
        })?;

        let text = read_srt_text(self.links.to_local(&original.uri)).await?;
        let translator = self.providers.translator(&profile)?;
        let summary = tokio::select! {
            _ = self.cancel.cancelled() => return Err(FlowError::Cancelled),
            summary = translator.summarize(&text, lang) => summary?,
        };

        self.store.save_summary(video_id, &summary).await
    }

    /// Mux every recorded subtitle track into the video and return the public URL of the result
    pub async fn stitch_subtitles(&self, video_id: u64) -> Result<String> {
        let media = self
            .store
            .media(video_id)
            .await?
            .ok_or_else(|| FlowError::NotFound(format!("no source media for video {}", video_id)))?;
        let tracks = self
            .store
            .job(video_id)
            .await?
            .map(|job| job.subtitles)
            .unwrap_or_default();

        let media_path = Path::new(&media.filepath);
        let output_dir = media_dir(media_path)?;
        let output = self
            .muxer
            .stitch_subtitles(media_path, &output_dir, &media.filename, &tracks)
            .await?;

        let stored = output.to_string_lossy().into_owned();
        self.store.save_subtitled_video(video_id, &stored).await?;

        info!(video_id, tracks = tracks.len(), "Subtitled video saved to {}", stored);
        Ok(self.links.to_public(&stored))
    }

    /// Persisted job with public links
    pub async fn job(&self, video_id: u64) -> Result<Option<Job>> {
        Ok(self.store.job(video_id).await?.map(|job| self.links.publish(&job)))
    }

    /// Every job of the user's videos, with public links
    pub async fn jobs_for_user(&self, user_id: u64) -> Result<Vec<Job>> {
        Ok(self
            .store
            .jobs_for_user(user_id)
            .await?
            .iter()
            .map(|job| self.links.publish(job))
            .collect())
    }

    async fn profile(&self, user_id: u64, setting_id: u64) -> Result<UserProfile> {
        self.store
            .user_profile(user_id, setting_id)
            .await?
            .ok_or_else(|| {
                FlowError::NotFound(format!("setting {} not found for user {}", setting_id, user_id))
            })
    }

    /// Single terminal status write for a flow result
    async fn finish(&self, video_id: u64, flow: &str, result: Result<()>) -> Result<FlowOutcome> {
        let status = match result {
            Ok(()) => {
                info!(video_id, flow, "Job completed");
                JobStatus::Done
            }
            Err(e) => {
                error!(video_id, flow, "Job failed: {}", e);
                JobStatus::Error
            }
        };

        if let Err(e) = self.store.set_status(video_id, status).await {
            error!(video_id, flow, "Failed to record status {}: {}", status.as_str(), e);
            return Err(e);
        }
        Ok(FlowOutcome::Finished(status))
    }
}

/// Directory holding the source media, where derived files are written
fn media_dir(media_path: &Path) -> Result<PathBuf> {
    media_path
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| FlowError::Config(format!("Cannot determine directory of {}", media_path.display())))
}
