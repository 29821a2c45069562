// Job persistence
//
// The orchestrator and the HTTP layer receive an explicitly constructed
// `Arc<dyn JobStore>`. Lookups distinguish "no such record" (`Ok(None)`)
// from a failing store (`Err`).

pub mod file;
pub mod memory;

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::config::{StorageConfig, StoreBackend};
use crate::error::Result;
use crate::models::{Job, JobStatus, MediaFile, SubtitleTrack, UserProfile};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Source media of a video
    async fn media(&self, video_id: u64) -> Result<Option<MediaFile>>;

    /// Provider profile `setting_id`, only if it belongs to `user_id`
    async fn user_profile(&self, user_id: u64, setting_id: u64) -> Result<Option<UserProfile>>;

    async fn job(&self, video_id: u64) -> Result<Option<Job>>;

    /// Jobs of every video owned by `user_id`
    async fn jobs_for_user(&self, user_id: u64) -> Result<Vec<Job>>;

    /// Create the job if needed and set its status
    async fn set_status(&self, video_id: u64, status: JobStatus) -> Result<()>;

    /// Replace the whole subtitle track list in one update
    async fn save_subtitles(&self, video_id: u64, tracks: &[SubtitleTrack]) -> Result<()>;

    async fn save_subtitled_video(&self, video_id: u64, uri: &str) -> Result<()>;

    async fn save_summary(&self, video_id: u64, summary: &str) -> Result<()>;

    async fn put_media(&self, media: MediaFile) -> Result<()>;

    async fn put_profile(&self, profile: UserProfile) -> Result<()>;
}

/// A single mutation of a job record
#[derive(Debug, Clone)]
pub(crate) enum JobUpdate {
    Status(JobStatus),
    Subtitles(Vec<SubtitleTrack>),
    SubtitledVideo(String),
    Summary(String),
}

impl JobUpdate {
    /// Apply to the existing record, creating it when absent
    pub(crate) fn apply(self, existing: Option<Job>, video_id: u64) -> Job {
        let mut job = existing.unwrap_or_else(|| Job::new(video_id));
        match self {
            Self::Status(status) => job.status = status,
            Self::Subtitles(tracks) => job.subtitles = tracks,
            Self::SubtitledVideo(uri) => job.subtitles_video_url = Some(uri),
            Self::Summary(summary) => job.summary = Some(summary),
        }
        job.updated_at = Utc::now();
        job
    }
}

/// Open the store selected in the configuration
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn JobStore>> {
    match config.backend {
        StoreBackend::File => Ok(Arc::new(FileStore::open(&config.data_dir).await?)),
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
