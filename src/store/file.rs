use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{FlowError, Result};
use crate::models::{Job, JobStatus, MediaFile, SubtitleTrack, UserProfile};
use super::{JobStore, JobUpdate};

/// JSON documents under `<root>/{media,profiles,jobs}/<id>.json`
pub struct FileStore {
    root: PathBuf,
    // Serializes read-modify-write cycles on job documents
    write_lock: Mutex<()>,
}

impl FileStore {
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for table in ["media", "profiles", "jobs"] {
            fs::create_dir_all(root.join(table)).await
                .map_err(|e| FlowError::Store(format!("Failed to create {}: {}", root.join(table).display(), e)))?;
        }

        info!("Job store opened at {}", root.display());
        Ok(Self { root, write_lock: Mutex::new(()) })
    }

    fn document(&self, table: &str, id: u64) -> PathBuf {
        self.root.join(table).join(format!("{}.json", id))
    }

    async fn load<T: DeserializeOwned>(&self, table: &str, id: u64) -> Result<Option<T>> {
        let path = self.document(table, id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FlowError::Store(format!("Failed to read {}: {}", path.display(), e))),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| FlowError::Store(format!("Corrupt document {}: {}", path.display(), e)))
    }

    /// Write through a temporary file and rename, so readers never see a partial document
    async fn save<T: Serialize>(&self, table: &str, id: u64, value: &T) -> Result<()> {
        let path = self.document(table, id);
        let tmp = self.root.join(table).join(format!(".{}.{}.tmp", id, uuid::Uuid::new_v4()));

        let json = serde_json::to_string_pretty(value)?;
        fs::write(&tmp, json).await
            .map_err(|e| FlowError::Store(format!("Failed to write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path).await
            .map_err(|e| FlowError::Store(format!("Failed to replace {}: {}", path.display(), e)))?;

        debug!("Saved {}", path.display());
        Ok(())
    }

    async fn update(&self, video_id: u64, update: JobUpdate) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let existing = self.load::<Job>("jobs", video_id).await?;
        self.save("jobs", video_id, &update.apply(existing, video_id)).await
    }

    async fn all_media(&self) -> Result<Vec<MediaFile>> {
        let dir = self.root.join("media");
        let mut entries = fs::read_dir(&dir).await
            .map_err(|e| FlowError::Store(format!("Failed to list {}: {}", dir.display(), e)))?;

        let mut media = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let content = fs::read_to_string(&path).await?;
                let file: MediaFile = serde_json::from_str(&content)
                    .map_err(|e| FlowError::Store(format!("Corrupt document {}: {}", path.display(), e)))?;
                media.push(file);
            }
        }
        Ok(media)
    }
}

#[async_trait]
impl JobStore for FileStore {
    async fn media(&self, video_id: u64) -> Result<Option<MediaFile>> {
        self.load("media", video_id).await
    }

    async fn user_profile(&self, user_id: u64, setting_id: u64) -> Result<Option<UserProfile>> {
        let profile: Option<UserProfile> = self.load("profiles", setting_id).await?;
        Ok(profile.filter(|p| p.user_id == user_id))
    }

    async fn job(&self, video_id: u64) -> Result<Option<Job>> {
        self.load("jobs", video_id).await
    }

    async fn jobs_for_user(&self, user_id: u64) -> Result<Vec<Job>> {
        let mut jobs = Vec::new();
        for media in self.all_media().await? {
            if media.user_id != user_id {
                continue;
            }
            if let Some(job) = self.load::<Job>("jobs", media.id).await? {
                jobs.push(job);
            }
        }
        jobs.sort_by_key(|j| j.video_id);
        Ok(jobs)
    }

    async fn set_status(&self, video_id: u64, status: JobStatus) -> Result<()> {
        self.update(video_id, JobUpdate::Status(status)).await
    }

    async fn save_subtitles(&self, video_id: u64, tracks: &[SubtitleTrack]) -> Result<()> {
        self.update(video_id, JobUpdate::Subtitles(tracks.to_vec())).await
    }

    async fn save_subtitled_video(&self, video_id: u64, uri: &str) -> Result<()> {
        self.update(video_id, JobUpdate::SubtitledVideo(uri.to_string())).await
    }

    async fn save_summary(&self, video_id: u64, summary: &str) -> Result<()> {
        self.update(video_id, JobUpdate::Summary(summary.to_string())).await
    }

    async fn put_media(&self, media: MediaFile) -> Result<()> {
        self.save("media", media.id, &media).await
    }

    async fn put_profile(&self, profile: UserProfile) -> Result<()> {
        self.save("profiles", profile.id, &profile).await
    }
}
