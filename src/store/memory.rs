use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{Job, JobStatus, MediaFile, SubtitleTrack, UserProfile};
use super::{JobStore, JobUpdate};

#[derive(Default)]
struct Tables {
    media: HashMap<u64, MediaFile>,
    profiles: HashMap<u64, UserProfile>,
    jobs: HashMap<u64, Job>,
}

/// In-process store, used for tests and throwaway runs
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update(&self, video_id: u64, update: JobUpdate) -> Result<()> {
        let mut tables = self.tables.write().await;
        let existing = tables.jobs.remove(&video_id);
        tables.jobs.insert(video_id, update.apply(existing, video_id));
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn media(&self, video_id: u64) -> Result<Option<MediaFile>> {
        Ok(self.tables.read().await.media.get(&video_id).cloned())
    }

    async fn user_profile(&self, user_id: u64, setting_id: u64) -> Result<Option<UserProfile>> {
        Ok(self.tables.read().await.profiles
            .get(&setting_id)
            .filter(|p| p.user_id == user_id)
            .cloned())
    }

    async fn job(&self, video_id: u64) -> Result<Option<Job>> {
        Ok(self.tables.read().await.jobs.get(&video_id).cloned())
    }

    async fn jobs_for_user(&self, user_id: u64) -> Result<Vec<Job>> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<Job> = tables.media
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| tables.jobs.get(&m.id).cloned())
            .collect();
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
        self.tables.write().await.media.insert(media.id, media);
        Ok(())
    }

    async fn put_profile(&self, profile: UserProfile) -> Result<()> {
        self.tables.write().await.profiles.insert(profile.id, profile);
        Ok(())
    }
}
