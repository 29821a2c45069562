use crate::config::StorageConfig;
use crate::models::Job;

/// Maps stored filesystem paths to public URLs and back by prefix substitution
#[derive(Debug, Clone)]
pub struct LinkMapper {
    static_root: String,
    public_host: String,
}

impl LinkMapper {
    pub fn new<S1: Into<String>, S2: Into<String>>(static_root: S1, public_host: S2) -> Self {
        Self {
            static_root: static_root.into(),
            public_host: public_host.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.static_root, &config.public_host)
    }

    pub fn to_public(&self, local: &str) -> String {
        local.replace(&self.static_root, &self.public_host)
    }

    pub fn to_local(&self, public: &str) -> String {
        public.replace(&self.public_host, &self.static_root)
    }

    /// Copy of `job` with every stored path rewritten as a public URL
    pub fn publish(&self, job: &Job) -> Job {
        let mut published = job.clone();
        for track in &mut published.subtitles {
            track.uri = self.to_public(&track.uri);
        }
        published.subtitles_video_url = job.subtitles_video_url.as_deref().map(|u| self.to_public(u));
        published.translate_video_url = job.translate_video_url.as_deref().map(|u| self.to_public(u));
        published
    }
}
