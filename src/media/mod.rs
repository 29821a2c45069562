// Media processing
//
// - Commands: ffmpeg argument builders and the process runner
// - Processor: the muxer used by the stitching flow

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;
use crate::models::SubtitleTrack;

/// Combines a video with subtitle tracks into one container
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubtitleMuxer: Send + Sync {
    /// Mux `tracks` into `video_path`, writing the result into `output_dir`.
    ///
    /// The output name is `<unix timestamp>_sub_<base_name>`.
    async fn stitch_subtitles(
        &self,
        video_path: &Path,
        output_dir: &Path,
        base_name: &str,
        tracks: &[SubtitleTrack],
    ) -> Result<PathBuf>;

    /// Check if the muxing tool is available
    async fn check_availability(&self) -> Result<()>;
}

/// Factory for creating muxer instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default muxer implementation (FFmpeg-based)
    pub fn create_muxer(config: MediaConfig) -> Arc<dyn SubtitleMuxer> {
        Arc::new(processor::FfmpegMuxer::new(config))
    }
}
