use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::MediaConfig;
use crate::error::Result;
use crate::models::SubtitleTrack;
use super::{MediaCommandBuilder, SubtitleMuxer};

/// FFmpeg-backed subtitle muxer
pub struct FfmpegMuxer {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegMuxer {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }

    /// `<output_dir>/<timestamp>_sub_<base_name>`
    pub fn output_path(output_dir: &Path, base_name: &str, timestamp: i64) -> PathBuf {
        output_dir.join(format!("{}_sub_{}", timestamp, base_name))
    }
}

#[async_trait]
impl SubtitleMuxer for FfmpegMuxer {
    async fn stitch_subtitles(
        &self,
        video_path: &Path,
        output_dir: &Path,
        base_name: &str,
        tracks: &[SubtitleTrack],
    ) -> Result<PathBuf> {
        let output_path = Self::output_path(output_dir, base_name, Utc::now().timestamp());

        info!(
            tracks = tracks.len(),
            "Muxing subtitles into {} -> {}",
            video_path.display(),
            output_path.display()
        );

        let command = self.command_builder.stitch_subtitles(
            video_path,
            tracks,
            &output_path,
            &self.config.subtitle_codec,
        );
        command.execute().await?;

        info!("Subtitle muxing completed successfully");
        Ok(output_path)
    }

    async fn check_availability(&self) -> Result<()> {
        self.command_builder.version_check().execute().await?;
        info!("Media processor is available");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlowError;

    #[test]
    fn test_output_name_is_timestamped() {
        let path = FfmpegMuxer::output_path(Path::new("/srv/files/7"), "movie.mp4", 1_700_000_000);
        assert_eq!(path, PathBuf::from("/srv/files/7/1700000000_sub_movie.mp4"));
    }

    #[tokio::test]
    async fn test_failed_tool_fails_the_stitch() {
        let muxer = FfmpegMuxer::new(MediaConfig {
            binary_path: "/nonexistent/ffmpeg".to_string(),
            subtitle_codec: "mov_text".to_string(),
        });

        let outcome = muxer
            .stitch_subtitles(Path::new("/tmp/in.mp4"), Path::new("/tmp"), "in.mp4", &[])
            .await;
        assert!(matches!(outcome, Err(FlowError::Media(_))));
        assert!(muxer.check_availability().await.is_err());
    }
}
