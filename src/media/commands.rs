use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{FlowError, Result};
use crate::models::SubtitleTrack;

/// Media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Select a stream for the output
    pub fn map<S: Into<String>>(self, stream: S) -> Self {
        self.arg("-map").arg(stream)
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Set subtitle codec
    pub fn subtitle_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:s").arg(codec)
    }

    /// Copy video stream
    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    /// Copy audio stream
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Tag the `index`-th output subtitle stream with a language
    pub fn subtitle_language(self, index: usize, lang: &str) -> Self {
        self.arg(format!("-metadata:s:s:{}", index))
            .arg(format!("language={}", lang))
    }

    /// Execute the command, failing with its combined output on a non-zero exit
    pub async fn execute(&self) -> Result<String> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| FlowError::Media(format!("Failed to execute media processor: {}", e)))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(FlowError::Media(format!(
                "{} failed ({}): {}",
                self.description,
                output.status,
                combined
            )));
        }

        Ok(combined)
    }
}

/// Builder for the media operations the service runs
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build the subtitle muxing command.
    ///
    /// Input 0 is the video, inputs 1..=n the tracks in order. Video and audio
    /// are stream-copied; each subtitle stream gets `subtitle_codec` and its
    /// track's language.
    pub fn stitch_subtitles<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        video_path: P,
        tracks: &[SubtitleTrack],
        output_path: Q,
        subtitle_codec: &str,
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, "Subtitle muxing")
            .overwrite()
            .input(video_path);

        for track in tracks {
            cmd = cmd.input(&track.uri);
        }

        cmd = cmd.map("0:v").map("0:a");
        for index in 0..tracks.len() {
            cmd = cmd.map((index + 1).to_string());
        }

        for (index, track) in tracks.iter().enumerate() {
            cmd = cmd
                .subtitle_codec(subtitle_codec)
                .subtitle_language(index, &track.lang);
        }

        cmd.copy_video().copy_audio().output(output_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(uri: &str, lang: &str) -> SubtitleTrack {
        SubtitleTrack { uri: uri.to_string(), lang: lang.to_string() }
    }

    #[test]
    fn test_zero_tracks_only_copies_video_and_audio() {
        let cmd = MediaCommandBuilder::new("ffmpeg")
            .stitch_subtitles("/media/in.mp4", &[], "/media/out.mp4", "mov_text");

        assert_eq!(
            cmd.args,
            vec![
                "-y", "-i", "/media/in.mp4",
                "-map", "0:v", "-map", "0:a",
                "-c:v", "copy", "-c:a", "copy",
                "/media/out.mp4",
            ]
        );
        assert!(!cmd.args.iter().any(|a| a == "-c:s"));
    }

    #[test]
    fn test_tracks_are_appended_in_order_with_language_tags() {
        let tracks = [
            track("/media/subtitles_original.srt", "original"),
            track("/media/subtitles_de.srt", "de"),
        ];
        let cmd = MediaCommandBuilder::new("ffmpeg")
            .stitch_subtitles("/media/in.mp4", &tracks, "/media/out.mp4", "mov_text");

        assert_eq!(
            cmd.args,
            vec![
                "-y",
                "-i", "/media/in.mp4",
                "-i", "/media/subtitles_original.srt",
                "-i", "/media/subtitles_de.srt",
                "-map", "0:v", "-map", "0:a", "-map", "1", "-map", "2",
                "-c:s", "mov_text", "-metadata:s:s:0", "language=original",
                "-c:s", "mov_text", "-metadata:s:s:1", "language=de",
                "-c:v", "copy", "-c:a", "copy",
                "/media/out.mp4",
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_surfaces_combined_output() {
        let cmd = MediaCommand::new("sh", "Failing tool")
            .arg("-c")
            .arg("echo to-stdout; echo to-stderr 1>&2; exit 3");

        let err = cmd.execute().await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("to-stdout"));
        assert!(message.contains("to-stderr"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_media_error() {
        let cmd = MediaCommand::new("/nonexistent/ffmpeg", "Missing tool").arg("-version");
        assert!(matches!(cmd.execute().await, Err(FlowError::Media(_))));
    }
}
