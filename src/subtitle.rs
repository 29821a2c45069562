use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{FlowError, Result};
use crate::models::TimedText;

/// Sequence number line followed by its time range line
static CUE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+\r?\n\d{2,}:\d{2}:\d{2},\d{3} --> \d{2,}:\d{2}:\d{2},\d{3}\r?\n")
        .expect("cue header pattern is valid")
});

/// Destination for per-language subtitle files
#[async_trait]
pub trait SubtitleSink: Send + Sync {
    /// Persist `entries` for `lang` and return the stored URI
    async fn write(&self, lang: &str, entries: &[TimedText]) -> Result<String>;
}

/// Writes `subtitles_<lang>.srt` files into one directory
#[derive(Debug, Clone)]
pub struct SrtDirectory {
    dir: PathBuf,
}

impl SrtDirectory {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SubtitleSink for SrtDirectory {
    async fn write(&self, lang: &str, entries: &[TimedText]) -> Result<String> {
        let path = write_srt(lang, entries, &self.dir).await?;
        Ok(path.to_string_lossy().into_owned())
    }
}

/// Path of the subtitle file for `lang` inside `output_dir`
pub fn srt_path<P: AsRef<Path>>(output_dir: P, lang: &str) -> PathBuf {
    output_dir.as_ref().join(format!("subtitles_{}.srt", lang))
}

/// Render entries as SRT text
pub fn encode_srt(entries: &[TimedText]) -> String {
    let mut srt_content = String::new();

    for (index, entry) in entries.iter().enumerate() {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_time(entry.start),
            format_srt_time(entry.end),
            entry.text
        ));
    }

    srt_content
}

/// Generate the SRT file for one language, creating `output_dir` when missing
pub async fn write_srt<P: AsRef<Path>>(
    lang: &str,
    entries: &[TimedText],
    output_dir: P,
) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir).await?;

    let output_path = srt_path(output_dir, lang);
    debug!("Generating SRT file: {}", output_path.display());

    fs::write(&output_path, encode_srt(entries)).await?;

    info!(lang, "SRT saved: {}", output_path.display());
    Ok(output_path)
}

/// Flatten SRT text to its cue text joined by single spaces.
///
/// Numbering and timing are dropped, so the result cannot be turned back into cues.
pub fn decode_srt(content: &str) -> String {
    let stripped = CUE_HEADER.replace_all(content, "");

    stripped
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read an SRT file and flatten it with [`decode_srt`]
pub async fn read_srt_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).await.map_err(|e| {
        FlowError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read {}: {}", path.display(), e),
        ))
    })?;
    Ok(decode_srt(&content))
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm), hours are not wrapped
pub fn format_srt_time(seconds: f64) -> String {
    let total_milliseconds = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}
