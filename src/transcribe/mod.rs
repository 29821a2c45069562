// Speech-to-text boundary
//
// The pipeline only depends on the `Transcriber` trait; provider specific
// request shaping and response mapping live in submodules.

pub mod openai;

use async_trait::async_trait;
use std::path::Path;

pub use openai::OpenAiTranscriber;

use crate::error::Result;
use crate::models::Transcript;

/// Turns a stored media file into ordered, timed segments
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Upload the media file and return its transcript
    async fn transcribe(&self, media_path: &Path) -> Result<Transcript>;
}
