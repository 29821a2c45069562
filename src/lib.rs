//! Vocalflow - video transcription and subtitle service
//!
//! Transcribes a video, translates every transcript segment into the requested
//! languages concurrently, writes one SRT file per language, records job status,
//! summarizes transcripts and muxes subtitle tracks into videos with ffmpeg.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod fanout;
pub mod links;
pub mod media;
pub mod models;
pub mod providers;
pub mod store;
pub mod subtitle;
pub mod transcribe;
pub mod translate;
pub mod workflow;
