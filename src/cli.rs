use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve,

    /// Transcribe a video and translate its subtitles
    Transcribe {
        /// Video id
        #[arg(long)]
        id: u64,

        /// Owner of the provider setting
        #[arg(long)]
        user: u64,

        /// Provider setting id
        #[arg(long)]
        setting: u64,

        /// Target languages (comma-separated)
        #[arg(short, long)]
        langs: String,
    },

    /// Summarize the original subtitles of a video
    Summarize {
        /// Video id
        #[arg(long)]
        id: u64,

        /// Owner of the provider setting
        #[arg(long)]
        user: u64,

        /// Provider setting id
        #[arg(long)]
        setting: u64,

        /// Summary language
        #[arg(short, long)]
        lang: String,
    },

    /// Mux the recorded subtitle tracks into the video
    Stitch {
        /// Video id
        #[arg(long)]
        id: u64,
    },

    /// Print persisted job data as JSON
    Status {
        /// Video id
        #[arg(long)]
        id: Option<u64>,

        /// List every job of this user instead
        #[arg(long)]
        user: Option<u64>,
    },

    /// Write a configuration file with default values
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "vocalflow.toml")]
        output: PathBuf,
    },
}

/// Split a comma-separated language list
pub fn split_langs(langs: &str) -> Vec<String> {
    langs
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
