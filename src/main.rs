//! Vocalflow - video transcription, subtitle translation and muxing service
//!
//! Entry point: parses the command line, sets up logging and configuration,
//! then runs the HTTP API or a single job flow.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use vocalflow::api;
use vocalflow::cli::{Args, Commands, split_langs};
use vocalflow::config::Config;
use vocalflow::models::{JobRequest, normalize_languages};
use vocalflow::store::open_store;
use vocalflow::workflow::{FlowOutcome, Workflow};

const DEFAULT_CONFIG: &str = "vocalflow.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    if let Commands::InitConfig { output } = &args.command {
        Config::default().save_to_file(output)?;
        println!("Default configuration written to {}", output.display());
        return Ok(());
    }

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG);
                Config::from_file(DEFAULT_CONFIG)?
            } else {
                Config::default()
            }
        }
    };

    let store = open_store(&config.storage).await?;
    let workflow = Arc::new(Workflow::new(&config, store));

    match args.command {
        Commands::Serve => {
            if let Err(e) = workflow.check_media_tool().await {
                warn!("Subtitle stitching will fail until the media tool is available: {}", e);
            }
            info!("Starting Vocalflow API on {}:{}", config.server.host, config.server.port);
            api::serve(&config.server, workflow).await?;
        }

        Commands::Transcribe { id, user, setting, langs } => {
            let request = JobRequest { id, setting_id: setting, langs: split_langs(&langs) };
            let langs = request.validate_transcription()?;

            let outcome = workflow.run_transcription(id, user, setting, &langs).await?;
            print_outcome(id, outcome);
        }

        Commands::Summarize { id, user, setting, lang } => {
            let lang = normalize_languages(&[lang])?.remove(0);

            let outcome = workflow.run_summary(id, user, setting, &lang).await?;
            print_outcome(id, outcome);
        }

        Commands::Stitch { id } => {
            let url = workflow.stitch_subtitles(id).await?;
            println!("{}", url);
        }

        Commands::Status { id, user } => {
            let json = match (id, user) {
                (Some(id), _) => match workflow.job(id).await? {
                    Some(job) => serde_json::to_string_pretty(&job)?,
                    None => anyhow::bail!("No job for video {}", id),
                },
                (None, Some(user)) => serde_json::to_string_pretty(&workflow.jobs_for_user(user).await?)?,
                (None, None) => anyhow::bail!("Pass --id or --user"),
            };
            println!("{}", json);
        }

        // Written before the configuration is loaded
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}

fn print_outcome(video_id: u64, outcome: FlowOutcome) {
    match outcome {
        FlowOutcome::Skipped => println!("Video {}: nothing to do, no record changed", video_id),
        FlowOutcome::Finished(status) => println!("Video {}: {}", video_id, status.as_str()),
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".vocalflow").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "vocalflow.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("vocalflow.log").display());

    Ok(())
}
