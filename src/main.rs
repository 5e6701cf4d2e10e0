mod args;
mod audio;
mod compose;
mod config;
mod error;
mod media;
mod pipeline;
mod reddit;
mod sanitize;
mod screenshot;
mod store;
mod subtitle;
mod timeline;
mod title;
mod transcribe;
mod tts;
mod utils;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::args::Args;
use crate::config::{Config, TranscriptionEngine};
use crate::error::PipelineError;
use crate::pipeline::{Pipeline, RunOutcome};

/// Fails early when an external tool the run depends on is not on PATH.
fn check_tools(config: &Config) -> anyhow::Result<()> {
    let mut tools = vec!["ffmpeg", "ffprobe", config.tts.binary.as_str()];
    if config.transcription.engine == TranscriptionEngine::Whisper {
        tools.push(config.transcription.command.as_str());
    }
    for tool in tools {
        let path = which::which(tool).map_err(|_| {
            PipelineError::Config(format!("required tool `{tool}` was not found on PATH"))
        })?;
        info!("Using {} at {}", tool, path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::load(&args.config)?;
    args.apply(&mut config);
    config.validate()?;
    check_tools(&config)?;

    info!("Starting reddit video generation pipeline");
    let mut pipeline = Pipeline::from_config(&config, args.keep_temp)?;
    match pipeline.run().await {
        Ok(RunOutcome::Rendered {
            video,
            thumbnail,
            seconds,
        }) => {
            info!("Done: {} ({}s)", video.display(), seconds);
            if let Some(thumbnail) = thumbnail {
                info!("Thumbnail: {}", thumbnail.display());
            }
            Ok(())
        }
        Ok(RunOutcome::Skipped {
            thread_id,
            body_chars,
        }) => {
            info!(
                "Skipped thread {} ({} chars of story); run again for the next one",
                thread_id, body_chars
            );
            Ok(())
        }
        Err(e) => {
            if let Some(selection) = e.downcast_ref::<PipelineError>() {
                if selection.is_selection_failure() {
                    warn!("{}", selection);
                    return Ok(());
                }
            }
            error!("{e:#}");
            Err(e)
        }
    }
}
