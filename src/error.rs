use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The collaborator or pipeline step an external failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ThreadFetch,
    CommentFetch,
    Screenshot,
    SpeechSynthesis,
    Transcription,
    TitleCard,
    AudioPadding,
    Narration,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ThreadFetch => "thread fetch",
            Stage::CommentFetch => "comment fetch",
            Stage::Screenshot => "screenshot capture",
            Stage::SpeechSynthesis => "speech synthesis",
            Stage::Transcription => "transcription",
            Stage::TitleCard => "title card rendering",
            Stage::AudioPadding => "audio padding",
            Stage::Narration => "narration assembly",
            Stage::Render => "video render",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no unseen thread in r/{subreddit} matched the selection strategy")]
    NoThread { subreddit: String },

    #[error("thread {thread_id} has no qualifying comments")]
    NoComments { thread_id: String },

    #[error("no comment fits in the {target:.1}s target after the {used:.2}s title")]
    NoContent { target: f64, used: f64 },

    // anyhow::Error is not std::error::Error, so the chain is rendered into the message
    #[error("{stage} failed: {cause:#}")]
    Service { stage: Stage, cause: anyhow::Error },

    #[error("could not read audio duration of {}", path.display())]
    Duration {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error(
        "background {} is {available:.2}s long but the video needs {required:.2}s",
        path.display()
    )]
    BackgroundTooShort {
        path: PathBuf,
        available: f64,
        required: f64,
    },

    #[error("composition failed: {0}")]
    Composition(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    /// Selection failures end the run cleanly without recording the thread.
    pub fn is_selection_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::NoThread { .. }
                | PipelineError::NoComments { .. }
                | PipelineError::NoContent { .. }
        )
    }
}

impl PipelineError {
    /// The thread itself has nothing usable, so retrying it can never succeed.
    pub fn is_content_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::NoComments { .. } | PipelineError::NoContent { .. }
        )
    }
}

pub trait StageExt<T> {
    fn stage(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T> StageExt<T> for anyhow::Result<T> {
    fn stage(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|cause| PipelineError::Service { stage, cause })
    }
}
