//! Run configuration, read once from TOML and passed down by reference.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Story,
    Comments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Hot,
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Hot => "hot",
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reddit: RedditConfig,
    pub settings: Settings,
    pub paths: Paths,
    pub captions: CaptionConfig,
    pub tts: TtsConfig,
    pub transcription: TranscriptionConfig,
    pub screenshots: ScreenshotConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub subreddit: String,
    pub time_window: TimeWindow,
    pub candidate_limit: usize,
    pub allow_nsfw: bool,
    pub topn_comments: usize,
    pub min_comment_length: usize,
    pub max_comment_length: usize,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            subreddit: "AskReddit".to_string(),
            time_window: TimeWindow::Month,
            candidate_limit: 100,
            allow_nsfw: false,
            topn_comments: 12,
            min_comment_length: 20,
            max_comment_length: 400,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storymode: bool,
    /// Silence after every narration segment, seconds.
    pub pause: f64,
    /// Comments mode length target, seconds.
    pub total_video_duration: f64,
    pub resolution_w: u32,
    pub resolution_h: u32,
    pub opacity: f64,
    /// Story bodies shorter than this (in characters) are skipped.
    pub min_story_length: usize,
    pub chunk_max_length: usize,
    pub thumbnail_zoom: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storymode: false,
            pause: 1.0,
            total_video_duration: 58.0,
            resolution_w: 1920,
            resolution_h: 1080,
            opacity: 1.0,
            min_story_length: 4000,
            chunk_max_length: 2000,
            thumbnail_zoom: 3.5,
        }
    }
}

impl Settings {
    pub fn mode(&self) -> Mode {
        if self.storymode {
            Mode::Story
        } else {
            Mode::Comments
        }
    }

    /// Story videos are landscape; comment shorts use the swapped, portrait frame.
    pub fn frame(&self, mode: Mode) -> (u32, u32) {
        match mode {
            Mode::Story => (self.resolution_w, self.resolution_h),
            Mode::Comments => (self.resolution_h, self.resolution_w),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Paths {
    /// A video file, or a directory to pick one from.
    pub background: PathBuf,
    pub title_template: PathBuf,
    pub title_font: PathBuf,
    pub database: PathBuf,
    pub temp_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            background: PathBuf::from("assets/backgrounds"),
            title_template: PathBuf::from("assets/my_title_template.png"),
            title_font: PathBuf::from("assets/fonts/Roboto-Bold.ttf"),
            database: PathBuf::from("assets/database.json"),
            temp_dir: PathBuf::from("assets/temp"),
            results_dir: PathBuf::from("results"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub font: String,
    pub font_size: u32,
    pub color: String,
    pub stroke_color: String,
    pub stroke_width: u32,
    pub title_color: String,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            font: "Ubuntu Mono".to_string(),
            font_size: 18,
            color: "#FFFFFF".to_string(),
            stroke_color: "#FFA500".to_string(),
            stroke_width: 2,
            title_color: "#000000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub binary: String,
    pub models: Vec<PathBuf>,
    pub multiple_voices: bool,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            binary: "piper".to_string(),
            models: vec![PathBuf::from("tts/en_US-hfc_male-medium.onnx")],
            multiple_voices: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionEngine {
    Whisper,
    Estimate,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub engine: TranscriptionEngine,
    pub command: String,
    pub model: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            engine: TranscriptionEngine::Whisper,
            command: "whisper".to_string(),
            model: "medium".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotMethod {
    Card,
    Command,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScreenshotConfig {
    pub method: ScreenshotMethod,
    pub command: Vec<String>,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            method: ScreenshotMethod::Card,
            command: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config = Self::from_toml_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        if let Ok(background) = std::env::var("BACKGROUND") {
            if !background.trim().is_empty() {
                config.paths.background = PathBuf::from(background);
            }
        }
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let s = &self.settings;
        let r = &self.reddit;
        let fail = |msg: String| Err(PipelineError::Config(msg));

        if !(s.pause >= 0.0) {
            return fail(format!("settings.pause must be >= 0, got {}", s.pause));
        }
        if !(0.0..=1.0).contains(&s.opacity) {
            return fail(format!("settings.opacity must be within 0..=1, got {}", s.opacity));
        }
        if s.resolution_w == 0 || s.resolution_h == 0 {
            return fail("settings.resolution_w/h must be positive".to_string());
        }
        if s.mode() == Mode::Comments && !(s.total_video_duration > 0.0) {
            return fail("settings.total_video_duration must be positive".to_string());
        }
        if s.chunk_max_length == 0 {
            return fail("settings.chunk_max_length must be positive".to_string());
        }
        if s.thumbnail_zoom < 1.0 {
            return fail("settings.thumbnail_zoom must be >= 1".to_string());
        }
        if r.subreddit.trim().is_empty() {
            return fail("reddit.subreddit is empty".to_string());
        }
        if r.topn_comments == 0 || r.candidate_limit == 0 {
            return fail(
                "reddit.topn_comments and reddit.candidate_limit must be positive".to_string(),
            );
        }
        if r.min_comment_length > r.max_comment_length {
            return fail(format!(
                "reddit.min_comment_length ({}) exceeds max_comment_length ({})",
                r.min_comment_length, r.max_comment_length
            ));
        }
        if self.tts.models.is_empty() {
            return fail("tts.models needs at least one voice model".to_string());
        }
        if self.screenshots.method == ScreenshotMethod::Command
            && self.screenshots.command.is_empty()
        {
            return fail("screenshots.method = \"command\" needs screenshots.command".to_string());
        }
        Ok(())
    }
}
