//! Sequences one run: thread selection, narration, composition, bookkeeping.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::audio::AudioSegment;
use crate::compose::{Composer, Composition, Frame, VisualClip, VisualTrack, sequence_clips};
use crate::config::{Config, Mode, ScreenshotMethod, TranscriptionEngine};
use crate::error::{PipelineError, Stage, StageExt};
use crate::media::concat_wavs;
use crate::reddit::{CommentQuery, RedditClient, SelectionStrategy, Thread, ThreadSource};
use crate::sanitize::sanitize_text;
use crate::screenshot::{CardScreenshots, CommandScreenshots, ScreenshotService};
use crate::store::SeenStore;
use crate::subtitle::{align_captions, write_srt};
use crate::timeline::{Budget, whole_seconds};
use crate::title::{TitleCard, create_thumbnail};
use crate::transcribe::{EstimatedTranscriber, Transcriber, WhisperTranscriber};
use crate::tts::{PiperTts, SpeechSynthesizer};
use crate::utils::{chunk_text, file_safe_title};

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Rendered {
        video: PathBuf,
        thumbnail: Option<PathBuf>,
        seconds: u64,
    },
    /// Story body too short to narrate. The thread is still marked as seen.
    Skipped { thread_id: String, body_chars: usize },
}

/// Per-thread scratch directories under the temp root.
struct Workspace {
    temp_root: PathBuf,
    root: PathBuf,
}

impl Workspace {
    fn create(temp_root: &Path, thread_id: &str) -> anyhow::Result<Self> {
        let root = temp_root.join(thread_id);
        if root.exists() {
            info!("Removing stale workspace {}", root.display());
            fs::remove_dir_all(&root)?;
        }
        for sub in ["wav", "wav_clean", "png"] {
            fs::create_dir_all(root.join(sub))
                .with_context(|| format!("Failed to create {}", root.join(sub).display()))?;
        }
        Ok(Self {
            temp_root: temp_root.to_path_buf(),
            root,
        })
    }

    fn audio(&self, name: &str) -> PathBuf {
        self.root.join("wav").join(format!("{name}.wav"))
    }

    fn clean_audio(&self, name: &str) -> PathBuf {
        self.root.join("wav_clean").join(format!("{name}.wav"))
    }

    fn images(&self) -> PathBuf {
        self.root.join("png")
    }

    fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Drops the whole temp root, including leftovers of interrupted runs.
    fn release(self, keep: bool) -> anyhow::Result<()> {
        if keep {
            info!("Keeping temporary files in {}", self.root.display());
            return Ok(());
        }
        if self.temp_root.exists() {
            fs::remove_dir_all(&self.temp_root).with_context(|| {
                format!("Failed to remove temp dir {}", self.temp_root.display())
            })?;
        }
        Ok(())
    }
}

/// External collaborators a run talks to.
pub struct Services {
    pub source: Box<dyn ThreadSource>,
    pub tts: Box<dyn SpeechSynthesizer>,
    pub transcriber: Box<dyn Transcriber>,
    pub screenshots: Box<dyn ScreenshotService>,
}

pub struct Pipeline<'a> {
    config: &'a Config,
    mode: Mode,
    keep_temp: bool,
    source: Box<dyn ThreadSource>,
    store: SeenStore,
    tts: Box<dyn SpeechSynthesizer>,
    transcriber: Box<dyn Transcriber>,
    screenshots: Box<dyn ScreenshotService>,
    title_card: TitleCard,
    composer: Composer,
}

impl<'a> Pipeline<'a> {
    pub fn from_config(config: &'a Config, keep_temp: bool) -> anyhow::Result<Self> {
        let tts = Box::new(PiperTts {
            binary: config.tts.binary.clone(),
            models: config.tts.models.clone(),
            multiple_voices: config.tts.multiple_voices,
        });
        let transcriber: Box<dyn Transcriber> = match config.transcription.engine {
            TranscriptionEngine::Whisper => Box::new(WhisperTranscriber {
                command: config.transcription.command.clone(),
                model: config.transcription.model.clone(),
                work_dir: config.paths.temp_dir.join("transcripts"),
            }),
            // transcribes the raw files, which carry no padding
            TranscriptionEngine::Estimate => Box::new(EstimatedTranscriber {
                trailing_silence: 0.0,
            }),
        };
        let screenshots: Box<dyn ScreenshotService> = match config.screenshots.method {
            ScreenshotMethod::Card => Box::new(CardScreenshots {
                card: title_card(config),
            }),
            ScreenshotMethod::Command => Box::new(CommandScreenshots {
                command: config.screenshots.command.clone(),
            }),
        };

        let services = Services {
            source: Box::new(RedditClient::new()),
            tts,
            transcriber,
            screenshots,
        };
        Self::with_services(config, keep_temp, services)
    }

    pub fn with_services(
        config: &'a Config,
        keep_temp: bool,
        services: Services,
    ) -> anyhow::Result<Self> {
        let mode = config.settings.mode();
        let (width, height) = config.settings.frame(mode);
        Ok(Self {
            config,
            mode,
            keep_temp,
            source: services.source,
            store: SeenStore::open(&config.paths.database)?,
            tts: services.tts,
            transcriber: services.transcriber,
            screenshots: services.screenshots,
            title_card: title_card(config),
            composer: Composer::new(
                Frame { width, height },
                config.settings.opacity,
                (&config.captions).into(),
            ),
        })
    }

    pub async fn run(&mut self) -> anyhow::Result<RunOutcome> {
        let subreddit = self.config.reddit.subreddit.clone();
        match self.mode {
            Mode::Story => info!("Storymode is on for subreddit: {}", subreddit),
            Mode::Comments => info!("Comments mode is on for subreddit: {}", subreddit),
        }

        debug!("{} threads already used", self.store.len());
        let strategy = SelectionStrategy::new(&self.config.reddit, self.mode == Mode::Story);
        let thread = self
            .source
            .fetch_candidate_thread(&subreddit, &strategy, &self.store)
            .await
            .stage(Stage::ThreadFetch)?
            .ok_or(PipelineError::NoThread { subreddit })?;

        let workspace = Workspace::create(&self.config.paths.temp_dir, &thread.id)?;
        let result = match self.mode {
            Mode::Story => self.run_story(&thread, &workspace),
            Mode::Comments => self.run_comments(&thread, &workspace).await,
        };

        // Service failures may succeed on a later run; anything else is final for this thread.
        let finished = match &result {
            Ok(_) => true,
            Err(e) => e
                .downcast_ref::<PipelineError>()
                .is_some_and(PipelineError::is_content_failure),
        };
        let released = workspace.release(self.keep_temp);
        if finished {
            self.store.record(&thread.id, &thread.title)?;
            info!("Recorded thread {} as seen", thread.id);
        }
        match result {
            Ok(outcome) => {
                released?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(cleanup) = released {
                    warn!("{cleanup:#}");
                }
                Err(e)
            }
        }
    }

    fn speak(&self, text: &str, path: PathBuf) -> Result<AudioSegment, PipelineError> {
        self.tts.synthesize(text, &path).stage(Stage::SpeechSynthesis)?;
        let segment = AudioSegment::load(text, path)?;
        debug!(
            "Saved: {} ({:.2}s)",
            segment.path.display(),
            segment.duration
        );
        Ok(segment)
    }

    fn pad(
        &self,
        segment: &AudioSegment,
        clean_path: PathBuf,
    ) -> Result<AudioSegment, PipelineError> {
        segment
            .with_pause(clean_path, self.config.settings.pause)
            .stage(Stage::AudioPadding)
    }

    fn render_title_card(&self, title: &str, ws: &Workspace) -> Result<PathBuf, PipelineError> {
        let title_image = ws.images().join("fancytitle.png");
        self.title_card
            .render(title, &title_image)
            .stage(Stage::TitleCard)?;
        Ok(title_image)
    }

    fn narration(
        &self,
        ws: &Workspace,
        clean: &[&AudioSegment],
    ) -> Result<PathBuf, PipelineError> {
        let parts: Vec<&Path> = clean.iter().map(|s| s.path.as_path()).collect();
        let narration = ws.file("narration.wav");
        concat_wavs(&parts, &ws.file("files.txt"), &narration).stage(Stage::Narration)?;
        info!("Combined audio written to {}", narration.display());
        Ok(narration)
    }

    fn run_story(&self, thread: &Thread, ws: &Workspace) -> anyhow::Result<RunOutcome> {
        let settings = &self.config.settings;
        let title = sanitize_text(&thread.title);
        let body = sanitize_text(&thread.body);
        let body_chars = body.chars().count();
        if body_chars < settings.min_story_length {
            info!(
                "Post too short ({} < {} chars); skipping",
                body_chars, settings.min_story_length
            );
            return Ok(RunOutcome::Skipped {
                thread_id: thread.id.clone(),
                body_chars,
            });
        }

        let title_audio = self.speak(&title, ws.audio("title"))?;
        let title_image = self.render_title_card(&title, ws)?;

        let chunks = chunk_text(&body, settings.chunk_max_length);
        info!("Split story into {} chunks", chunks.len());
        let mut body_audio = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            info!(
                "Generating TTS chunk {}/{} ({} chars)",
                i + 1,
                chunks.len(),
                chunk.chars().count()
            );
            body_audio.push(self.speak(chunk, ws.audio(&format!("body_{i}")))?);
        }

        let budget = story_budget(&title_audio, &body_audio, settings.pause);
        let seconds = budget.rounded_seconds();
        info!("Story runs {:.2}s ({}s rendered)", budget.total(), seconds);

        let title_clean = self.pad(&title_audio, ws.clean_audio("title"))?;
        let mut body_clean = Vec::with_capacity(body_audio.len());
        for (i, segment) in body_audio.iter().enumerate() {
            body_clean.push(self.pad(segment, ws.clean_audio(&format!("body_{i}")))?);
        }

        let mut parts = Vec::with_capacity(body_audio.len());
        for (raw, clean) in body_audio.iter().zip(&body_clean) {
            let fragments = self
                .transcriber
                .transcribe(raw)
                .stage(Stage::Transcription)?;
            parts.push((clean.duration, fragments));
        }
        let captions = align_captions(parts, title_clean.duration);
        let srt = ws.file("captions.srt");
        write_srt(&srt, &captions)?;
        info!("Wrote {} captions to {}", captions.len(), srt.display());

        let mut clean: Vec<&AudioSegment> = vec![&title_clean];
        clean.extend(body_clean.iter());
        let narration = self.narration(ws, &clean)?;

        let safe_title = file_safe_title(&title);
        let folder = self.config.paths.results_dir.join("long").join(&safe_title);
        fs::create_dir_all(&folder)?;
        let thumbnail = folder.join("thumbnail.png");
        create_thumbnail(&title_image, &thumbnail, settings.thumbnail_zoom)
            .stage(Stage::TitleCard)?;

        let output = folder.join(format!(
            "{} - {}.mp4",
            self.config.reddit.subreddit, safe_title
        ));
        let visual = VisualTrack::Story {
            title: VisualClip {
                image: title_image,
                start: 0.0,
                end: title_clean.duration,
            },
            captions: srt,
        };
        self.compose(seconds, narration, visual, &output)?;

        Ok(RunOutcome::Rendered {
            video: output,
            thumbnail: Some(thumbnail),
            seconds,
        })
    }

    async fn run_comments(&self, thread: &Thread, ws: &Workspace) -> anyhow::Result<RunOutcome> {
        let settings = &self.config.settings;
        let reddit = &self.config.reddit;
        let title = sanitize_text(&thread.title);

        let query = CommentQuery {
            limit: reddit.topn_comments,
            min_len: reddit.min_comment_length,
            max_len: reddit.max_comment_length,
        };
        let comments = self
            .source
            .fetch_top_comments(thread, &query)
            .await
            .stage(Stage::CommentFetch)?;
        if comments.is_empty() {
            return Err(PipelineError::NoComments {
                thread_id: thread.id.clone(),
            }
            .into());
        }

        let title_audio = self.speak(&title, ws.audio("title"))?;
        let mut comment_audio = Vec::with_capacity(comments.len());
        for (idx, comment) in comments.iter().enumerate() {
            comment_audio.push(self.speak(&comment.body, ws.audio(&idx.to_string()))?);
        }

        let mut budget = Budget::new(settings.pause);
        budget.add(title_audio.duration);
        let durations: Vec<f64> = comment_audio.iter().map(|s| s.duration).collect();
        let accepted = budget.accept_within(&durations, settings.total_video_duration);
        if accepted == 0 {
            return Err(PipelineError::NoContent {
                target: settings.total_video_duration,
                used: budget.total(),
            }
            .into());
        }
        if accepted < comments.len() {
            warn!(
                "Dropping {} of {} comments that would overrun {:.0}s",
                comments.len() - accepted,
                comments.len(),
                settings.total_video_duration
            );
        }
        let seconds = whole_seconds(settings.total_video_duration);
        info!(
            "{} comments fit in {:.2}s ({}s rendered)",
            accepted,
            budget.total(),
            seconds
        );

        let accepted_comments = &comments[..accepted];
        let title_image = self.render_title_card(&title, ws)?;
        let images = self
            .screenshots
            .capture(thread, accepted_comments, &ws.images())
            .stage(Stage::Screenshot)?;
        if images.len() != accepted {
            return Err(PipelineError::Composition(format!(
                "{} images for {} comments",
                images.len(),
                accepted
            ))
            .into());
        }

        let title_clean = self.pad(&title_audio, ws.clean_audio("title"))?;
        let mut comment_clean = Vec::with_capacity(accepted);
        for (idx, segment) in comment_audio.iter().take(accepted).enumerate() {
            comment_clean.push(self.pad(segment, ws.clean_audio(&idx.to_string()))?);
        }

        let mut clean: Vec<&AudioSegment> = vec![&title_clean];
        clean.extend(comment_clean.iter());
        let narration = self.narration(ws, &clean)?;

        let mut items = vec![(title_image.as_path(), title_clean.duration)];
        items.extend(
            images
                .iter()
                .zip(&comment_clean)
                .map(|(image, segment)| (image.as_path(), segment.duration)),
        );
        let clips = sequence_clips(items);

        let folder = self.config.paths.results_dir.join("short");
        fs::create_dir_all(&folder)?;
        let output = folder.join(format!(
            "{} - {}.mp4",
            reddit.subreddit,
            file_safe_title(&title)
        ));
        self.compose(seconds, narration, VisualTrack::Comments { clips }, &output)?;

        Ok(RunOutcome::Rendered {
            video: output,
            thumbnail: None,
            seconds,
        })
    }

    fn compose(
        &self,
        seconds: u64,
        narration: PathBuf,
        visual: VisualTrack,
        output: &Path,
    ) -> Result<(), PipelineError> {
        let length = seconds as f64;
        let (background, background_start) = self.composer.prepare_background(
            &mut rand::thread_rng(),
            &self.config.paths.background,
            length,
        )?;
        let composition = Composition {
            background,
            background_start,
            length,
            narration,
            visual,
            output: output.to_path_buf(),
        };
        self.composer.render(&composition)?;
        info!("Final video written to {}", output.display());
        Ok(())
    }
}

fn title_card(config: &Config) -> TitleCard {
    TitleCard {
        template: config.paths.title_template.clone(),
        font: config.paths.title_font.clone(),
        color: config.captions.title_color.clone(),
        padding: 5,
    }
}

/// Title plus every body chunk, each followed by one pause.
pub fn story_budget(title: &AudioSegment, body: &[AudioSegment], pause: f64) -> Budget {
    let mut budget = Budget::new(pause);
    budget.add(title.duration);
    for segment in body {
        budget.add(segment.duration);
    }
    budget
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tests::write_tone;
    use crate::reddit::Comment;
    use async_trait::async_trait;

    #[test]
    fn long_story_is_chunked_and_timed() {
        let dir = tempfile::tempdir().unwrap();
        let sentence = "My neighbour keeps parking across my driveway every single morning. ";
        let mut body = String::new();
        while body.chars().count() < 4500 {
            body.push_str(sentence);
        }
        let body = sanitize_text(&body);
        assert!(body.chars().count() >= 4500);

        let chunks = chunk_text(&body, 2000);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 2000);
            assert!(!chunk.starts_with(' ') && !chunk.ends_with(' '));
        }
        let words: Vec<&str> = body.split_whitespace().collect();
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        assert_eq!(words, rejoined);

        let title_path = dir.path().join("title.wav");
        write_tone(&title_path, 2.5);
        let title = AudioSegment::load("title", &title_path).unwrap();
        let mut body_audio = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let path = dir.path().join(format!("body_{i}.wav"));
            write_tone(&path, 10.25 + i as f64);
            body_audio.push(AudioSegment::load(chunk.clone(), &path).unwrap());
        }

        let budget = story_budget(&title, &body_audio, 1.0);
        let spoken: f64 = body_audio.iter().map(|s| s.duration).sum();
        let expected = spoken + title.duration + (chunks.len() as f64 + 1.0) * 1.0;
        assert!((budget.total() - expected).abs() < 1e-9);
        assert_eq!(budget.rounded_seconds(), expected.ceil() as u64);
    }

    #[test]
    fn padded_story_captions_start_after_title() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("body_0.wav");
        write_tone(&raw, 2.0);
        let segment = AudioSegment::load("one two three", &raw).unwrap();
        let clean = segment.with_pause(dir.path().join("clean.wav"), 1.0).unwrap();

        let fragments = EstimatedTranscriber {
            trailing_silence: 0.0,
        }
        .transcribe(&segment)
        .unwrap();
        let track = align_captions(vec![(clean.duration, fragments)], 4.0);
        assert_eq!(track.len(), 3);
        assert!(track[0].start >= 4.0);
        assert!(track.last().unwrap().end <= 4.0 + 2.0 + 1e-9);
    }

    #[test]
    fn workspace_release_clears_temp_root() {
        let dir = tempfile::tempdir().unwrap();
        let temp_root = dir.path().join("temp");
        fs::create_dir_all(temp_root.join("stale_thread")).unwrap();
        let ws = Workspace::create(&temp_root, "abc123").unwrap();
        assert!(ws.audio("title").parent().unwrap().is_dir());
        assert!(ws.images().is_dir());
        ws.release(false).unwrap();
        assert!(!temp_root.exists());
    }

    #[test]
    fn workspace_can_be_kept() {
        let dir = tempfile::tempdir().unwrap();
        let temp_root = dir.path().join("temp");
        let ws = Workspace::create(&temp_root, "abc123").unwrap();
        ws.release(true).unwrap();
        assert!(temp_root.join("abc123").join("wav_clean").is_dir());
    }

    struct FakeSource {
        thread: Thread,
        comments: Vec<Comment>,
    }

    #[async_trait]
    impl ThreadSource for FakeSource {
        async fn fetch_candidate_thread(
            &self,
            _subreddit: &str,
            _strategy: &SelectionStrategy,
            seen: &SeenStore,
        ) -> anyhow::Result<Option<Thread>> {
            Ok(Some(self.thread.clone()).filter(|t| !seen.contains(&t.id)))
        }

        async fn fetch_top_comments(
            &self,
            _thread: &Thread,
            _query: &CommentQuery,
        ) -> anyhow::Result<Vec<Comment>> {
            Ok(self.comments.clone())
        }
    }

    /// Writes a fixed-length tone for every request, or fails them all.
    struct ToneTts {
        seconds: f64,
        fail: bool,
    }

    impl SpeechSynthesizer for ToneTts {
        fn synthesize(&self, _text: &str, out_path: &Path) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("piper exited with status 1");
            }
            write_tone(out_path, self.seconds);
            Ok(())
        }
    }

    struct NoScreenshots;

    impl ScreenshotService for NoScreenshots {
        fn capture(
            &self,
            _thread: &Thread,
            _comments: &[Comment],
            _out_dir: &Path,
        ) -> anyhow::Result<Vec<PathBuf>> {
            anyhow::bail!("no screenshots expected")
        }
    }

    fn test_config(root: &Path, storymode: bool) -> Config {
        let mut config = Config::default();
        config.settings.storymode = storymode;
        config.paths.database = root.join("database.json");
        config.paths.temp_dir = root.join("temp");
        config.paths.results_dir = root.join("results");
        config
    }

    fn thread(body: &str) -> Thread {
        Thread {
            id: "t3abc".into(),
            title: "What is your worst neighbour story?".into(),
            body: body.into(),
            score: 420,
            nsfw: false,
            permalink: "/r/AskReddit/comments/t3abc/".into(),
        }
    }

    fn comment(id: &str) -> Comment {
        Comment {
            id: id.into(),
            body: "They mowed the lawn at three in the morning".into(),
            permalink: format!("/r/AskReddit/comments/t3abc/_/{id}/"),
        }
    }

    fn pipeline<'a>(
        config: &'a Config,
        keep_temp: bool,
        body: &str,
        comments: Vec<Comment>,
        tts: ToneTts,
    ) -> Pipeline<'a> {
        let services = Services {
            source: Box::new(FakeSource {
                thread: thread(body),
                comments,
            }),
            tts: Box::new(tts),
            transcriber: Box::new(EstimatedTranscriber {
                trailing_silence: 0.0,
            }),
            screenshots: Box::new(NoScreenshots),
        };
        Pipeline::with_services(config, keep_temp, services).unwrap()
    }

    fn is_recorded(config: &Config) -> bool {
        SeenStore::open(&config.paths.database)
            .unwrap()
            .contains("t3abc")
    }

    #[tokio::test]
    async fn short_story_is_skipped_and_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), true);
        let tts = ToneTts {
            seconds: 1.0,
            fail: false,
        };
        let mut p = pipeline(&config, false, "Too short to narrate.", vec![], tts);

        let outcome = p.run().await.unwrap();
        match outcome {
            RunOutcome::Skipped {
                thread_id,
                body_chars,
            } => {
                assert_eq!(thread_id, "t3abc");
                assert!(body_chars < 4000);
            }
            other => panic!("expected Skipped, got {other:?}"),
        }
        assert!(is_recorded(&config));
        assert!(!config.paths.temp_dir.exists());

        let err = p.run().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoThread { .. })
        ));
    }

    #[tokio::test]
    async fn speech_failure_leaves_thread_unrecorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path(), true);
        config.settings.min_story_length = 10;
        let tts = ToneTts {
            seconds: 1.0,
            fail: true,
        };
        let mut p = pipeline(&config, false, "A story that is long enough.", vec![], tts);

        let err = p.run().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Service {
                stage: Stage::SpeechSynthesis,
                ..
            })
        ));
        assert!(!is_recorded(&config));
        assert!(!config.paths.temp_dir.exists());
    }

    #[tokio::test]
    async fn thread_without_comments_is_recorded_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), false);
        let tts = ToneTts {
            seconds: 1.0,
            fail: false,
        };
        let mut p = pipeline(&config, false, "", vec![], tts);

        let err = p.run().await.unwrap_err();
        let err = err.downcast_ref::<PipelineError>().unwrap();
        assert!(matches!(err, PipelineError::NoComments { .. }));
        assert!(err.is_selection_failure());
        assert!(is_recorded(&config));
        assert!(!config.paths.temp_dir.exists());

        // the same thread is not offered again
        let err = p.run().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoThread { .. })
        ));
    }

    #[tokio::test]
    async fn comments_over_target_are_recorded_without_screenshots() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path(), false);
        config.settings.total_video_duration = 5.0;
        // title 3s + pause already uses 4s of the 5s target
        let tts = ToneTts {
            seconds: 3.0,
            fail: false,
        };
        let mut p = pipeline(&config, false, "", vec![comment("c1"), comment("c2")], tts);

        let err = p.run().await.unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::NoContent { target, used }) => {
                assert_eq!(*target, 5.0);
                assert!((used - 4.0).abs() < 1e-9);
            }
            other => panic!("expected NoContent, got {other:?}"),
        }
        assert!(is_recorded(&config));
        assert!(!config.paths.temp_dir.exists());
    }

    #[tokio::test]
    async fn keep_temp_survives_a_failed_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), false);
        let tts = ToneTts {
            seconds: 1.0,
            fail: false,
        };
        let mut p = pipeline(&config, true, "", vec![], tts);

        assert!(p.run().await.is_err());
        assert!(config.paths.temp_dir.join("t3abc").join("wav").is_dir());
    }
}
