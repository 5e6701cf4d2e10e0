//! Background selection and the ffmpeg composition for both content modes.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::config::CaptionConfig;
use crate::error::{PipelineError, Stage, StageExt};
use crate::media::{filter_escape, probe_duration_seconds, run_ffmpeg};

pub const OUTPUT_FPS: u32 = 24;
pub const AUDIO_CODEC: &str = "aac";
pub const AUDIO_BITRATE: &str = "192k";
/// Comment images are scaled to this share of the frame width.
pub const SCREENSHOT_WIDTH_PERCENT: u32 = 90;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "webm", "avi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
}

/// An image shown over `[start, end)` seconds of the output.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualClip {
    pub image: PathBuf,
    pub start: f64,
    pub end: f64,
}

/// Places images back-to-back, each lasting its paired duration.
pub fn sequence_clips<'a, I>(items: I) -> Vec<VisualClip>
where
    I: IntoIterator<Item = (&'a Path, f64)>,
{
    let mut cursor = 0.0;
    items
        .into_iter()
        .map(|(image, duration)| {
            let clip = VisualClip {
                image: image.to_path_buf(),
                start: cursor,
                end: cursor + duration,
            };
            cursor += duration;
            clip
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub font: String,
    pub font_size: u32,
    pub color: String,
    pub stroke_color: String,
    pub stroke_width: u32,
}

impl From<&CaptionConfig> for CaptionStyle {
    fn from(c: &CaptionConfig) -> Self {
        Self {
            font: c.font.clone(),
            font_size: c.font_size,
            color: c.color.clone(),
            stroke_color: c.stroke_color.clone(),
            stroke_width: c.stroke_width,
        }
    }
}

impl CaptionStyle {
    /// libass `force_style`, centered on screen (numpad alignment 5).
    fn force_style(&self) -> String {
        format!(
            "FontName={},FontSize={},PrimaryColour={},OutlineColour={},BorderStyle=1,Outline={},Shadow=0,Alignment=5",
            self.font,
            self.font_size,
            ass_colour(&self.color),
            ass_colour(&self.stroke_color),
            self.stroke_width
        )
    }
}

/// `#RRGGBB` to libass `&H00BBGGRR`; anything unparsable falls back to white.
pub fn ass_colour(hex: &str) -> String {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        warn!("Unrecognised colour '{}', using white", hex);
        return "&H00FFFFFF".to_string();
    }
    let (r, g, b) = (&digits[0..2], &digits[2..4], &digits[4..6]);
    format!("&H00{}{}{}", b, g, r).to_uppercase()
}

#[derive(Debug, Clone, PartialEq)]
pub enum VisualTrack {
    /// Title card while the title is read, then the caption track.
    Story { title: VisualClip, captions: PathBuf },
    /// Title card and comment images back-to-back.
    Comments { clips: Vec<VisualClip> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub background: PathBuf,
    pub background_start: f64,
    pub length: f64,
    pub narration: PathBuf,
    pub visual: VisualTrack,
    pub output: PathBuf,
}

/// Uniform random start so that `start + length <= available`.
pub fn pick_background_start<R: Rng + ?Sized>(
    rng: &mut R,
    path: &Path,
    available: f64,
    length: f64,
) -> Result<f64, PipelineError> {
    if !(available >= length) {
        return Err(PipelineError::BackgroundTooShort {
            path: path.to_path_buf(),
            available,
            required: length,
        });
    }
    let slack = available - length;
    if slack <= 0.0 {
        return Ok(0.0);
    }
    Ok(rng.gen_range(0.0..=slack))
}

/// A file is used as is; a directory yields one of its videos at random.
pub fn choose_background_asset<R: Rng + ?Sized>(
    rng: &mut R,
    path: &Path,
) -> Result<PathBuf, PipelineError> {
    if !path.is_dir() {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(PipelineError::Composition(format!(
            "background {} does not exist",
            path.display()
        )));
    }
    let entries = fs::read_dir(path).map_err(|e| {
        PipelineError::Composition(format!("cannot list {}: {e}", path.display()))
    })?;
    let mut videos: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    videos.sort();
    videos.choose(rng).cloned().ok_or_else(|| {
        PipelineError::Composition(format!("no background videos in {}", path.display()))
    })
}

pub struct Composer {
    pub frame: Frame,
    pub opacity: f64,
    pub caption_style: CaptionStyle,
    pub threads: usize,
}

impl Composer {
    pub fn new(frame: Frame, opacity: f64, caption_style: CaptionStyle) -> Self {
        let threads = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self {
            frame,
            opacity,
            caption_style,
            threads,
        }
    }

    /// Picks the background asset and a start offset for a `length`-second video.
    pub fn prepare_background<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        background: &Path,
        length: f64,
    ) -> Result<(PathBuf, f64), PipelineError> {
        let asset = choose_background_asset(rng, background)?;
        let available = probe_duration_seconds(&asset).stage(Stage::Render)?;
        let start = pick_background_start(rng, &asset, available, length)?;
        info!(
            "Background {} ({:.1}s) from {:.2}s for {:.0}s",
            asset.display(),
            available,
            start,
            length
        );
        Ok((asset, start))
    }

    pub fn ffmpeg_args(&self, composition: &Composition) -> Result<Vec<String>, PipelineError> {
        if !(composition.length > 0.0) {
            return Err(PipelineError::Composition(format!(
                "video length must be positive, got {}",
                composition.length
            )));
        }
        let Frame { width, height } = self.frame;

        let mut args: Vec<String> = vec![
            "-ss".into(),
            format!("{:.3}", composition.background_start),
            "-t".into(),
            format!("{:.3}", composition.length),
            "-i".into(),
            composition.background.to_string_lossy().into_owned(),
            "-i".into(),
            composition.narration.to_string_lossy().into_owned(),
        ];

        let mut graph = vec![format!(
            "[0:v]scale={width}:{height}:force_original_aspect_ratio=increase,crop={width}:{height},setsar=1[bg]"
        )];
        let alpha = format!("format=rgba,colorchannelmixer=aa={:.3}", self.opacity);

        match &composition.visual {
            VisualTrack::Story { title, captions } => {
                push_image_input(&mut args, title);
                graph.push(format!("[2:v]{alpha}[title]"));
                graph.push(format!(
                    "[bg][title]overlay=(W-w)/2:(H-h)/2:enable='between(t,{:.3},{:.3})'[titled]",
                    title.start, title.end
                ));
                graph.push(format!(
                    "[titled]subtitles=filename={}:force_style='{}'[vout]",
                    filter_escape(captions),
                    self.caption_style.force_style()
                ));
            }
            VisualTrack::Comments { clips } => {
                if clips.is_empty() {
                    return Err(PipelineError::Composition(
                        "comments video has no image clips".to_string(),
                    ));
                }
                let clip_width = width * SCREENSHOT_WIDTH_PERCENT / 100;
                let mut last = "bg".to_string();
                for (i, clip) in clips.iter().enumerate() {
                    push_image_input(&mut args, clip);
                    let input = i + 2;
                    graph.push(format!("[{input}:v]scale={clip_width}:-2,{alpha}[img{i}]"));
                    let out = if i + 1 == clips.len() {
                        "vout".to_string()
                    } else {
                        format!("v{i}")
                    };
                    graph.push(format!(
                        "[{last}][img{i}]overlay=(W-w)/2:(H-h)/2:enable='between(t,{:.3},{:.3})'[{out}]",
                        clip.start, clip.end
                    ));
                    last = out;
                }
            }
        }

        args.extend([
            "-filter_complex".into(),
            graph.join(";"),
            "-map".into(),
            "[vout]".into(),
            "-map".into(),
            "1:a:0".into(),
            "-r".into(),
            OUTPUT_FPS.to_string(),
            "-c:v".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            AUDIO_CODEC.into(),
            "-b:a".into(),
            AUDIO_BITRATE.into(),
            "-threads".into(),
            self.threads.to_string(),
            "-t".into(),
            format!("{:.3}", composition.length),
            composition.output.to_string_lossy().into_owned(),
        ]);
        Ok(args)
    }

    /// Renders the composition; a failed render leaves no output file behind.
    pub fn render(&self, composition: &Composition) -> Result<(), PipelineError> {
        let args = self.ffmpeg_args(composition)?;
        info!(
            "Rendering {} ({:.0}s, {}x{}, {} threads)",
            composition.output.display(),
            composition.length,
            self.frame.width,
            self.frame.height,
            self.threads
        );
        if let Err(e) = run_ffmpeg(&args, "render final video") {
            if composition.output.exists() {
                if let Err(rm) = fs::remove_file(&composition.output) {
                    warn!("Could not remove partial {}: {rm}", composition.output.display());
                }
            }
            return Err(PipelineError::Service {
                stage: Stage::Render,
                cause: e,
            });
        }
        Ok(())
    }
}

// Still images are looped up to their clip end so they exist for the whole window.
fn push_image_input(args: &mut Vec<String>, clip: &VisualClip) {
    args.extend([
        "-loop".into(),
        "1".into(),
        "-t".into(),
        format!("{:.3}", clip.end),
        "-i".into(),
        clip.image.to_string_lossy().into_owned(),
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn composer() -> Composer {
        Composer {
            frame: Frame {
                width: 1080,
                height: 1920,
            },
            opacity: 0.9,
            caption_style: CaptionStyle::from(&CaptionConfig::default()),
            threads: 4,
        }
    }

    #[test]
    fn background_start_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let path = Path::new("bg.mp4");
        for _ in 0..1000 {
            let start = pick_background_start(&mut rng, path, 300.0, 58.0).unwrap();
            assert!(start >= 0.0);
            assert!(start + 58.0 <= 300.0);
        }
        assert_eq!(pick_background_start(&mut rng, path, 58.0, 58.0).unwrap(), 0.0);
    }

    #[test]
    fn short_background_fails() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..3 {
            let err = pick_background_start(&mut rng, Path::new("bg.mp4"), 30.0, 58.0).unwrap_err();
            assert!(matches!(
                err,
                PipelineError::BackgroundTooShort { available, required, .. }
                    if available == 30.0 && required == 58.0
            ));
        }
    }

    #[test]
    fn background_directory_picks_a_video() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join("minecraft.MP4"), "x").unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let chosen = choose_background_asset(&mut rng, dir.path()).unwrap();
        assert_eq!(chosen, dir.path().join("minecraft.MP4"));

        let empty = tempfile::tempdir().unwrap();
        assert!(choose_background_asset(&mut rng, empty.path()).is_err());
    }

    #[test]
    fn clips_are_back_to_back() {
        let title = PathBuf::from("title.png");
        let c0 = PathBuf::from("0.png");
        let clips = sequence_clips([(title.as_path(), 3.5), (c0.as_path(), 6.0)]);
        assert_eq!(clips[0].start, 0.0);
        assert_eq!(clips[0].end, 3.5);
        assert_eq!(clips[1].start, 3.5);
        assert_eq!(clips[1].end, 9.5);
    }

    #[test]
    fn colours_convert_to_ass() {
        assert_eq!(ass_colour("#FFA500"), "&H0000A5FF");
        assert_eq!(ass_colour("ffffff"), "&H00FFFFFF");
        assert_eq!(ass_colour("orange"), "&H00FFFFFF");
    }

    #[test]
    fn comments_args_overlay_each_clip_scaled() {
        let clips = sequence_clips([
            (Path::new("title.png"), 3.0),
            (Path::new("0.png"), 5.0),
        ]);
        let composition = Composition {
            background: "bg.mp4".into(),
            background_start: 12.5,
            length: 8.0,
            narration: "narration.wav".into(),
            visual: VisualTrack::Comments { clips },
            output: "out.mp4".into(),
        };
        let args = composer().ffmpeg_args(&composition).unwrap();
        let graph = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];

        assert!(graph.contains("[2:v]scale=972:-2"));
        assert!(graph.contains("[3:v]scale=972:-2"));
        assert!(graph.contains("enable='between(t,0.000,3.000)'[v0]"));
        assert!(graph.contains("enable='between(t,3.000,8.000)'[vout]"));
        assert_eq!(&args[0..4], ["-ss", "12.500", "-t", "8.000"]);
        let fps = args.iter().position(|a| a == "-r").unwrap();
        assert_eq!(args[fps + 1], "24");
        let threads = args.iter().position(|a| a == "-threads").unwrap();
        assert_eq!(args[threads + 1], "4");
        assert!(args.windows(2).any(|w| w == ["-b:a", "192k"]));
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn story_args_show_title_then_captions() {
        let composition = Composition {
            background: "bg.mp4".into(),
            background_start: 0.0,
            length: 98.0,
            narration: "narration.wav".into(),
            visual: VisualTrack::Story {
                title: VisualClip {
                    image: "title.png".into(),
                    start: 0.0,
                    end: 4.2,
                },
                captions: "captions.srt".into(),
            },
            output: "out.mp4".into(),
        };
        let args = composer().ffmpeg_args(&composition).unwrap();
        let graph = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(graph.contains("enable='between(t,0.000,4.200)'[titled]"));
        assert!(
            graph.contains("[titled]subtitles=filename=captions.srt:force_style='FontName=Ubuntu Mono")
        );
        assert!(graph.contains("Alignment=5'[vout]"));
        assert!(graph.contains("colorchannelmixer=aa=0.900"));
    }

    #[test]
    fn empty_comment_track_is_rejected() {
        let composition = Composition {
            background: "bg.mp4".into(),
            background_start: 0.0,
            length: 10.0,
            narration: "n.wav".into(),
            visual: VisualTrack::Comments { clips: Vec::new() },
            output: "out.mp4".into(),
        };
        assert!(matches!(
            composer().ffmpeg_args(&composition),
            Err(PipelineError::Composition(_))
        ));
    }
}
