use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::audio::AudioSegment;
use crate::subtitle::CaptionInterval;

/// Speech recognition: time-stamped fragments relative to the segment start.
pub trait Transcriber {
    fn transcribe(&self, segment: &AudioSegment) -> anyhow::Result<Vec<CaptionInterval>>;
}

/// Runs the `whisper` CLI and reads its JSON segments.
pub struct WhisperTranscriber {
    pub command: String,
    pub model: String,
    pub work_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, segment: &AudioSegment) -> anyhow::Result<Vec<CaptionInterval>> {
        fs::create_dir_all(&self.work_dir)?;
        info!("Transcribing {} with whisper", segment.path.display());

        let output = Command::new(&self.command)
            .arg(&segment.path)
            .args(["--model", &self.model, "--output_format", "json", "--verbose", "False"])
            .arg("--output_dir")
            .arg(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to run {}", self.command))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} exited with {:?}: {}",
                self.command,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let stem = segment
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid audio filename"))?;
        let json_path = self.work_dir.join(format!("{stem}.json"));
        let raw = fs::read_to_string(&json_path)
            .with_context(|| format!("whisper wrote no transcript at {}", json_path.display()))?;
        let fragments = parse_whisper_json(&raw)?;
        debug!("whisper returned {} fragments", fragments.len());
        Ok(fragments)
    }
}

pub fn parse_whisper_json(raw: &str) -> anyhow::Result<Vec<CaptionInterval>> {
    let parsed: WhisperOutput =
        serde_json::from_str(raw).context("Failed to parse whisper JSON output")?;
    Ok(parsed
        .segments
        .into_iter()
        .map(|s| CaptionInterval::new(s.start, s.end, s.text))
        .collect())
}

const COMMA_PAUSE: f64 = 0.20;
const SENTENCE_END_PAUSE: f64 = 0.40;
const WORD_WEIGHT_ALPHA: f64 = 0.5;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w[\w'-]*)|([,.!?])").unwrap());

/// Offline stand-in for speech recognition.
///
/// Spreads the segment's spoken time over its words, weighting each word by
/// `len^alpha` after reserving fixed pauses for punctuation.
pub struct EstimatedTranscriber {
    /// Trailing silence baked into the file that should not carry words.
    pub trailing_silence: f64,
}

impl Transcriber for EstimatedTranscriber {
    fn transcribe(&self, segment: &AudioSegment) -> anyhow::Result<Vec<CaptionInterval>> {
        let spoken = (segment.duration - self.trailing_silence).max(0.0);
        Ok(estimate_word_timings(&segment.text, spoken))
    }
}

pub fn estimate_word_timings(text: &str, duration: f64) -> Vec<CaptionInterval> {
    let elements: Vec<&str> = WORD_RE.find_iter(text).map(|m| m.as_str()).collect();
    if elements.is_empty() {
        if text.trim().is_empty() {
            return Vec::new();
        }
        return vec![CaptionInterval::new(0.0, duration, text)];
    }

    let mut total_pause_time = 0.0;
    let mut word_elements = Vec::new();
    for &element in &elements {
        match element {
            "," => total_pause_time += COMMA_PAUSE,
            "." | "!" | "?" => total_pause_time += SENTENCE_END_PAUSE,
            _ => word_elements.push(element),
        }
    }

    // Pauses never squeeze words past the end of the segment.
    let pause_scale = if total_pause_time > duration && total_pause_time > 0.0 {
        duration / total_pause_time
    } else {
        1.0
    };
    let word_time_available = (duration - total_pause_time * pause_scale).max(0.0);
    let total_weight: f64 = word_elements
        .iter()
        .map(|w| (w.chars().count() as f64).powf(WORD_WEIGHT_ALPHA))
        .sum();

    let mut fragments = Vec::with_capacity(word_elements.len());
    let mut cursor = 0.0;
    for element in elements {
        match element {
            "," => cursor += COMMA_PAUSE * pause_scale,
            "." | "!" | "?" => cursor += SENTENCE_END_PAUSE * pause_scale,
            word => {
                let weight = (word.chars().count() as f64).powf(WORD_WEIGHT_ALPHA);
                let word_duration = if total_weight > 0.0 {
                    word_time_available * weight / total_weight
                } else {
                    0.0
                };
                let start = cursor;
                let end = (start + word_duration).min(duration);
                fragments.push(CaptionInterval::new(start, end, word));
                cursor = end;
            }
        }
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimated_words_are_ordered_and_fit() {
        let fragments = estimate_word_timings("Hello, world. This is fine!", 4.0);
        let words: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(words, vec!["Hello", "world", "This", "is", "fine"]);

        let mut previous_end = 0.0;
        for f in &fragments {
            assert!(f.start >= previous_end - 1e-9);
            assert!(f.end >= f.start);
            assert!(f.end <= 4.0 + 1e-9);
            previous_end = f.end;
        }
    }

    #[test]
    fn equal_words_share_time_evenly() {
        let fragments = estimate_word_timings("Hello, world.", 2.0);
        assert_eq!(fragments.len(), 2);
        assert!((fragments[0].end - 0.7).abs() < 1e-9);
        assert!((fragments[1].start - 0.9).abs() < 1e-9);
        assert!((fragments[1].end - 1.6).abs() < 1e-9);
    }

    #[test]
    fn punctuation_heavy_text_stays_inside_segment() {
        let fragments = estimate_word_timings("No. No. No. No.", 0.5);
        assert_eq!(fragments.len(), 4);
        assert!(fragments.iter().all(|f| f.end <= 0.5 + 1e-9));
    }

    #[test]
    fn estimator_ignores_trailing_silence() {
        let segment = AudioSegment {
            text: "one two".into(),
            path: PathBuf::from("unused.wav"),
            duration: 3.0,
        };
        let fragments = EstimatedTranscriber {
            trailing_silence: 1.0,
        }
        .transcribe(&segment)
        .unwrap();
        assert!((fragments.last().unwrap().end - 2.0).abs() < 1e-9);
    }

    #[test]
    fn parses_whisper_segments() {
        let raw = r#"{"text": " Hi there. Bye.", "segments": [
            {"id": 0, "start": 0.0, "end": 1.4, "text": " Hi there.", "tokens": [1, 2]},
            {"id": 1, "start": 1.4, "end": 2.0, "text": " Bye."}
        ], "language": "en"}"#;
        let fragments = parse_whisper_json(raw).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[1], CaptionInterval::new(1.4, 2.0, " Bye."));
    }
}
