use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::utils::wrap_text;

/// One on-screen caption, in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionInterval {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl CaptionInterval {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Merges per-segment fragments into one absolute caption track.
///
/// Each item is `(segment duration, fragments relative to that segment)`.
/// Fragments are shifted by `offset` plus the durations of all earlier
/// segments and their text is trimmed; order is kept and nothing is merged
/// or split.
pub fn align_captions<I>(segments: I, offset: f64) -> Vec<CaptionInterval>
where
    I: IntoIterator<Item = (f64, Vec<CaptionInterval>)>,
{
    let mut track = Vec::new();
    let mut cumulative = offset;
    for (duration, fragments) in segments {
        track.extend(fragments.into_iter().map(|fragment| CaptionInterval {
            start: fragment.start + cumulative,
            end: fragment.end + cumulative,
            text: fragment.text.trim().to_string(),
        }));
        cumulative += duration;
    }
    track
}

pub fn write_srt(path: &Path, entries: &[CaptionInterval]) -> anyhow::Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    let spoken = entries.iter().filter(|entry| !entry.text.is_empty());
    for (i, entry) in spoken.enumerate() {
        writeln!(f, "{}", i + 1)?;
        writeln!(
            f,
            "{} --> {}",
            format_srt_time(entry.start),
            format_srt_time(entry.end)
        )?;
        for line in wrap_text(&entry.text, 80) {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)?;
    }
    f.flush()?;
    Ok(())
}

fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_sec = total_ms / 1000;
    let s = total_sec % 60;
    let total_min = total_sec / 60;
    let m = total_min % 60;
    let h = total_min / 60;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}
