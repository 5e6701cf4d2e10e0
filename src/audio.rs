use std::path::{Path, PathBuf};

use anyhow::Context;
use hound::{SampleFormat, WavReader, WavWriter};

use crate::error::PipelineError;

/// One synthesized narration file and the text it speaks.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    pub text: String,
    pub path: PathBuf,
    pub duration: f64,
}

impl AudioSegment {
    pub fn load(text: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();
        let duration = wav_duration_seconds(&path)?;
        Ok(Self {
            text: text.into(),
            path,
            duration,
        })
    }

    /// Writes a copy with `pause` seconds of trailing silence and returns it as a new segment.
    pub fn with_pause(&self, clean_path: impl Into<PathBuf>, pause: f64) -> anyhow::Result<Self> {
        let clean_path = clean_path.into();
        add_pause(&self.path, &clean_path, pause)?;
        Ok(Self::load(self.text.clone(), clean_path)?)
    }
}

pub fn wav_duration_seconds(path: &Path) -> Result<f64, PipelineError> {
    let reader = WavReader::open(path).map_err(|source| PipelineError::Duration {
        path: path.to_path_buf(),
        source,
    })?;
    let spec = reader.spec();
    let samples = reader.len();
    let frames = samples as f64 / spec.channels as f64;
    let duration = frames / spec.sample_rate as f64;
    Ok(duration)
}

pub fn add_pause(input: &Path, output: &Path, pause: f64) -> anyhow::Result<()> {
    let mut reader = WavReader::open(input)
        .with_context(|| format!("Failed to open {} for padding", input.display()))?;
    let spec = reader.spec();
    let mut writer = WavWriter::create(output, spec)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let silent_samples =
        (pause.max(0.0) * spec.sample_rate as f64).round() as u64 * spec.channels as u64;

    match spec.sample_format {
        SampleFormat::Int => {
            for sample in reader.samples::<i32>() {
                writer.write_sample(sample?)?;
            }
            for _ in 0..silent_samples {
                writer.write_sample(0i32)?;
            }
        }
        SampleFormat::Float => {
            for sample in reader.samples::<f32>() {
                writer.write_sample(sample?)?;
            }
            for _ in 0..silent_samples {
                writer.write_sample(0.0f32)?;
            }
        }
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hound::WavSpec;

    pub(crate) fn write_tone(path: &Path, seconds: f64) {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        let samples = (seconds * 16_000.0).round() as usize;
        for i in 0..samples {
            writer.write_sample(((i % 64) as i16 - 32) * 100).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn reads_duration_of_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        write_tone(&path, 0.5);
        let dur = wav_duration_seconds(&path).unwrap();
        assert!((dur - 0.5).abs() < 1e-9);
    }

    #[test]
    fn missing_file_is_a_duration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = wav_duration_seconds(&dir.path().join("nope.wav")).unwrap_err();
        assert!(matches!(err, PipelineError::Duration { .. }));
    }

    #[test]
    fn corrupt_file_is_a_duration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        std::fs::write(&path, b"definitely not a riff header").unwrap();
        assert!(matches!(
            wav_duration_seconds(&path),
            Err(PipelineError::Duration { .. })
        ));
    }

    #[test]
    fn pause_extends_clean_copy_only() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw.wav");
        write_tone(&raw, 1.25);
        let segment = AudioSegment::load("hello", &raw).unwrap();
        let clean = segment.with_pause(dir.path().join("clean.wav"), 1.0).unwrap();

        assert!((clean.duration - 2.25).abs() < 1e-9);
        assert_eq!(clean.text, "hello");
        assert!((wav_duration_seconds(&raw).unwrap() - 1.25).abs() < 1e-9);
    }
}
