use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context;
use rand::seq::SliceRandom;
use tracing::{debug, error};

/// Text-to-speech: one call per text chunk, writing a WAV file to `out_path`.
pub trait SpeechSynthesizer {
    fn synthesize(&self, text: &str, out_path: &Path) -> anyhow::Result<()>;
}

/// Local piper voice. With several models and `multiple_voices` each call
/// picks a random voice.
pub struct PiperTts {
    pub binary: String,
    pub models: Vec<PathBuf>,
    pub multiple_voices: bool,
}

impl PiperTts {
    fn pick_model(&self) -> anyhow::Result<&Path> {
        let model = if self.multiple_voices {
            self.models.choose(&mut rand::thread_rng())
        } else {
            self.models.first()
        };
        model
            .map(PathBuf::as_path)
            .ok_or_else(|| anyhow::anyhow!("No piper voice model configured"))
    }
}

impl SpeechSynthesizer for PiperTts {
    fn synthesize(&self, text: &str, out_path: &Path) -> anyhow::Result<()> {
        let model = self.pick_model()?;
        debug!(
            "Calling piper with {} for {} ({} chars)",
            model.display(),
            out_path.display(),
            text.chars().count()
        );

        let mut child = Command::new(&self.binary)
            .arg("--model")
            .arg(model)
            .arg("--output_file")
            .arg(out_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.binary))?;

        {
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| anyhow::anyhow!("Failed to open piper stdin"))?;
            stdin.write_all(text.as_bytes())?;
        }

        let status = child.wait()?;
        if !status.success() {
            error!("Piper TTS command failed for {}", out_path.display());
            anyhow::bail!("TTS engine returned {:?} for {}", status.code(), out_path.display());
        }
        Ok(())
    }
}
