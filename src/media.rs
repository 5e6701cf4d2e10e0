//! Thin wrappers over the ffmpeg/ffprobe binaries.

use std::ffi::OsStr;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Context;
use tracing::{debug, warn};

pub fn probe_duration_seconds(path: &Path) -> anyhow::Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .with_context(|| format!("Failed to run ffprobe for {}", path.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    duration_str
        .trim()
        .parse()
        .with_context(|| format!("Failed to parse ffprobe duration '{}'", duration_str.trim()))
}

pub fn probe_dimensions(path: &Path) -> anyhow::Result<(u32, u32)> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .arg(path)
        .output()
        .with_context(|| format!("Failed to probe dimensions of {}", path.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe exited with status {:?} while probing {}",
            output.status.code(),
            path.display()
        );
    }
    parse_dimensions(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("Unexpected ffprobe dimensions for {}", path.display()))
}

fn parse_dimensions(raw: &str) -> anyhow::Result<(u32, u32)> {
    let value = raw.trim();
    let (w, h) = value
        .split_once('x')
        .ok_or_else(|| anyhow::anyhow!("expected WxH, got '{}'", value))?;
    Ok((w.trim().parse()?, h.trim().parse()?))
}

/// Runs ffmpeg quietly; on failure the tail of its stderr ends up in the error.
pub fn run_ffmpeg<I, S>(args: I, what: &str) -> anyhow::Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-loglevel", "error", "-y"])
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    debug!("Running {:?}", cmd);

    let output = cmd
        .output()
        .with_context(|| format!("Failed to spawn ffmpeg to {what}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: Vec<&str> = stderr.lines().rev().take(8).collect();
        let tail: Vec<&str> = tail.into_iter().rev().collect();
        anyhow::bail!("ffmpeg failed to {what}: {}", tail.join("\n"));
    }
    Ok(())
}

/// Concatenates WAV parts in order with the concat demuxer.
pub fn concat_wavs(parts: &[&Path], list_path: &Path, out_path: &Path) -> anyhow::Result<()> {
    if parts.is_empty() {
        anyhow::bail!("No audio parts to concatenate");
    }
    {
        let mut f = File::create(list_path)?;
        for part in parts {
            let absolute = std::path::absolute(part)?;
            writeln!(f, "file '{}'", concat_escape(&absolute.to_string_lossy()))?;
        }
    }

    let list = list_path.to_string_lossy().to_string();
    let out = out_path.to_string_lossy().to_string();
    let copy = run_ffmpeg(
        ["-f", "concat", "-safe", "0", "-i", list.as_str(), "-c", "copy", out.as_str()],
        "concatenate narration",
    );
    if let Err(e) = copy {
        warn!("ffmpeg concat with copy failed ({e:#}); retrying with re-encode");
        run_ffmpeg(
            ["-f", "concat", "-safe", "0", "-i", list.as_str(), "-c:a", "pcm_s16le", out.as_str()],
            "concatenate narration",
        )?;
    }
    Ok(())
}

fn concat_escape(path: &str) -> String {
    path.replace('\'', r"'\''")
}

/// Escapes a path for use as an unquoted filtergraph option value.
pub fn filter_escape(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | ':' | '\'' | ',' | ';' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
