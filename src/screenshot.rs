use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context;
use tracing::info;

use crate::reddit::{Comment, Thread, comment_url};
use crate::title::TitleCard;

/// Produces one image per comment, in comment order.
pub trait ScreenshotService {
    fn capture(
        &self,
        thread: &Thread,
        comments: &[Comment],
        out_dir: &Path,
    ) -> anyhow::Result<Vec<PathBuf>>;
}

/// Draws each comment's text onto the card template instead of capturing the page.
pub struct CardScreenshots {
    pub card: TitleCard,
}

impl ScreenshotService for CardScreenshots {
    fn capture(
        &self,
        thread: &Thread,
        comments: &[Comment],
        out_dir: &Path,
    ) -> anyhow::Result<Vec<PathBuf>> {
        fs::create_dir_all(out_dir)?;
        info!("Rendering {} comment cards for {}", comments.len(), thread.id);
        comments
            .iter()
            .enumerate()
            .map(|(idx, comment)| {
                let path = out_dir.join(format!("{idx}.png"));
                self.card
                    .render(&comment.body, &path)
                    .with_context(|| format!("Failed to render card for comment {}", comment.id))?;
                Ok(path)
            })
            .collect()
    }
}

/// Delegates to an external capture tool invoked as `<command...> <url> <output>`.
pub struct CommandScreenshots {
    pub command: Vec<String>,
}

impl ScreenshotService for CommandScreenshots {
    fn capture(
        &self,
        thread: &Thread,
        comments: &[Comment],
        out_dir: &Path,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let (program, base_args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("screenshots.command is empty"))?;
        fs::create_dir_all(out_dir)?;
        info!("Capturing {} comments of {} with {}", comments.len(), thread.id, program);

        let mut paths = Vec::with_capacity(comments.len());
        for (idx, comment) in comments.iter().enumerate() {
            let path = out_dir.join(format!("{idx}.png"));
            let status = Command::new(program)
                .args(base_args)
                .arg(comment_url(&comment.permalink))
                .arg(&path)
                .stdin(Stdio::null())
                .status()
                .with_context(|| format!("Failed to spawn {program}"))?;
            if !status.success() {
                anyhow::bail!(
                    "{program} exited with {:?} for comment {}",
                    status.code(),
                    comment.id
                );
            }
            if !path.exists() {
                anyhow::bail!("{program} did not write {}", path.display());
            }
            info!("Saved: {}", path.display());
            paths.push(path);
        }
        Ok(paths)
    }
}
