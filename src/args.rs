use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Story,
    Comments,
}

/// Command line overrides; everything else comes from the config file.
#[derive(Parser, Debug)]
#[clap(about = "Turns a Reddit thread into a narrated video")]
pub struct Args {
    #[clap(long, default_value = "assets/config.toml")]
    pub config: PathBuf,

    #[clap(long)]
    pub subreddit: Option<String>,

    #[clap(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Background video file or directory of videos
    #[clap(long)]
    pub background: Option<PathBuf>,

    #[clap(long)]
    pub chunk_chars: Option<usize>,

    /// Leave the per-thread temp directory in place after the run
    #[clap(long)]
    pub keep_temp: bool,
}

impl Args {
    pub fn apply(&self, config: &mut Config) {
        if let Some(subreddit) = &self.subreddit {
            config.reddit.subreddit = subreddit.clone();
        }
        if let Some(mode) = self.mode {
            config.settings.storymode = mode == ModeArg::Story;
        }
        if let Some(background) = &self.background {
            config.paths.background = background.clone();
        }
        if let Some(chunk_chars) = self.chunk_chars {
            config.settings.chunk_max_length = chunk_chars;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "redditshorts",
            "--subreddit",
            "tifu",
            "--mode",
            "story",
            "--chunk-chars",
            "250",
            "--keep-temp",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.reddit.subreddit, "tifu");
        assert_eq!(config.settings.mode(), Mode::Story);
        assert_eq!(config.settings.chunk_max_length, 250);
        assert_eq!(config.paths.background, PathBuf::from("assets/backgrounds"));
        assert!(args.keep_temp);
    }

    #[test]
    fn absent_flags_leave_config_alone() {
        let args = Args::parse_from(["redditshorts"]);
        let mut config = Config::default();
        config.settings.storymode = true;
        args.apply(&mut config);
        assert_eq!(args.config, PathBuf::from("assets/config.toml"));
        assert_eq!(config.settings.mode(), Mode::Story);
        assert_eq!(config.reddit.subreddit, "AskReddit");
    }
}
