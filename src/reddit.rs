use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{RedditConfig, TimeWindow};
use crate::sanitize::sanitize_text;
use crate::store::SeenStore;

const REDDIT_BASE: &str = "https://www.reddit.com";
const BOT_USER_AGENT: &str = "redditshorts/0.1 (video narration bot)";

#[derive(Debug, Deserialize)]
pub struct RedditListing<T> {
    pub data: RedditListingData<T>,
}

#[derive(Debug, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditChild<T>>,
}

#[derive(Debug, Deserialize)]
pub struct RedditChild<T> {
    #[serde(default)]
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditPost {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub score: i64,
    pub over_18: Option<bool>,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub permalink: String,
}

/// Comment listing entries; `more` placeholders carry none of the text fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RedditComment {
    pub id: String,
    pub body: String,
    pub permalink: String,
    pub stickied: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    pub id: String,
    pub title: String,
    pub body: String,
    pub score: i64,
    pub nsfw: bool,
    pub permalink: String,
}

impl From<RedditPost> for Thread {
    fn from(post: RedditPost) -> Self {
        Self {
            nsfw: post.over_18.unwrap_or(false),
            id: post.id,
            title: post.title,
            body: post.selftext,
            score: post.score,
            permalink: post.permalink,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    /// Sanitized, narration-ready text.
    pub body: String,
    pub permalink: String,
}

/// Which posts may be picked at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentFilter {
    pub allow_nsfw: bool,
    pub require_body: bool,
}

impl ContentFilter {
    pub fn accepts(&self, post: &RedditPost) -> bool {
        if post.stickied {
            return false;
        }
        if !self.allow_nsfw && post.over_18.unwrap_or(false) {
            return false;
        }
        !(self.require_body && post.selftext.trim().is_empty())
    }
}

/// Listing window plus content filter; candidates are ranked by score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionStrategy {
    pub window: TimeWindow,
    pub limit: usize,
    pub filter: ContentFilter,
}

impl SelectionStrategy {
    pub fn new(reddit: &RedditConfig, storymode: bool) -> Self {
        Self {
            window: reddit.time_window,
            limit: reddit.candidate_limit,
            filter: ContentFilter {
                allow_nsfw: reddit.allow_nsfw,
                require_body: storymode,
            },
        }
    }

    pub fn listing_url(&self, subreddit: &str) -> String {
        match self.window {
            TimeWindow::Hot => format!("{REDDIT_BASE}/r/{subreddit}/hot.json?limit={}", self.limit),
            window => format!(
                "{REDDIT_BASE}/r/{subreddit}/top.json?t={}&limit={}",
                window.as_str(),
                self.limit
            ),
        }
    }
}

/// Highest-scoring post that passes the filter and has not been seen.
pub fn select_candidate(
    mut posts: Vec<RedditPost>,
    strategy: &SelectionStrategy,
    seen: &SeenStore,
) -> Option<Thread> {
    posts.sort_by(|a, b| b.score.cmp(&a.score));
    posts
        .into_iter()
        .filter(|post| {
            let keep = strategy.filter.accepts(post) && !seen.contains(&post.id);
            if !keep {
                debug!("Skipping post (filtered or already used): {}", post.title);
            }
            keep
        })
        .map(Thread::from)
        .next()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentQuery {
    pub limit: usize,
    pub min_len: usize,
    pub max_len: usize,
}

/// Keeps top-level comments in listing order until `limit` qualify.
pub fn select_comments(
    children: Vec<RedditChild<RedditComment>>,
    query: &CommentQuery,
) -> Vec<Comment> {
    let mut comments = Vec::new();
    for child in children {
        if comments.len() >= query.limit {
            break;
        }
        if child.kind != "t1" {
            continue;
        }
        let raw = child.data;
        if raw.stickied || matches!(raw.body.trim(), "[removed]" | "[deleted]") {
            continue;
        }
        let raw_len = raw.body.chars().count();
        if raw_len < query.min_len || raw_len > query.max_len {
            continue;
        }
        let body = sanitize_text(&raw.body);
        if body.is_empty() {
            continue;
        }
        comments.push(Comment {
            id: raw.id,
            body,
            permalink: raw.permalink,
        });
    }
    comments
}

pub fn comment_url(permalink: &str) -> String {
    format!("{REDDIT_BASE}{permalink}")
}

/// Where candidate threads and their comments come from.
#[async_trait]
pub trait ThreadSource {
    /// Best unseen thread for `strategy`, if any.
    async fn fetch_candidate_thread(
        &self,
        subreddit: &str,
        strategy: &SelectionStrategy,
        seen: &SeenStore,
    ) -> anyhow::Result<Option<Thread>>;

    async fn fetch_top_comments(
        &self,
        thread: &Thread,
        query: &CommentQuery,
    ) -> anyhow::Result<Vec<Comment>>;
}

pub struct RedditClient {
    client: reqwest::Client,
}

impl RedditClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> anyhow::Result<T> {
        debug!("GET {}", url);
        let res = self
            .client
            .get(url)
            .header(USER_AGENT, BOT_USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(serde_json::from_str(&res)?)
    }
}

#[async_trait]
impl ThreadSource for RedditClient {
    async fn fetch_candidate_thread(
        &self,
        subreddit: &str,
        strategy: &SelectionStrategy,
        seen: &SeenStore,
    ) -> anyhow::Result<Option<Thread>> {
        let url = strategy.listing_url(subreddit);
        info!("Fetching candidates from r/{} ({:?})", subreddit, strategy.window);
        let listing: RedditListing<RedditPost> = self.get_json(&url).await?;
        let posts: Vec<RedditPost> = listing.data.children.into_iter().map(|c| c.data).collect();
        info!("Received {} candidate posts", posts.len());

        let chosen = select_candidate(posts, strategy, seen);
        if let Some(thread) = &chosen {
            info!("Chosen thread: {} -- Score: {}", thread.title, thread.score);
        }
        Ok(chosen)
    }

    async fn fetch_top_comments(
        &self,
        thread: &Thread,
        query: &CommentQuery,
    ) -> anyhow::Result<Vec<Comment>> {
        let url = format!("{REDDIT_BASE}/comments/{}.json?sort=top&depth=1", thread.id);
        // [post listing, comment listing]
        let (_, comments): (serde_json::Value, RedditListing<RedditComment>) =
            self.get_json(&url).await?;
        let selected = select_comments(comments.data.children, query);
        info!("{} comments are chosen", selected.len());
        Ok(selected)
    }
}
