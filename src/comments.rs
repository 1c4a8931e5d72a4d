//! Comment threads rendered onto their own page next to each video.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ProcessingError;
use crate::util::{escape, no_traverse};

/// Produces the comments fragment for a video. An empty fragment means the
/// video has no comments and no comments page is written.
pub trait CommentsRenderer {
    fn render(&self, escaped_title: &str, video_id: &str) -> Result<(String, usize), ProcessingError>;
}

/// Used when no comment archive is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoComments;

impl CommentsRenderer for NoComments {
    fn render(&self, _escaped_title: &str, _video_id: &str) -> Result<(String, usize), ProcessingError> {
        Ok((String::new(), 0))
    }
}

/// Reads yt-dlp comment dumps stored as `<root>/<video id>.json`.
#[derive(Debug, Clone)]
pub struct CommentsDir {
    root: PathBuf,
}

/// One entry of yt-dlp's `comments` array.
#[derive(Debug, Clone, Deserialize)]
struct RawComment {
    id: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    like_count: Option<i64>,
    #[serde(default)]
    timestamp: Option<i64>,
    /// `"root"` for top-level comments, otherwise the parent comment id.
    #[serde(default)]
    parent: Option<String>,
}

impl CommentsDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, video_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", no_traverse(video_id)))
    }

    fn load(&self, path: &Path) -> Result<Option<Vec<RawComment>>, ProcessingError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(ProcessingError::Comments {
                    path: path.to_path_buf(),
                    message: err.to_string(),
                });
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| ProcessingError::Comments {
                path: path.to_path_buf(),
                message: err.to_string(),
            })
    }
}

impl CommentsRenderer for CommentsDir {
    fn render(&self, escaped_title: &str, video_id: &str) -> Result<(String, usize), ProcessingError> {
        let path = self.path_for(video_id);
        let Some(comments) = self.load(&path)? else {
            return Ok((String::new(), 0));
        };
        if comments.is_empty() {
            return Ok((String::new(), 0));
        }

        // Replies whose parent is not in the dump are shown at the top level.
        let known: HashSet<&str> = comments.iter().map(|c| c.id.as_str()).collect();
        let mut thread = Thread {
            comments: &comments,
            children: HashMap::new(),
            rendered: vec![false; comments.len()],
        };
        let mut top_level = Vec::new();
        for (index, comment) in comments.iter().enumerate() {
            match comment.parent.as_deref() {
                Some(parent) if parent != "root" && known.contains(parent) && parent != comment.id => {
                    thread.children.entry(parent).or_default().push(index);
                }
                _ => top_level.push(index),
            }
        }

        let mut html = format!(
            "<div class=\"comments\">\n<h2>Comments on {escaped_title}</h2>\n"
        );
        for index in top_level {
            thread.render(index, &mut html, 0);
        }
        // Parent cycles never reach the top level; each cycle starts a thread
        // at its first comment in dump order.
        for index in 0..comments.len() {
            thread.render(index, &mut html, 0);
        }
        html.push_str("</div>\n");
        Ok((html, comments.len()))
    }
}

// yt-dlp threads are one level deep, but dumps from other tools nest further.
const MAX_DEPTH: usize = 32;

struct Thread<'a> {
    comments: &'a [RawComment],
    children: HashMap<&'a str, Vec<usize>>,
    rendered: Vec<bool>,
}

impl Thread<'_> {
    /// Renders a comment and its replies. Each comment is emitted at most once.
    fn render(&mut self, index: usize, html: &mut String, depth: usize) {
        if self.rendered[index] {
            return;
        }
        self.rendered[index] = true;

        let comments = self.comments;
        let comment = &comments[index];
        let author = escape(comment.author.as_deref().unwrap_or("Unknown"));
        let text = escape(comment.text.as_deref().unwrap_or("")).replace('\n', "<br>");
        let mut details = Vec::new();
        if let Some(likes) = comment.like_count {
            details.push(format!("{likes} likes"));
        }
        if let Some(date) = comment.timestamp.and_then(timestamp_to_date) {
            details.push(date);
        }

        html.push_str("<div class=\"comment\">\n");
        html.push_str(&format!("<p class=\"author\">{author}</p>\n"));
        html.push_str(&format!("<p class=\"text\">{text}</p>\n"));
        if !details.is_empty() {
            html.push_str(&format!("<p class=\"meta\">{}</p>\n", details.join(" &middot; ")));
        }
        // Replies past the depth limit are picked up as threads of their own.
        let replies = match self.children.get(comment.id.as_str()) {
            Some(replies) if depth < MAX_DEPTH => replies.clone(),
            _ => Vec::new(),
        };
        let pending: Vec<usize> = replies.into_iter().filter(|&reply| !self.rendered[reply]).collect();
        if !pending.is_empty() {
            html.push_str("<div class=\"replies\">\n");
            for reply in pending {
                self.render(reply, html, depth + 1);
            }
            html.push_str("</div>\n");
        }
        html.push_str("</div>\n");
    }
}

fn timestamp_to_date(timestamp: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(timestamp, 0).map(|datetime| datetime.format("%Y-%m-%d").to_string())
}
