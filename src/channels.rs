//! Channel index built from the archive layout on disk.
//!
//! Videos archived with a whole channel live under
//! `<files_path>/channels/<channel id>/…`; those channels are "full" and get
//! their own channel page. Every other sidecar in the tree is grouped into the
//! catch-all `other` channel.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::metadata::{METADATA_SUFFIX, base_stem};

pub const FULL_CHANNELS_DIR: &str = "channels";
pub const OTHER_CHANNEL: &str = "other";
const OTHER_CHANNEL_NAME: &str = "Other";

/// One archived video: the directory holding it and its sidecar filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEntry {
    pub root: PathBuf,
    pub file: String,
}

impl VideoEntry {
    pub fn new(root: impl Into<PathBuf>, file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            file: file.into(),
        }
    }

    /// Sidecar filename without `.info.json`; every sibling asset starts with it.
    pub fn base(&self) -> &str {
        base_stem(&self.file)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(&self.file)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Channel {
    pub name: String,
    pub videos: Vec<VideoEntry>,
}

/// Channels keyed by id, iterated in a stable order.
pub type ChannelMap = BTreeMap<String, Channel>;

/// Decides whether a video directory belongs to a fully archived channel.
pub trait ChannelClassifier {
    fn is_full_channel(&self, root: &Path) -> bool;
}

/// Classifies roots by the `channels/<id>` directory convention.
#[derive(Debug, Clone)]
pub struct ChannelLayout {
    channels_root: PathBuf,
}

impl ChannelLayout {
    pub fn new(files_path: &Path) -> Self {
        Self {
            channels_root: files_path.join(FULL_CHANNELS_DIR),
        }
    }

    /// Channel id for roots inside `channels/<id>`, `None` elsewhere.
    pub fn channel_key(&self, root: &Path) -> Option<String> {
        let relative = root.strip_prefix(&self.channels_root).ok()?;
        match relative.components().next()? {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        }
    }
}

impl ChannelClassifier for ChannelLayout {
    fn is_full_channel(&self, root: &Path) -> bool {
        self.channel_key(root).is_some()
    }
}

/// The few sidecar fields needed to name a channel.
#[derive(Deserialize)]
struct ChannelInfo {
    channel: Option<String>,
    uploader: Option<String>,
}

/// Walks `files_path` for `*.info.json` sidecars and groups them by channel.
///
/// Sidecars are only opened to name full channels; a sidecar that fails to
/// parse is still listed so the page builder reports it.
pub fn discover_channels(files_path: &Path) -> Result<ChannelMap> {
    let mut channels = ChannelMap::new();
    if !files_path.exists() {
        warn!("files path {} does not exist", files_path.display());
        return Ok(channels);
    }

    let layout = ChannelLayout::new(files_path);
    for entry in WalkDir::new(files_path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("skipping unreadable path: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
    {
        let file = entry.file_name().to_string_lossy();
        if !file.ends_with(METADATA_SUFFIX) {
            continue;
        }
        let Some(root) = entry.path().parent() else {
            continue;
        };

        let (key, is_full) = match layout.channel_key(root) {
            Some(key) => (key, true),
            None => (OTHER_CHANNEL.to_string(), false),
        };
        let channel = channels.entry(key.clone()).or_default();
        if channel.name.is_empty() {
            channel.name = if is_full {
                read_channel_name(entry.path()).unwrap_or_else(|| key.clone())
            } else {
                OTHER_CHANNEL_NAME.to_string()
            };
        }
        channel.videos.push(VideoEntry::new(root, file.into_owned()));
    }

    for (key, channel) in &channels {
        debug!("discovered channel {key} ({}) with {} video(s)", channel.name, channel.videos.len());
    }
    Ok(channels)
}

fn read_channel_name(path: &Path) -> Option<String> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!("could not open {}: {err}", path.display());
            return None;
        }
    };
    match serde_json::from_reader::<_, ChannelInfo>(BufReader::new(file)) {
        Ok(info) => info.channel.or(info.uploader),
        Err(err) => {
            warn!("could not parse {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn layout_classifies_channel_roots() {
        let layout = ChannelLayout::new(Path::new("/data/yt"));
        assert!(layout.is_full_channel(Path::new("/data/yt/channels/UC1")));
        assert!(layout.is_full_channel(Path::new("/data/yt/channels/UC1/2023")));
        assert!(!layout.is_full_channel(Path::new("/data/yt/channels")));
        assert!(!layout.is_full_channel(Path::new("/data/yt/misc")));
        assert_eq!(
            layout.channel_key(Path::new("/data/yt/channels/UC1/2023")).as_deref(),
            Some("UC1")
        );
    }

    #[test]
    fn video_entry_base_strips_suffix() {
        let entry = VideoEntry::new("/data", "clip [abc].info.json");
        assert_eq!(entry.base(), "clip [abc]");
        assert_eq!(entry.metadata_path(), PathBuf::from("/data/clip [abc].info.json"));
    }

    #[test]
    fn discover_groups_by_channel_directory() -> Result<()> {
        let temp = tempdir()?;
        let full = temp.path().join("channels").join("UC1");
        let misc = temp.path().join("misc");
        fs::create_dir_all(&full)?;
        fs::create_dir_all(&misc)?;
        fs::write(full.join("a.info.json"), r#"{"channel": "First Channel"}"#)?;
        fs::write(full.join("b.info.json"), "not json")?;
        fs::write(full.join("a.mp4"), "")?;
        fs::write(misc.join("c.info.json"), r#"{"uploader": "Someone"}"#)?;

        let channels = discover_channels(temp.path())?;
        assert_eq!(channels.len(), 2);

        let first = &channels["UC1"];
        assert_eq!(first.name, "First Channel");
        let files: Vec<&str> = first.videos.iter().map(|video| video.file.as_str()).collect();
        assert_eq!(files, ["a.info.json", "b.info.json"]);

        let other = &channels[OTHER_CHANNEL];
        assert_eq!(other.name, OTHER_CHANNEL_NAME);
        assert_eq!(other.videos, vec![VideoEntry::new(&misc, "c.info.json")]);
        Ok(())
    }

    #[test]
    fn discover_tolerates_missing_root() -> Result<()> {
        let temp = tempdir()?;
        let channels = discover_channels(&temp.path().join("absent"))?;
        assert!(channels.is_empty());
        Ok(())
    }
}
