//! Video page generation.
//!
//! Each sidecar becomes `videos/<id>.html`: metadata, the player, and a column
//! of download buttons for every sibling file found next to the sidecar. The
//! sibling probes run in a fixed order so repeated builds over the same
//! archive produce byte-identical pages. A few probes intentionally repeat or
//! overwrite earlier results; existing sites link to those buttons, so the
//! output is kept stable rather than tidied.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::channels::{ChannelClassifier, ChannelMap, OTHER_CHANNEL, VideoEntry};
use crate::comments::CommentsRenderer;
use crate::config::SiteConfig;
use crate::error::ProcessingError;
use crate::metadata::VideoInfo;
use crate::templates::Templates;
use crate::util::{escape, generate_meta_tags, no_traverse, quote_url, truncate_chars};

/// Placeholder image used when a video has no thumbnail on disk.
pub const DEFAULT_THUMBNAIL: &str = "/default.png";
/// Web prefix under which the HTTP server offers files as attachments.
pub const DOWNLOAD_PREFIX: &str = "/dl";
const DESCRIPTION_META_CHARS: usize = 256;

const MEDIA_EXTENSIONS: [&str; 3] = ["mp4", "webm", "mkv"];
const ALT_VIDEO_EXTENSIONS: [&str; 2] = ["webm", "mkv"];
const THUMBNAIL_EXTENSIONS: [&str; 3] = ["webp", "jpg", "png"];
const LIVE_CHAT_EXTENSIONS: [&str; 2] = ["7z", "zip"];
const AUDIO_EXTENSIONS: [&str; 3] = ["m4a", "mka", "ogg"];

/// Filenames of one directory, sorted.
pub type DirListing = BTreeSet<String>;

/// Directory listings shared by all videos of a run. Each directory is read
/// once; archives keep many videos per directory.
#[derive(Debug, Default)]
pub struct DirListingCache {
    listings: HashMap<PathBuf, DirListing>,
}

impl DirListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, root: &Path) -> Result<&DirListing, ProcessingError> {
        if !self.listings.contains_key(root) {
            let listing = list_dir(root)?;
            self.listings.insert(root.to_path_buf(), listing);
        }
        Ok(&self.listings[root])
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

fn list_dir(root: &Path) -> Result<DirListing, ProcessingError> {
    let listing_error = |source| ProcessingError::DirectoryListing {
        path: root.to_path_buf(),
        source,
    };
    let mut files = DirListing::new();
    for entry in fs::read_dir(root).map_err(listing_error)? {
        let entry = entry.map_err(listing_error)?;
        files.insert(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(files)
}

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    pub pages: usize,
    pub comment_pages: usize,
    pub failed: usize,
}

/// Sibling files of one video, seen through the directory listing.
pub struct VideoAssets<'a> {
    config: &'a SiteConfig,
    root: &'a Path,
    base: &'a str,
    files: &'a DirListing,
}

impl<'a> VideoAssets<'a> {
    pub fn new(config: &'a SiteConfig, root: &'a Path, base: &'a str, files: &'a DirListing) -> Self {
        Self {
            config,
            root,
            base,
            files,
        }
    }

    fn sibling(&self, ext: &str) -> Option<String> {
        let name = format!("{}.{ext}", self.base);
        self.files.contains(&name).then_some(name)
    }

    fn url(&self, file: &str) -> String {
        self.config.web_path(self.root, file)
    }

    /// Siblings starting with the base stem and ending in `suffix`, in
    /// listing order.
    fn with_suffix<'s>(&'s self, suffix: &'s str) -> impl Iterator<Item = &'a String> + 's {
        self.files
            .iter()
            .filter(move |name| name.ends_with(suffix) && name.starts_with(self.base))
    }

    /// Public URL of the playable file. The first of mp4, webm, mkv found on
    /// disk wins; with none present the mp4 URL is assumed.
    pub fn media_url(&self) -> String {
        MEDIA_EXTENSIONS
            .iter()
            .find_map(|ext| self.sibling(ext))
            .map(|file| self.url(&file))
            .unwrap_or_else(|| self.url(&format!("{}.mp4", self.base)))
    }

    /// Public URL of the thumbnail. Every extension is probed and the last one
    /// present wins, so png beats jpg beats webp.
    pub fn thumbnail_url(&self) -> String {
        let mut thumbnail = DEFAULT_THUMBNAIL.to_string();
        for ext in THUMBNAIL_EXTENSIONS {
            if let Some(file) = self.sibling(ext) {
                thumbnail = self.url(&file);
            }
        }
        thumbnail
    }

    /// Download buttons for the video and every sibling asset, in display
    /// order.
    pub fn download_links(&self, media_url: &str, thumbnail_url: &str) -> String {
        let mut html = generate_download_button("Download video", media_url);

        // Alternate containers replace the single button with a pair; when
        // both exist only the mkv pair remains.
        for ext in ALT_VIDEO_EXTENSIONS {
            if let Some(file) = self.sibling(ext) {
                html = generate_download_button("Download mp4", media_url)
                    + &generate_download_button(&format!("Download {ext}"), &self.url(&file));
            }
        }

        if let Some(file) = self.sibling("description") {
            html += &generate_download_button("Description", &self.url(&file));
        }

        if thumbnail_url != DEFAULT_THUMBNAIL {
            html += &generate_download_button("Thumbnail", thumbnail_url);
        }

        self.push_vtt_subtitles(&mut html);

        for ext in LIVE_CHAT_EXTENSIONS {
            for file in self.with_suffix(ext).filter(|name| name.contains("live_chat")) {
                html += &generate_download_button("Live Chat", &self.url(file));
            }
        }

        for ext in AUDIO_EXTENSIONS {
            if let Some(file) = self.sibling(ext) {
                html += &generate_download_button(&format!("Audio Only ({ext})"), &self.url(&file));
            }
        }

        // Subtitles are listed a second time after the audio buttons.
        self.push_vtt_subtitles(&mut html);

        for file in self.with_suffix(".srt") {
            html += &generate_download_button("Subtitles (AI-Generated)", &self.url(file));
        }

        if let Some(file) = self.sibling("info.json") {
            html += &generate_download_button("Info JSON", &self.url(&file));
        }

        if let Some(file) = self.sibling("torrent") {
            html += &generate_download_button("Torrent", &self.url(&file));
        }

        html
    }

    fn push_vtt_subtitles(&self, html: &mut String) {
        for file in self.with_suffix(".vtt") {
            let label = format!("Subtitles ({})", subtitle_tag(self.base, file));
            *html += &generate_download_button(&label, &self.url(file));
        }
    }
}

/// Language or kind tag of a subtitle file: `clip.en.vtt` with base `clip`
/// yields `en`. The character right after the base is skipped whatever it is,
/// since the probe only checks that the name starts with the base.
pub fn subtitle_tag<'f>(base: &str, file: &'f str) -> &'f str {
    file.strip_prefix(base)
        .and_then(|rest| {
            let mut chars = rest.chars();
            chars.next()?;
            chars.as_str().strip_suffix(".vtt")
        })
        .unwrap_or("")
}

/// One download button linking to `url` under [`DOWNLOAD_PREFIX`].
pub fn generate_download_button(name: &str, url: &str) -> String {
    let full_url = quote_url(&format!("{DOWNLOAD_PREFIX}{url}"));
    format!(
        r#"
    <a href="{full_url}">
        <div class="button download">
            <i class="icon download"></i> {}
        </div>
    </a>
    <br>
    "#,
        escape(name)
    )
}

/// Everything the page builder needs besides the channel list.
pub struct PageContext<'a> {
    pub config: &'a SiteConfig,
    pub templates: &'a Templates,
    pub html_ext: &'a str,
    pub classifier: &'a dyn ChannelClassifier,
    pub comments: &'a dyn CommentsRenderer,
}

/// Writes one page per video of every channel.
///
/// A video whose metadata cannot be read or parsed is logged and skipped;
/// listing, template and write failures abort the run.
pub fn create_video_pages(ctx: &PageContext<'_>, channels: &ChannelMap) -> Result<BuildReport> {
    for dir in [ctx.config.videos_dir(), ctx.config.comments_dir()] {
        fs::create_dir_all(&dir).with_context(|| format!("creating output directory {}", dir.display()))?;
    }

    let mut listings = DirListingCache::new();
    let mut report = BuildReport::default();

    for (key, channel) in channels {
        debug!("Creating video pages for {} ({key})", channel.name);
        for entry in &channel.videos {
            let files = listings.get(&entry.root)?;
            match create_video_page(ctx, entry, files) {
                Ok(comment_page) => {
                    report.pages += 1;
                    if comment_page {
                        report.comment_pages += 1;
                    }
                }
                Err(err) if err.is_recoverable() => {
                    error!(file = %entry.file, root = %entry.root.display(), "Error processing {}: {err}", entry.file);
                    report.failed += 1;
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("processing {}", entry.metadata_path().display()));
                }
            }
        }
    }

    info!(
        pages = report.pages,
        comment_pages = report.comment_pages,
        failed = report.failed,
        directories = listings.len(),
        "video pages written"
    );
    Ok(report)
}

/// Renders and writes a single video page. Returns whether a comments page
/// was written as well.
fn create_video_page(
    ctx: &PageContext<'_>,
    entry: &VideoEntry,
    files: &DirListing,
) -> Result<bool, ProcessingError> {
    let config = ctx.config;
    let html_ext = ctx.html_ext;
    let base = entry.base();
    let info = VideoInfo::load(&entry.metadata_path())?;

    let page_meta = generate_meta_tags(&[
        ("description", truncate_chars(&info.description, DESCRIPTION_META_CHARS)),
        ("author", info.uploader.as_str()),
    ]);

    let title = escape(&info.title).into_owned();
    let (comments_html, comments_count) = ctx.comments.render(&title, &info.id)?;
    let mut comments_link = String::new();
    let wrote_comments = !comments_html.is_empty();
    if wrote_comments {
        let page = ctx.templates.page(
            &escape(&format!("{} - Comments", info.title)),
            &page_meta,
            &comments_html,
        )?;
        write_page(&config.comments_dir(), &info.id, &page)?;
        comments_link = format!(
            r#"<p class="comments"><a href="/comments/{}{html_ext}">View comments ({comments_count})</a></p>"#,
            quote_url(&no_traverse(&info.id))
        );
    }

    let assets = VideoAssets::new(config, &entry.root, base, files);
    let media_url = assets.media_url();
    let thumbnail_url = assets.thumbnail_url();
    let download = assets.download_links(&media_url, &thumbnail_url);

    let uploader_key = escape(info.uploader_key()?).into_owned();
    let uploader_url = if ctx.classifier.is_full_channel(&entry.root) {
        format!("{}channels/{uploader_key}{html_ext}", config.web_root)
    } else {
        format!("{}channels/{OTHER_CHANNEL}{html_ext}", config.web_root)
    };
    let ytlink = format!(
        r#"<a class="ytlink" href=https://www.youtube.com/watch?v={}>YT</a>"#,
        escape(&info.id)
    );
    let description = escape(&info.description).replace('\n', "<br>");
    let views = info.view_count.unwrap_or_default().to_string();
    let uploader = escape(&info.uploader).into_owned();
    let date = info.display_date()?;
    let video = quote_url(&media_url);
    let thumbnail = quote_url(&thumbnail_url);

    let body = ctx.templates.video.render(&[
        ("title", title.as_str()),
        ("ytlink", ytlink.as_str()),
        ("description", description.as_str()),
        ("views", views.as_str()),
        ("uploader_url", uploader_url.as_str()),
        ("uploader_id", uploader_key.as_str()),
        ("uploader", uploader.as_str()),
        ("date", date.as_str()),
        ("video", video.as_str()),
        ("thumbnail", thumbnail.as_str()),
        ("download", download.as_str()),
        ("comments", comments_link.as_str()),
    ])?;
    let page = ctx.templates.page(&title, &page_meta, &body)?;
    write_page(&config.videos_dir(), &info.id, &page)?;
    Ok(wrote_comments)
}

fn write_page(dir: &Path, video_id: &str, html: &str) -> Result<(), ProcessingError> {
    let path = dir.join(format!("{}.html", no_traverse(video_id)));
    fs::write(&path, html).map_err(|source| ProcessingError::Write { path, source })
}
