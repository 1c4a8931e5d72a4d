#![forbid(unsafe_code)]

//! Regenerates the static video pages for the whole archive. Meant to run
//! after every download pass, e.g. from the same cron job.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hobune_tools::channels::{ChannelLayout, discover_channels};
use hobune_tools::comments::{CommentsDir, CommentsRenderer, NoComments};
use hobune_tools::config::{
    DEFAULT_CONFIG_PATH, SiteConfig, read_config, site_config_from,
};
use hobune_tools::templates::Templates;
use hobune_tools::videos::{PageContext, create_video_pages};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Render static HTML pages for archived videos.")]
struct Cli {
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH, help = "Path to the config file (env format, or TOML when ending in .toml)")]
    config: PathBuf,
    #[arg(
        long = "files-path",
        value_name = "PATH",
        help = "Directory holding the archived media"
    )]
    files_path: Option<PathBuf>,
    #[arg(
        long = "files-web-path",
        value_name = "URL",
        help = "Public URL prefix serving the files path (default /files)"
    )]
    files_web_path: Option<String>,
    #[arg(long = "web-root", value_name = "URL", help = "Base URL of the site (default /)")]
    web_root: Option<String>,
    #[arg(
        short = 'o',
        long = "output",
        value_name = "PATH",
        help = "Directory receiving the generated pages"
    )]
    output: Option<PathBuf>,
    #[arg(
        long = "templates",
        value_name = "PATH",
        help = "Directory with base.html and video.html (default: built-in templates)"
    )]
    templates: Option<PathBuf>,
    #[arg(
        long = "comments",
        value_name = "PATH",
        help = "Directory with <video id>.json comment dumps"
    )]
    comments: Option<PathBuf>,
    #[arg(
        long = "html-ext",
        value_name = "EXT",
        help = "Suffix for links between pages (default .html, empty for pretty URLs)"
    )]
    html_ext: Option<String>,
    #[arg(short = 'v', long = "verbose", help = "Log every channel processed")]
    verbose: bool,
}

impl Cli {
    /// Config file values overridden by any flag given on the command line.
    fn site_config(&self) -> Result<SiteConfig> {
        let mut cfg = read_config(&self.config)?.unwrap_or_default();
        if let Some(path) = &self.files_path {
            cfg.files_path = Some(path.clone());
        }
        if let Some(prefix) = &self.files_web_path {
            cfg.files_web_path = Some(prefix.clone());
        }
        if let Some(root) = &self.web_root {
            cfg.web_root = Some(root.clone());
        }
        if let Some(path) = &self.output {
            cfg.output_path = Some(path.clone());
        }
        if let Some(path) = &self.templates {
            cfg.templates_path = Some(path.clone());
        }
        if let Some(path) = &self.comments {
            cfg.comments_path = Some(path.clone());
        }
        if let Some(ext) = &self.html_ext {
            cfg.html_ext = Some(ext.clone());
        }
        site_config_from(cfg, &self.config)
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "hobune_tools=debug,build_pages=debug"
    } else {
        "hobune_tools=info,build_pages=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.site_config()?;
    info!("Library root: {}", config.files_path.display());
    info!("Output root: {}", config.output_path.display());

    let templates = match &config.templates_path {
        Some(dir) => Templates::load(dir)?,
        None => Templates::builtin()?,
    };

    let channels = discover_channels(&config.files_path)
        .with_context(|| format!("indexing {}", config.files_path.display()))?;
    let video_count: usize = channels.values().map(|channel| channel.videos.len()).sum();
    info!("Found {} video(s) in {} channel(s)", video_count, channels.len());

    let comments: Box<dyn CommentsRenderer> = match &config.comments_path {
        Some(dir) => Box::new(CommentsDir::new(dir)),
        None => Box::new(NoComments),
    };
    let layout = ChannelLayout::new(&config.files_path);
    let ctx = PageContext {
        config: &config,
        templates: &templates,
        html_ext: &config.html_ext,
        classifier: &layout,
        comments: comments.as_ref(),
    };

    let report = create_video_pages(&ctx, &channels)?;
    println!(
        "Wrote {} video page(s) and {} comment page(s); {} video(s) failed.",
        report.pages, report.comment_pages, report.failed
    );
    Ok(())
}
