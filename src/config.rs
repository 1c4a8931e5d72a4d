use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/hobune-env";
pub const DEFAULT_FILES_WEB_PATH: &str = "/files";
pub const DEFAULT_WEB_ROOT: &str = "/";
pub const DEFAULT_HTML_EXT: &str = ".html";

/// Values as found in a config file; everything is optional until
/// [`load_site_config_from`] applies defaults and checks required keys.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub files_path: Option<PathBuf>,
    pub files_web_path: Option<String>,
    pub web_root: Option<String>,
    pub output_path: Option<PathBuf>,
    pub templates_path: Option<PathBuf>,
    pub comments_path: Option<PathBuf>,
    pub html_ext: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Filesystem root holding the archived media.
    pub files_path: PathBuf,
    /// Public URL prefix that serves `files_path`.
    pub files_web_path: String,
    /// Base URL of the generated site, ending in `/`.
    pub web_root: String,
    pub output_path: PathBuf,
    pub templates_path: Option<PathBuf>,
    pub comments_path: Option<PathBuf>,
    pub html_ext: String,
}

impl SiteConfig {
    /// Public URL of `file` inside `root`, where `root` lives under
    /// `files_path`. Roots outside `files_path` keep their full path.
    /// Prefixes are compared by path component, so a trailing `/` on either
    /// setting makes no difference.
    pub fn web_path(&self, root: &Path, file: &str) -> String {
        let dir = match root.strip_prefix(&self.files_path) {
            Ok(relative) => {
                let segments: Vec<_> = relative
                    .components()
                    .map(|part| part.as_os_str().to_string_lossy())
                    .collect();
                if segments.is_empty() {
                    self.files_web_path.clone()
                } else {
                    format!(
                        "{}/{}",
                        self.files_web_path.trim_end_matches('/'),
                        segments.join("/")
                    )
                }
            }
            Err(_) => format!("{}{}", self.files_web_path, root.to_string_lossy()),
        };
        if dir.is_empty() || dir.ends_with('/') {
            format!("{dir}{file}")
        } else {
            format!("{dir}/{file}")
        }
    }

    /// Directory that receives one page per video.
    pub fn videos_dir(&self) -> PathBuf {
        self.output_path.join("videos")
    }

    pub fn comments_dir(&self) -> PathBuf {
        self.output_path.join("comments")
    }
}

pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value_raw)) = trimmed.split_once('=') {
            let value = value_raw.trim().trim_matches('"');
            match key.trim() {
                "FILES_PATH" => cfg.files_path = Some(PathBuf::from(value)),
                "FILES_WEB_PATH" => cfg.files_web_path = Some(value.to_string()),
                "WEB_ROOT" => cfg.web_root = Some(value.to_string()),
                "OUTPUT_PATH" => cfg.output_path = Some(PathBuf::from(value)),
                "TEMPLATES_PATH" => {
                    if !value.is_empty() {
                        cfg.templates_path = Some(PathBuf::from(value));
                    }
                }
                "COMMENTS_PATH" => {
                    if !value.is_empty() {
                        cfg.comments_path = Some(PathBuf::from(value));
                    }
                }
                // An empty extension is meaningful: pretty URLs without `.html`.
                "HTML_EXT" => cfg.html_ext = Some(value.to_string()),
                _ => {}
            }
        }
    }
    Ok(Some(cfg))
}

/// Same keys as the env file, lower-cased, in a TOML table.
pub fn read_toml_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let cfg: EnvConfig =
        toml::from_str(&content).with_context(|| format!("Parsing {}", path.display()))?;
    Ok(Some(cfg))
}

/// Picks the reader by extension: `.toml` files are TOML, anything else is
/// the `KEY="value"` env format.
pub fn read_config(path: &Path) -> Result<Option<EnvConfig>> {
    if path.extension().and_then(|ext| ext.to_str()) == Some("toml") {
        read_toml_config(path)
    } else {
        read_env_config(path)
    }
}

pub fn load_site_config_from(path: impl AsRef<Path>) -> Result<SiteConfig> {
    let path = path.as_ref();
    let cfg = read_config(path)?.ok_or_else(|| anyhow!("Missing config file at {}", path.display()))?;
    site_config_from(cfg, path)
}

/// Applies defaults and validates required keys. `origin` only names the
/// source in error messages.
pub fn site_config_from(cfg: EnvConfig, origin: &Path) -> Result<SiteConfig> {
    let files_path = cfg
        .files_path
        .ok_or_else(|| anyhow!("FILES_PATH not set in {}", origin.display()))?;
    let output_path = cfg
        .output_path
        .ok_or_else(|| anyhow!("OUTPUT_PATH not set in {}", origin.display()))?;
    let files_web_path = cfg
        .files_web_path
        .unwrap_or_else(|| DEFAULT_FILES_WEB_PATH.to_string());
    let mut web_root = cfg.web_root.unwrap_or_else(|| DEFAULT_WEB_ROOT.to_string());
    if !web_root.ends_with('/') {
        web_root.push('/');
    }
    let html_ext = cfg.html_ext.unwrap_or_else(|| DEFAULT_HTML_EXT.to_string());
    Ok(SiteConfig {
        files_path,
        files_web_path,
        web_root,
        output_path,
        templates_path: cfg.templates_path,
        comments_path: cfg.comments_path,
        html_ext,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn make_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    fn sample_site() -> SiteConfig {
        SiteConfig {
            files_path: PathBuf::from("/data/yt"),
            files_web_path: "/files".into(),
            web_root: "/".into(),
            output_path: PathBuf::from("/out"),
            templates_path: None,
            comments_path: None,
            html_ext: ".html".into(),
        }
    }

    #[test]
    fn read_env_config_extracts_paths() {
        let cfg = make_config(
            "# archive\nFILES_PATH=\"/data/yt\"\nOUTPUT_PATH=\"/www/site\"\nHTML_EXT=\"\"\n",
        );
        let parsed = read_env_config(cfg.path()).unwrap().unwrap();
        assert_eq!(parsed.files_path, Some(PathBuf::from("/data/yt")));
        assert_eq!(parsed.output_path, Some(PathBuf::from("/www/site")));
        assert_eq!(parsed.html_ext.as_deref(), Some(""));
    }

    #[test]
    fn load_site_config_applies_defaults() {
        let cfg = make_config("FILES_PATH=\"/m\"\nOUTPUT_PATH=\"/w\"\nWEB_ROOT=\"https://example.com\"\n");
        let site = load_site_config_from(cfg.path()).unwrap();
        assert_eq!(site.files_web_path, DEFAULT_FILES_WEB_PATH);
        assert_eq!(site.web_root, "https://example.com/");
        assert_eq!(site.html_ext, DEFAULT_HTML_EXT);
        assert!(site.templates_path.is_none());
    }

    #[test]
    fn load_site_config_requires_files_path() {
        let cfg = make_config("OUTPUT_PATH=\"/w\"\n");
        let err = load_site_config_from(cfg.path()).unwrap_err();
        assert!(err.to_string().contains("FILES_PATH"));
    }

    #[test]
    fn load_site_config_reports_missing_file() {
        let err = load_site_config_from("/nonexistent/hobune-env").unwrap_err();
        assert!(err.to_string().contains("Missing config file"));
    }

    #[test]
    fn toml_config_is_selected_by_extension() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            "files_path = \"/data/yt\"\noutput_path = \"/out\"\nfiles_web_path = \"/media\"\n"
        )
        .unwrap();
        let site = load_site_config_from(file.path()).unwrap();
        assert_eq!(site.files_path, PathBuf::from("/data/yt"));
        assert_eq!(site.files_web_path, "/media");
    }

    #[test]
    fn web_path_maps_files_root_to_prefix() {
        let site = sample_site();
        assert_eq!(
            site.web_path(Path::new("/data/yt/channels/UC1"), "clip.mp4"),
            "/files/channels/UC1/clip.mp4"
        );
        assert_eq!(
            site.web_path(Path::new("/data/yt"), "clip.mp4"),
            "/files/clip.mp4"
        );
    }

    #[test]
    fn web_path_ignores_trailing_slashes() {
        let site = SiteConfig {
            files_path: PathBuf::from("/data/yt/"),
            files_web_path: "/files/".into(),
            ..sample_site()
        };
        assert_eq!(
            site.web_path(Path::new("/data/yt/channels/UC1"), "clip.mp4"),
            "/files/channels/UC1/clip.mp4"
        );
        assert_eq!(site.web_path(Path::new("/data/yt"), "clip.mp4"), "/files/clip.mp4");
    }

    #[test]
    fn web_path_matches_whole_components_only() {
        let site = sample_site();
        assert_eq!(
            site.web_path(Path::new("/data/ytx/misc"), "clip.mp4"),
            "/files/data/ytx/misc/clip.mp4"
        );
    }
}
