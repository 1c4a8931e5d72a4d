//! Named page templates with `{key}` placeholders.
//!
//! Syntax follows the usual format-string rules: `{name}` is replaced by the
//! value registered under `name`, `{{` and `}}` produce literal braces. There
//! is no control flow; anything conditional is rendered into a fragment before
//! substitution.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::error::ProcessingError;

pub const BASE_TEMPLATE: &str = "base";
pub const VIDEO_TEMPLATE: &str = "video";

/// Placeholders the page shell may use.
pub const BASE_KEYS: &[&str] = &["title", "meta", "content"];

/// Placeholders the video body may use.
pub const VIDEO_KEYS: &[&str] = &[
    "title",
    "ytlink",
    "description",
    "views",
    "uploader_url",
    "uploader_id",
    "uploader",
    "date",
    "video",
    "thumbnail",
    "download",
    "comments",
];

const BUILTIN_BASE: &str = include_str!("../templates/base.html");
const BUILTIN_VIDEO: &str = include_str!("../templates/video.html");

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut key = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => bail!("template {name}: unterminated placeholder"),
                            Some(ch) => key.push(ch),
                        }
                    }
                    let key = key.trim();
                    if key.is_empty() {
                        bail!("template {name}: empty placeholder");
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(key.to_string()));
                }
                '}' => bail!("template {name}: single '}}' outside a placeholder"),
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            name: name.to_string(),
            segments,
        })
    }

    /// Distinct placeholder names used by this template.
    pub fn placeholders(&self) -> BTreeSet<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(key) => Some(key.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Substitutes every placeholder. Extra values are ignored; a placeholder
    /// without a value is an error.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, ProcessingError> {
        let lookup: HashMap<&str, &str> = values.iter().copied().collect();
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(key) => {
                    let value = lookup.get(key.as_str()).ok_or_else(|| ProcessingError::Template {
                        template: self.name.clone(),
                        message: format!("no value for placeholder {{{key}}}"),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    fn ensure_known_keys(&self, allowed: &[&str]) -> Result<()> {
        let unknown: Vec<&str> = self
            .placeholders()
            .into_iter()
            .filter(|key| !allowed.contains(key))
            .collect();
        if !unknown.is_empty() {
            bail!(
                "template {} uses unknown placeholder(s): {}",
                self.name,
                unknown.join(", ")
            );
        }
        Ok(())
    }
}

/// The two templates every page run needs.
#[derive(Debug, Clone)]
pub struct Templates {
    pub base: Template,
    pub video: Template,
}

impl Templates {
    /// Templates compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_sources(BUILTIN_BASE, BUILTIN_VIDEO)
    }

    /// Reads `base.html` and `video.html` from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let read = |name: &str| {
            let path = dir.join(format!("{name}.html"));
            fs::read_to_string(&path).with_context(|| format!("Reading template {}", path.display()))
        };
        Self::from_sources(&read(BASE_TEMPLATE)?, &read(VIDEO_TEMPLATE)?)
    }

    pub fn from_sources(base: &str, video: &str) -> Result<Self> {
        let base = Template::parse(BASE_TEMPLATE, base)?;
        let video = Template::parse(VIDEO_TEMPLATE, video)?;
        base.ensure_known_keys(BASE_KEYS)?;
        video.ensure_known_keys(VIDEO_KEYS)?;
        Ok(Self { base, video })
    }

    /// Wraps `content` in the page shell.
    pub fn page(&self, title: &str, meta: &str, content: &str) -> Result<String, ProcessingError> {
        self.base
            .render(&[("title", title), ("meta", meta), ("content", content)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn render_substitutes_and_unescapes_braces() {
        let template = Template::parse("t", "<style>p {{ color: red }}</style>{title}!").unwrap();
        assert_eq!(template.render(&[("title", "Hi")]).unwrap(), "<style>p { color: red }</style>Hi!");
    }

    #[test]
    fn render_reports_missing_value() {
        let template = Template::parse("t", "{title} {views}").unwrap();
        let err = template.render(&[("title", "x")]).unwrap_err();
        assert!(err.to_string().contains("{views}"));
    }

    #[test]
    fn parse_rejects_unbalanced_braces() {
        assert!(Template::parse("t", "{title").is_err());
        assert!(Template::parse("t", "oops }").is_err());
        assert!(Template::parse("t", "{}").is_err());
    }

    #[test]
    fn builtin_templates_use_known_keys() {
        let templates = Templates::builtin().unwrap();
        assert_eq!(templates.base.placeholders().len(), BASE_KEYS.len());
        assert!(templates.video.placeholders().contains("download"));
    }

    #[test]
    fn from_sources_rejects_unknown_placeholder() {
        let err = Templates::from_sources("{title}{meta}{content}", "{title}{likes}").unwrap_err();
        assert!(err.to_string().contains("likes"));
    }

    #[test]
    fn load_reads_template_directory() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("base.html"), "<title>{title}</title>{meta}{content}")?;
        fs::write(dir.path().join("video.html"), "<h1>{title}</h1>{download}")?;
        let templates = Templates::load(dir.path())?;
        let page = templates.page("T", "", "body")?;
        assert_eq!(page, "<title>T</title>body");
        Ok(())
    }
}
