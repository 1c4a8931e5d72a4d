//! Small string helpers shared by every page generator.

use std::borrow::Cow;

/// HTML-escapes `& < > " '` so the value is safe in text and quoted attributes.
pub fn escape(value: &str) -> Cow<'_, str> {
    html_escape::encode_quoted_attribute(value)
}

/// Percent-encodes a URL path segment by segment, leaving `/` intact.
pub fn quote_url(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Turns an externally sourced id into a single, non-hidden filename
/// component so it cannot climb out of the output directory.
pub fn no_traverse(id: &str) -> String {
    let flattened: String = id
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    if flattened.is_empty() || flattened.starts_with('.') {
        format!("_{flattened}")
    } else {
        flattened
    }
}

/// First `limit` characters of `value`, never splitting a code point.
pub fn truncate_chars(value: &str, limit: usize) -> &str {
    match value.char_indices().nth(limit) {
        Some((offset, _)) => &value[..offset],
        None => value,
    }
}

/// Renders `<meta>` tags for the page head. A `description` entry is also
/// emitted as `og:description` for link previews.
pub fn generate_meta_tags(tags: &[(&str, &str)]) -> String {
    let mut html = String::new();
    for (name, content) in tags {
        let content = escape(content);
        html.push_str(&format!(
            "<meta name=\"{}\" content=\"{content}\">\n",
            escape(name)
        ));
        if *name == "description" {
            html.push_str(&format!(
                "<meta property=\"og:description\" content=\"{content}\">\n"
            ));
        }
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_covers_quotes() {
        let escaped = escape(r#"<a href="x">Tom's</a> & co"#);
        assert!(escaped.starts_with("&lt;a href=&quot;x&quot;&gt;Tom"));
        assert!(escaped.ends_with("s&lt;/a&gt; &amp; co"));
        assert!(!escaped.contains('\''));
    }

    #[test]
    fn quote_url_keeps_slashes() {
        assert_eq!(
            quote_url("/dl/files/My Video [abc].mp4"),
            "/dl/files/My%20Video%20%5Babc%5D.mp4"
        );
        assert_eq!(quote_url("/default.png"), "/default.png");
    }

    #[test]
    fn no_traverse_flattens_separators() {
        assert_eq!(no_traverse("../../etc/passwd"), "_.._.._etc_passwd");
        assert_eq!(no_traverse("dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(no_traverse(".hidden"), "_.hidden");
        assert_eq!(no_traverse(""), "_");
    }

    #[test]
    fn truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 256), "short");
    }

    #[test]
    fn meta_tags_escape_content() {
        let html = generate_meta_tags(&[("description", "a \"quoted\" text"), ("author", "Me")]);
        assert!(html.contains("<meta name=\"description\" content=\"a &quot;quoted&quot; text\">"));
        assert!(html.contains("<meta property=\"og:description\""));
        assert!(html.contains("<meta name=\"author\" content=\"Me\">"));
    }
}
