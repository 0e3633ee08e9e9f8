//! Standalone snapshot document rendering.
//!
//! The published artifact is a self-contained HTML file: escaped title and
//! summary metadata, a base tag pointing at the asset serving root (so
//! relative asset references resolve), the cover figure, and the editor's
//! HTML body inlined verbatim.

use askama::Template;
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

pub const PUBLISH_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[day padding:none] [month repr:long] [year]");

#[derive(Debug, Clone)]
pub struct SnapshotCover {
    pub link: String,
    pub caption: String,
}

#[derive(Template)]
#[template(path = "snapshot.html")]
pub struct SnapshotDocument<'a> {
    pub title: &'a str,
    pub summary: &'a str,
    pub base_href: &'a str,
    pub cover: Option<SnapshotCover>,
    pub published_on: Option<String>,
    /// Editor output; trusted HTML, inlined with `|safe`.
    pub body: &'a str,
}

pub fn format_publish_date(at: OffsetDateTime) -> String {
    at.format(PUBLISH_DATE_FORMAT).expect("valid publish date")
}

/// Explicit slug when given, otherwise derived from the title.
pub fn derive_slug(title: &str, explicit: &str) -> String {
    let explicit = explicit.trim();
    if explicit.is_empty() {
        slug::slugify(title)
    } else {
        slug::slugify(explicit)
    }
}

pub fn snapshot_filename(slug: &str) -> String {
    format!("{slug}-post.html")
}

/// Comma-separated tag text into trimmed, non-empty tags.
pub fn parse_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn metadata_is_escaped_and_body_is_not() {
        let doc = SnapshotDocument {
            title: "Tags <b>&</b>",
            summary: "a \"quoted\" summary",
            base_href: "http://assets.local/",
            cover: None,
            published_on: None,
            body: "<p>kept as-is</p>",
        };

        let html = doc.render().expect("render");
        assert!(html.contains("Tags &lt;b&gt;&amp;&lt;/b&gt;"));
        assert!(!html.contains("a \"quoted\" summary"));
        assert!(html.contains("<p>kept as-is</p>"));
    }

    #[test]
    fn base_tag_points_at_asset_root() {
        let doc = SnapshotDocument {
            title: "T",
            summary: "",
            base_href: "http://assets.local/uploads/",
            cover: None,
            published_on: None,
            body: "",
        };

        let html = doc.render().expect("render");
        assert!(html.contains(r#"<base href="http://assets.local/uploads/">"#));
    }

    #[test]
    fn cover_figure_and_date_render_when_present() {
        let doc = SnapshotDocument {
            title: "T",
            summary: "",
            base_href: "/",
            cover: Some(SnapshotCover {
                link: "http://assets.local/c.png".to_string(),
                caption: "the cover".to_string(),
            }),
            published_on: Some(format_publish_date(datetime!(2025-10-05 12:00 UTC))),
            body: "",
        };

        let html = doc.render().expect("render");
        assert!(html.contains(r#"src="http://assets.local/c.png""#));
        assert!(html.contains("the cover"));
        assert!(html.contains("5 October 2025"));
    }

    #[test]
    fn slug_falls_back_to_title() {
        assert_eq!(derive_slug("My First Post!", ""), "my-first-post");
        assert_eq!(derive_slug("My First Post!", "  Custom Slug "), "custom-slug");
        assert_eq!(snapshot_filename("my-first-post"), "my-first-post-post.html");
    }

    #[test]
    fn tags_parse_from_comma_text() {
        assert_eq!(
            parse_tags(" vision, research ,,gnn "),
            vec!["vision", "research", "gnn"]
        );
        assert!(parse_tags("  ").is_empty());
    }
}
