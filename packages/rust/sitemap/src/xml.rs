//! XML boundary: sitemap document ⇄ [`SitemapEntry`] list.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::debug;

use sitepipe_shared::{Result, SitePipeError};

use crate::SitemapEntry;

/// Sitemap protocol namespace.
pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

const XML_PROLOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Loc,
    Lastmod,
    Changefreq,
    Priority,
}

impl Tag {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"loc" => Some(Self::Loc),
            b"lastmod" => Some(Self::Lastmod),
            b"changefreq" => Some(Self::Changefreq),
            b"priority" => Some(Self::Priority),
            _ => None,
        }
    }
}

/// Child values collected inside one `<url>` element.
#[derive(Default)]
struct UrlFields {
    loc: Option<String>,
    lastmod: Option<String>,
    changefreq: Option<String>,
    priority: Option<String>,
}

impl UrlFields {
    fn set(&mut self, tag: Tag, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let slot = match tag {
            Tag::Loc => &mut self.loc,
            Tag::Lastmod => &mut self.lastmod,
            Tag::Changefreq => &mut self.changefreq,
            Tag::Priority => &mut self.priority,
        };
        *slot = Some(text.to_string());
    }

    fn into_entry(self) -> Option<SitemapEntry> {
        Some(SitemapEntry {
            loc: self.loc?,
            lastmod: self.lastmod,
            changefreq: self.changefreq,
            priority: self.priority.and_then(|p| p.parse().ok()),
        })
    }
}

/// Parse a sitemap document.
///
/// Fails when the document is not well-formed XML or has no `<urlset>` root.
/// Comments are ignored, CDATA and character references are decoded.
/// `<url>` elements without a `<loc>` are skipped; unparsable priorities
/// become `None`.
pub fn parse_sitemap(xml: &str) -> Result<Vec<SitemapEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut saw_urlset = false;
    let mut entries = Vec::new();
    let mut current: Option<UrlFields> = None;
    let mut tag: Option<Tag> = None;
    let mut text = String::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            SitePipeError::Sitemap(format!(
                "malformed sitemap at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"urlset" => saw_urlset = true,
                b"url" if saw_urlset => current = Some(UrlFields::default()),
                name if current.is_some() => {
                    tag = Tag::from_name(name);
                    text.clear();
                }
                _ => {}
            },
            Event::Text(t) if tag.is_some() => {
                let decoded = t
                    .unescape()
                    .map_err(|e| SitePipeError::Sitemap(format!("bad text in sitemap: {e}")))?;
                text.push_str(&decoded);
            }
            Event::CData(c) if tag.is_some() => {
                text.push_str(&String::from_utf8_lossy(&c));
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"url" => {
                    if let Some(fields) = current.take() {
                        match fields.into_entry() {
                            Some(entry) => entries.push(entry),
                            None => debug!("skipping <url> without <loc>"),
                        }
                    }
                    tag = None;
                }
                name => {
                    if let (Some(open), Some(fields)) = (tag, current.as_mut()) {
                        if Tag::from_name(name) == Some(open) {
                            fields.set(open, &text);
                            tag = None;
                        }
                    }
                }
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_urlset {
        return Err(SitePipeError::Sitemap("document has no <urlset> root".into()));
    }
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render a complete sitemap document.
pub fn render_sitemap(entries: &[SitemapEntry]) -> String {
    let mut out = String::with_capacity(128 + entries.len() * 160);
    out.push_str(XML_PROLOG);
    out.push('\n');
    out.push_str(&format!("<urlset xmlns=\"{SITEMAP_NS}\">\n"));

    for entry in entries {
        out.push_str("  <url>\n");
        out.push_str(&format!("    <loc>{}</loc>\n", escape(&entry.loc)));
        if let Some(lastmod) = &entry.lastmod {
            out.push_str(&format!("    <lastmod>{}</lastmod>\n", escape(lastmod)));
        }
        if let Some(changefreq) = &entry.changefreq {
            out.push_str(&format!(
                "    <changefreq>{}</changefreq>\n",
                escape(changefreq)
            ));
        }
        if let Some(priority) = entry.priority {
            out.push_str(&format!(
                "    <priority>{}</priority>\n",
                format_priority(priority)
            ));
        }
        out.push_str("  </url>\n");
    }

    out.push_str("</urlset>\n");
    out
}

/// `0.8` → `"0.8"`, `1.0` → `"1.0"`, `0.85` → `"0.85"`.
fn format_priority(priority: f64) -> String {
    let fixed = format!("{priority:.2}");
    let trimmed = fixed.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://example.com/</loc>
    <lastmod>2024-01-01</lastmod>
    <changefreq>weekly</changefreq>
    <priority>1.0</priority>
  </url>
  <url><loc> https://example.com/news/a.html?x=1&amp;y=2 </loc></url>
  <url><lastmod>2024-01-02</lastmod></url>
</urlset>
"#;

    #[test]
    fn parses_entries_and_optional_tags() {
        let entries = parse_sitemap(DOC).unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].loc, "https://example.com/");
        assert_eq!(entries[0].lastmod.as_deref(), Some("2024-01-01"));
        assert_eq!(entries[0].changefreq.as_deref(), Some("weekly"));
        assert_eq!(entries[0].priority, Some(1.0));

        assert_eq!(entries[1].loc, "https://example.com/news/a.html?x=1&y=2");
        assert_eq!(entries[1].lastmod, None);
        assert_eq!(entries[1].priority, None);
    }

    #[test]
    fn missing_root_is_an_error() {
        assert!(parse_sitemap("<html><body>oops</body></html>").is_err());
        assert!(parse_sitemap("").is_err());
    }

    #[test]
    fn empty_urlset_parses_to_nothing() {
        let xml = format!("{XML_PROLOG}\n<urlset xmlns=\"{SITEMAP_NS}\">\n</urlset>\n");
        assert!(parse_sitemap(&xml).unwrap().is_empty());
    }

    #[test]
    fn render_then_parse_preserves_entries() {
        let entries = vec![
            SitemapEntry {
                loc: "https://example.com/ru/news/b.html".into(),
                lastmod: Some("2024-06-01".into()),
                changefreq: None,
                priority: Some(0.8),
            },
            SitemapEntry::new("https://example.com/a&b.html"),
        ];
        let xml = render_sitemap(&entries);
        assert!(xml.starts_with(XML_PROLOG));
        assert!(xml.contains("<priority>0.8</priority>"));
        assert!(xml.contains("a&amp;b.html"));
        assert_eq!(parse_sitemap(&xml).unwrap(), entries);
    }

    #[test]
    fn comments_cdata_and_character_references() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <!-- <url><loc>https://example.com/old.html</loc></url> -->
  <url><loc><![CDATA[https://example.com/a.html]]></loc></url>
  <url>
    <loc>https://example.com/b&#46;html</loc>
    <lastmod>2024-&#x30;1-05</lastmod>
  </url>
</urlset>
"#;
        let entries = parse_sitemap(xml).unwrap();
        let locs: Vec<_> = entries.iter().map(|e| e.loc.as_str()).collect();
        assert_eq!(locs, ["https://example.com/a.html", "https://example.com/b.html"]);
        assert_eq!(entries[1].lastmod.as_deref(), Some("2024-01-05"));
    }

    #[test]
    fn url_outside_urlset_is_ignored() {
        let xml = r#"<root><url><loc>https://example.com/x</loc></url></root>"#;
        assert!(parse_sitemap(xml).is_err());
    }

    #[test]
    fn mismatched_tags_are_an_error() {
        let xml = r#"<urlset><url><loc>https://example.com/x</lastmod></url></urlset>"#;
        assert!(parse_sitemap(xml).is_err());
    }

    #[test]
    fn priority_formatting() {
        assert_eq!(format_priority(0.8), "0.8");
        assert_eq!(format_priority(1.0), "1.0");
        assert_eq!(format_priority(0.85), "0.85");
        assert_eq!(format_priority(0.0), "0.0");
    }
}
