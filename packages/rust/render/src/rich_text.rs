//! Rich-text document → HTML.
//!
//! Documents are trees of `{nodeType, content, data, value, marks}` nodes.
//! Unknown node types render their children so new editor features degrade
//! to plain text rather than disappearing.

use serde_json::Value;

use sitepipe_shared::https_asset_url;

use crate::escape_html;

/// Render a rich-text body to an HTML fragment.
///
/// A JSON string body is treated as plain text: blank-line separated blocks
/// become paragraphs. `null` renders as an empty string.
pub fn render_rich_text(body: &Value) -> String {
    match body {
        Value::Null => String::new(),
        Value::String(text) => render_plain_text(text),
        node => {
            let mut out = String::new();
            render_node(node, &mut out);
            out
        }
    }
}

fn render_plain_text(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| format!("<p>{}</p>", escape_html(block)))
        .collect()
}

fn render_node(node: &Value, out: &mut String) {
    let node_type = node.get("nodeType").and_then(Value::as_str).unwrap_or("");

    match node_type {
        "text" => render_text(node, out),
        "paragraph" => wrap(node, "p", out),
        "heading-1" => wrap(node, "h1", out),
        "heading-2" => wrap(node, "h2", out),
        "heading-3" => wrap(node, "h3", out),
        "heading-4" => wrap(node, "h4", out),
        "heading-5" => wrap(node, "h5", out),
        "heading-6" => wrap(node, "h6", out),
        "unordered-list" => wrap(node, "ul", out),
        "ordered-list" => wrap(node, "ol", out),
        "list-item" => wrap(node, "li", out),
        "blockquote" => wrap(node, "blockquote", out),
        "table" => wrap(node, "table", out),
        "table-row" => wrap(node, "tr", out),
        "table-cell" => wrap(node, "td", out),
        "table-header-cell" => wrap(node, "th", out),
        "hr" => out.push_str("<hr/>"),
        "hyperlink" => {
            let uri = node
                .pointer("/data/uri")
                .and_then(Value::as_str)
                .unwrap_or("#");
            out.push_str(&format!("<a href=\"{}\">", escape_html(uri)));
            render_children(node, out);
            out.push_str("</a>");
        }
        "embedded-asset-block" => render_embedded_asset(node, out),
        _ => render_children(node, out),
    }
}

fn wrap(node: &Value, tag: &str, out: &mut String) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    render_children(node, out);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn render_children(node: &Value, out: &mut String) {
    if let Some(children) = node.get("content").and_then(Value::as_array) {
        for child in children {
            render_node(child, out);
        }
    }
}

fn render_text(node: &Value, out: &mut String) {
    let mut html = escape_html(node.get("value").and_then(Value::as_str).unwrap_or(""));

    let marks = node
        .get("marks")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for mark in marks {
        let tag = match mark.get("type").and_then(Value::as_str) {
            Some("bold") => "b",
            Some("italic") => "i",
            Some("underline") => "u",
            Some("code") => "code",
            Some("superscript") => "sup",
            Some("subscript") => "sub",
            _ => continue,
        };
        html = format!("<{tag}>{html}</{tag}>");
    }

    out.push_str(&html);
}

/// `data.target` is a resolved asset already collapsed to one locale; an
/// unresolved link or a missing file renders nothing.
fn render_embedded_asset(node: &Value, out: &mut String) {
    let Some(fields) = node.pointer("/data/target/fields") else {
        return;
    };
    let Some(url) = fields.pointer("/file/url").and_then(Value::as_str) else {
        return;
    };
    let alt = fields
        .get("description")
        .or_else(|| fields.get("title"))
        .and_then(Value::as_str)
        .unwrap_or("");

    out.push_str(&format!(
        "<img src=\"{}\" alt=\"{}\"/>",
        escape_html(&https_asset_url(url)),
        escape_html(alt)
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(value: &str) -> Value {
        json!({ "nodeType": "text", "value": value, "marks": [], "data": {} })
    }

    #[test]
    fn renders_paragraphs_and_headings() {
        let doc = json!({
            "nodeType": "document",
            "content": [
                { "nodeType": "heading-2", "content": [text("Intro")] },
                { "nodeType": "paragraph", "content": [text("Hello & welcome")] }
            ]
        });
        assert_eq!(
            render_rich_text(&doc),
            "<h2>Intro</h2><p>Hello &amp; welcome</p>"
        );
    }

    #[test]
    fn applies_marks_in_order() {
        let doc = json!({
            "nodeType": "paragraph",
            "content": [{
                "nodeType": "text",
                "value": "x",
                "marks": [{ "type": "bold" }, { "type": "italic" }]
            }]
        });
        assert_eq!(render_rich_text(&doc), "<p><i><b>x</b></i></p>");
    }

    #[test]
    fn renders_lists_and_links() {
        let doc = json!({
            "nodeType": "unordered-list",
            "content": [{
                "nodeType": "list-item",
                "content": [{
                    "nodeType": "hyperlink",
                    "data": { "uri": "https://example.com/?a=1&b=2" },
                    "content": [text("site")]
                }]
            }]
        });
        assert_eq!(
            render_rich_text(&doc),
            "<ul><li><a href=\"https://example.com/?a=1&amp;b=2\">site</a></li></ul>"
        );
    }

    #[test]
    fn renders_embedded_asset_with_https() {
        let doc = json!({
            "nodeType": "embedded-asset-block",
            "data": { "target": { "fields": {
                "title": "Chart",
                "file": { "url": "//images.ctfassets.net/c.png" }
            }}},
            "content": []
        });
        assert_eq!(
            render_rich_text(&doc),
            "<img src=\"https://images.ctfassets.net/c.png\" alt=\"Chart\"/>"
        );
    }

    #[test]
    fn unresolved_asset_renders_nothing() {
        let doc = json!({
            "nodeType": "embedded-asset-block",
            "data": { "target": { "sys": { "type": "Link", "linkType": "Asset", "id": "x" } } },
            "content": []
        });
        assert_eq!(render_rich_text(&doc), "");
    }

    #[test]
    fn unknown_nodes_render_children() {
        let doc = json!({
            "nodeType": "embedded-entry-inline",
            "content": [text("kept")]
        });
        assert_eq!(render_rich_text(&doc), "kept");
    }

    #[test]
    fn plain_string_body_becomes_paragraphs() {
        let body = json!("First <line>\n\n\n\nSecond");
        assert_eq!(
            render_rich_text(&body),
            "<p>First &lt;line&gt;</p><p>Second</p>"
        );
        assert_eq!(render_rich_text(&Value::Null), "");
    }
}
